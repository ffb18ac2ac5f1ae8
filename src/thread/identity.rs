//! Conversation identity: a stable 16-hex-character id per email thread.
//!
//! The id is derived from the message metadata with an ordered list of
//! strategies; the first one that produces a value wins:
//!
//! 1. the conversation topic, normalized and hashed;
//! 2. the host's binary conversation index (first 22 bytes, hex);
//! 3. the subject line, normalized and hashed;
//! 4. a random id when everything else fails.
//!
//! The random fallback means two messages of one conversation can end up in
//! different threads when the host refuses every property.

use std::fmt;
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::error::{NoteError, Result};
use crate::model::record::MailMetadata;

/// Length of a conversation id in hex characters.
pub const ID_LEN: usize = 16;

/// Minimum number of bytes in a usable conversation index.
const CONVERSATION_INDEX_HEADER: usize = 22;

/// Reply/forward markers and bracket tags at the start of a subject.
static PREFIXES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:re|fwd|fw)[:\-\s_]+|\[[^\]]*\]\s*)+").expect("valid regex")
});

/// A `Re:` left over after a bracket tag, e.g. `[EXT]Re:`.
static LEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^re:\s*").expect("valid regex"));

/// Identifier of a conversation thread: 16 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId(String);

impl ConversationId {
    /// Validate and wrap an existing id (e.g. read from a note's front matter).
    ///
    /// Upper-case hex is accepted and lower-cased.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() == ID_LEN && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(NoteError::InvalidConversationId(s.to_string()))
        }
    }

    /// Hash a normalized subject or topic.
    pub fn from_text(text: &str) -> Self {
        let digest = format!("{:x}", md5::compute(text.as_bytes()));
        Self(digest[..ID_LEN].to_string())
    }

    /// Build an id from a binary conversation index.
    ///
    /// Returns `None` for indexes shorter than the 22-byte header.
    pub fn from_conversation_index(index: &[u8]) -> Option<Self> {
        if index.len() < CONVERSATION_INDEX_HEADER {
            return None;
        }
        let encoded = hex::encode(&index[..CONVERSATION_INDEX_HEADER]);
        Some(Self(encoded[..ID_LEN].to_string()))
    }

    /// A random id, used when no metadata is readable.
    pub fn random() -> Self {
        Self(format!("{:016x}", rand::thread_rng().gen::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip reply/forward markers and bracket tags from the start of a subject.
///
/// Only the beginning of the subject is touched and the case of the
/// remaining text is preserved.
pub fn normalize_subject(subject: &str) -> String {
    let stripped = PREFIXES.replace(subject, "");
    let stripped = LEADING_RE.replace(&stripped, "");
    stripped.trim().to_string()
}

/// One way of deriving a conversation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Topic,
    ConversationIndex,
    Subject,
    /// Nothing was readable; the id is random.
    Random,
}

/// The metadata-based strategies, in the order they are tried.
#[derive(Debug, Clone, Copy)]
enum Source {
    Topic,
    ConversationIndex,
    Subject,
}

const SOURCES: [Source; 3] = [Source::Topic, Source::ConversationIndex, Source::Subject];

impl Source {
    fn strategy(self) -> Strategy {
        match self {
            Source::Topic => Strategy::Topic,
            Source::ConversationIndex => Strategy::ConversationIndex,
            Source::Subject => Strategy::Subject,
        }
    }

    /// Try to derive an id. Host errors count as "no result".
    fn apply(self, mail: &dyn MailMetadata) -> Option<ConversationId> {
        let attempt = match self {
            Source::Topic => mail.conversation_topic().map(|topic| {
                topic
                    .filter(|t| !t.trim().is_empty())
                    .map(|t| ConversationId::from_text(&normalize_subject(&t)))
            }),
            Source::ConversationIndex => mail
                .conversation_index()
                .map(|index| index.and_then(|i| ConversationId::from_conversation_index(&i))),
            Source::Subject => mail
                .subject()
                .map(|subject| subject.map(|s| ConversationId::from_text(&normalize_subject(&s)))),
        };
        match attempt {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(strategy = ?self.strategy(), error = %e, "Conversation id strategy failed");
                None
            }
        }
    }
}

/// Derive the conversation id of a message.
pub fn resolve(mail: &dyn MailMetadata) -> ConversationId {
    resolve_with_strategy(mail).0
}

/// Derive the conversation id and report which strategy produced it.
pub fn resolve_with_strategy(mail: &dyn MailMetadata) -> (ConversationId, Strategy) {
    for source in SOURCES {
        if let Some(id) = source.apply(mail) {
            return (id, source.strategy());
        }
    }
    tracing::warn!("No conversation metadata readable, using a random thread id");
    (ConversationId::random(), Strategy::Random)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::EmailRecord;

    fn record(subject: &str, topic: Option<&str>) -> EmailRecord {
        EmailRecord {
            subject: subject.to_string(),
            conversation_topic: topic.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_subject() {
        assert_eq!(normalize_subject("Project Update"), "Project Update");
        assert_eq!(normalize_subject("Re: Project Update"), "Project Update");
        assert_eq!(normalize_subject("RE: RE: Project Update"), "Project Update");
        assert_eq!(normalize_subject("[EXTERNAL] Re: Project Update"), "Project Update");
        assert_eq!(normalize_subject("Fwd: FW: re: Project Update"), "Project Update");
        assert_eq!(normalize_subject("FWD- Project Update"), "Project Update");
        assert_eq!(normalize_subject("Re_Project Update"), "Project Update");
        assert_eq!(normalize_subject("[EXT][SPAM]Re:Project Update"), "Project Update");
    }

    #[test]
    fn test_normalize_only_touches_start() {
        assert_eq!(normalize_subject("Update Re: budget"), "Update Re: budget");
        assert_eq!(normalize_subject("Review notes"), "Review notes");
        assert_eq!(normalize_subject("Notes [draft]"), "Notes [draft]");
    }

    #[test]
    fn test_prefix_variants_share_an_id() {
        let a = resolve(&record("", Some("Re: Project Update")));
        let b = resolve(&record("", Some("RE: RE: Project Update")));
        let c = resolve(&record("", Some("[EXTERNAL] Re: Project Update")));
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a, ConversationId::from_text("Project Update"));
    }

    #[test]
    fn test_id_is_sixteen_hex_chars() {
        for id in [
            ConversationId::from_text("anything"),
            ConversationId::from_text(""),
            ConversationId::random(),
        ] {
            assert_eq!(id.as_str().len(), ID_LEN);
            assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_md5_prefix() {
        let full = format!("{:x}", md5::compute(b"Project Update"));
        assert_eq!(ConversationId::from_text("Project Update").as_str(), &full[..16]);
    }

    #[test]
    fn test_topic_wins_over_subject() {
        let mail = record("Completely different", Some("Budget"));
        let (id, strategy) = resolve_with_strategy(&mail);
        assert_eq!(strategy, Strategy::Topic);
        assert_eq!(id, ConversationId::from_text("Budget"));
    }

    #[test]
    fn test_conversation_index_used_without_topic() {
        let mut mail = record("Budget", Some("   "));
        mail.conversation_index = Some((0u8..30).collect());
        let (id, strategy) = resolve_with_strategy(&mail);
        assert_eq!(strategy, Strategy::ConversationIndex);
        assert_eq!(id.as_str(), "0001020304050607");
    }

    #[test]
    fn test_short_conversation_index_falls_through_to_subject() {
        let mut mail = record("Re: Budget", None);
        mail.conversation_index = Some(vec![1, 2, 3]);
        let (id, strategy) = resolve_with_strategy(&mail);
        assert_eq!(strategy, Strategy::Subject);
        assert_eq!(id, ConversationId::from_text("Budget"));
    }

    /// A host record whose properties fail or are missing on demand.
    #[derive(Default)]
    struct Host {
        subject: Option<&'static str>,
        broken_subject: bool,
    }

    fn unavailable<T>(property: &'static str) -> Result<T> {
        Err(NoteError::PropertyUnavailable(property))
    }

    impl MailMetadata for Host {
        fn subject(&self) -> Result<Option<String>> {
            if self.broken_subject {
                return unavailable("Subject");
            }
            Ok(self.subject.map(String::from))
        }
        fn conversation_topic(&self) -> Result<Option<String>> {
            unavailable("ConversationTopic")
        }
        fn conversation_index(&self) -> Result<Option<Vec<u8>>> {
            unavailable("ConversationIndex")
        }
        fn received(&self) -> Result<Option<chrono::NaiveDateTime>> {
            Ok(None)
        }
        fn sender(&self) -> Result<Option<crate::model::address::EmailAddress>> {
            Ok(None)
        }
        fn recipients(&self) -> Result<Vec<crate::model::record::Recipient>> {
            Ok(Vec::new())
        }
        fn internet_message_id(&self) -> Result<Option<String>> {
            Ok(None)
        }
        fn entry_id(&self) -> Result<Option<String>> {
            Ok(None)
        }
        fn body(&self) -> Result<Option<String>> {
            Ok(None)
        }
        fn attachments(&self) -> Result<Vec<crate::model::record::Attachment>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_host_errors_fall_through_to_subject() {
        let host = Host {
            subject: Some("RE: Budget"),
            ..Default::default()
        };
        let (id, strategy) = resolve_with_strategy(&host);
        assert_eq!(strategy, Strategy::Subject);
        assert_eq!(id, ConversationId::from_text("Budget"));
    }

    #[test]
    fn test_all_strategies_failing_gives_random_id() {
        let host = Host {
            broken_subject: true,
            ..Default::default()
        };
        let (id, strategy) = resolve_with_strategy(&host);
        assert_eq!(strategy, Strategy::Random);
        assert_eq!(id.as_str().len(), ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert!(ConversationId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn test_parse_validates() {
        assert_eq!(
            ConversationId::parse("ABCDEF0123456789").unwrap().as_str(),
            "abcdef0123456789"
        );
        assert!(ConversationId::parse("xyz").is_err());
        assert!(ConversationId::parse("abcdef012345678g").is_err());
    }
}
