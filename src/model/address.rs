//! Sender and recipient addresses.

/// An email participant as reported by the mail host.
///
/// # Examples
/// - `"Jane Doe <jane@example.com>"` → `display_name = "Jane Doe"`, `address = "jane@example.com"`
/// - `"jane@example.com"` → `display_name = ""`, `address = "jane@example.com"`
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`), may be empty for
    /// Exchange-internal senders without an SMTP address.
    pub address: String,
}

impl EmailAddress {
    /// Build an address from its two parts, trimming both.
    pub fn new(display_name: impl AsRef<str>, address: impl AsRef<str>) -> Self {
        Self {
            display_name: strip_quotes(display_name.as_ref()),
            address: address.as_ref().trim().to_string(),
        }
    }

    /// Parse `"Display Name <address>"`, `"<address>"` or a bare address.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let (Some(open), Some(close)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
            if close > open {
                return Self::new(&trimmed[..open], &trimmed[open + 1..close]);
            }
        }
        Self::new("", trimmed)
    }

    /// Part of the address before `@`.
    pub fn local_part(&self) -> &str {
        self.address
            .split_once('@')
            .map(|(local, _)| local)
            .unwrap_or(&self.address)
    }

    /// Best name for a person: display name, else the address.
    pub fn name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.address
        } else {
            &self.display_name
        }
    }

    /// Whether neither a name nor an address is known.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_empty() && self.address.is_empty()
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else if self.address.is_empty() {
            self.display_name.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let addr = EmailAddress::parse("user@example.com");
        assert_eq!(addr.address, "user@example.com");
        assert_eq!(addr.display_name, "");
        assert_eq!(addr.local_part(), "user");
    }

    #[test]
    fn test_parse_quoted_name() {
        let addr = EmailAddress::parse("\"Doe, Jane\" <jane@example.com>");
        assert_eq!(addr.address, "jane@example.com");
        assert_eq!(addr.display_name, "Doe, Jane");
        assert_eq!(addr.name(), "Doe, Jane");
    }

    #[test]
    fn test_name_falls_back_to_address() {
        let addr = EmailAddress::new("", "ops@example.com");
        assert_eq!(addr.name(), "ops@example.com");
        assert_eq!(addr.display(), "ops@example.com");
    }

    #[test]
    fn test_display_without_address() {
        let addr = EmailAddress::new("Exchange User", "");
        assert_eq!(addr.display(), "Exchange User");
        assert_eq!(addr.local_part(), "");
        assert!(!addr.is_empty());
        assert!(EmailAddress::default().is_empty());
    }
}
