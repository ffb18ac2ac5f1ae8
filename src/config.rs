//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILNOTES_CONFIG` (environment variable)
//! 2. `~/.config/mailnotes/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailnotes\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Vault layout.
    pub vault: VaultConfig,
    /// Note naming rules.
    pub notes: NotesConfig,
    /// Conversation grouping.
    pub threads: ThreadsConfig,
    /// Duplicate detection.
    pub dedup: DedupConfig,
    /// Follow-up tasks.
    pub tasks: TasksConfig,
    /// Contact notes.
    pub contacts: ContactsConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Where notes live inside the vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Root directory of the vault.
    pub root: PathBuf,
    /// Folder (relative to `root`) receiving email notes and thread folders.
    pub inbox_folder: String,
    /// Folder (relative to `root`) receiving contact notes.
    pub contacts_folder: String,
    /// Subfolder (relative to the note's folder) receiving attachments.
    pub attachments_folder: String,
}

/// Note naming rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    /// Include the received timestamp in note file names.
    pub include_date_in_title: bool,
    /// Put the timestamp before the subject in grouped notes.
    pub date_prefix: bool,
    /// `strftime` format of the timestamp used in file names.
    pub title_date_format: String,
    /// Maximum length in characters of a full note path.
    pub max_path_length: usize,
    /// Maximum length in characters of the subject part of a file name.
    pub max_subject_length: usize,
}

/// Conversation grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadsConfig {
    /// Move notes of the same conversation into a shared thread folder.
    pub group_threads: bool,
    /// Addresses that belong to the vault owner; mail from them is outgoing.
    pub own_addresses: Vec<String>,
}

/// Duplicate detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Skip messages whose id already appears in a note.
    pub enabled: bool,
    /// Seconds before the id cache is rebuilt from disk.
    pub cache_freshness_secs: u64,
}

/// Follow-up tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    /// Append a follow-up task to every new note.
    pub create_follow_up_task: bool,
    /// Days after receipt the task is due.
    pub follow_up_days: i64,
}

/// Contact notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactsConfig {
    /// Create a note per sender/recipient when missing.
    pub create_contact_notes: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            inbox_folder: "Inbox".to_string(),
            contacts_folder: "Contacts".to_string(),
            attachments_folder: "attachments".to_string(),
        }
    }
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            include_date_in_title: true,
            date_prefix: false,
            title_date_format: "%Y-%m-%d-%H%M".to_string(),
            max_path_length: 250,
            max_subject_length: 80,
        }
    }
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            group_threads: true,
            own_addresses: Vec::new(),
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_freshness_secs: 5 * 60,
        }
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            create_follow_up_task: false,
            follow_up_days: 3,
        }
    }
}

impl Default for ContactsConfig {
    fn default() -> Self {
        Self {
            create_contact_notes: true,
        }
    }
}

impl VaultConfig {
    /// Absolute inbox directory.
    pub fn inbox_dir(&self) -> PathBuf {
        self.root.join(&self.inbox_folder)
    }

    /// Absolute contacts directory.
    pub fn contacts_dir(&self) -> PathBuf {
        self.root.join(&self.contacts_folder)
    }
}

impl DedupConfig {
    /// Age after which the duplicate cache is rebuilt.
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.cache_freshness_secs)
    }
}

impl ThreadsConfig {
    /// Whether `address` belongs to the vault owner.
    pub fn is_own_address(&self, address: &str) -> bool {
        self.own_addresses
            .iter()
            .any(|own| own.eq_ignore_ascii_case(address.trim()))
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILNOTES_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailnotes").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailnotes")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mailnotes.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert!(cfg.notes.include_date_in_title);
        assert!(!cfg.notes.date_prefix);
        assert_eq!(cfg.vault.inbox_folder, "Inbox");
        assert_eq!(cfg.dedup.freshness(), Duration::from_secs(300));
        assert!(cfg.threads.group_threads);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.notes.title_date_format, cfg.notes.title_date_format);
        assert_eq!(parsed.vault.contacts_folder, cfg.vault.contacts_folder);
        assert_eq!(
            parsed.dedup.cache_freshness_secs,
            cfg.dedup.cache_freshness_secs
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[vault]
root = "/home/me/vault"

[notes]
include_date_in_title = false
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.vault.root, PathBuf::from("/home/me/vault"));
        assert_eq!(cfg.vault.inbox_dir(), PathBuf::from("/home/me/vault/Inbox"));
        assert!(!cfg.notes.include_date_in_title);
        // Other fields use defaults
        assert_eq!(cfg.notes.max_path_length, 250);
        assert_eq!(cfg.tasks.follow_up_days, 3);
    }

    #[test]
    fn test_own_address_is_case_insensitive() {
        let mut cfg = ThreadsConfig::default();
        cfg.own_addresses.push("Me@Example.com".to_string());
        assert!(cfg.is_own_address("me@example.com"));
        assert!(!cfg.is_own_address("other@example.com"));
    }
}
