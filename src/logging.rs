//! Tracing setup for hosts embedding the library.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{self, Config};

/// Set up tracing with stderr output and optional file logging.
///
/// `RUST_LOG` takes precedence over `level`. Returns an error if a global
/// subscriber is already installed.
pub fn init_logging(level: &str, config: &Config) -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailnotes.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init()?;
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .try_init()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.general.cache_dir = Some(tmp.path().to_path_buf());

        // The first call may race with other tests installing a subscriber,
        // but a second call must always be rejected.
        let _ = init_logging("debug", &cfg);
        assert!(init_logging("debug", &cfg).is_err());
        assert_eq!(config::log_file_path(&cfg), tmp.path().join("mailnotes.log"));
    }
}
