//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};
use crate::parser::ParserVariant;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub source: SourceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub notification: NotificationConfig,

    #[serde(default)]
    pub allow_lists: AllowListConfig,

    #[serde(default)]
    pub parser: ParserConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Log file source configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub log_file: PathBuf,

    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_start_from_end")]
    pub start_from_end: bool,
}

/// Record store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Downstream notification configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_enabled")]
    pub enabled: bool,

    #[serde(default = "default_notification_url")]
    pub url: String,

    #[serde(default = "default_notification_timeout_ms")]
    pub timeout_ms: u64,
}

/// Allow-list location
#[derive(Debug, Deserialize, Clone)]
pub struct AllowListConfig {
    #[serde(default = "default_allow_list_dir")]
    pub dir: PathBuf,
}

/// Parser variation table
#[derive(Debug, Deserialize, Clone)]
pub struct ParserConfig {
    #[serde(default = "default_track_local_date_time")]
    pub track_local_date_time: bool,

    #[serde(default = "default_obc_id_prefix")]
    pub obc_id_prefix: char,

    #[serde(default = "default_radio_id_prefix")]
    pub radio_id_prefix: char,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rolling log files; stdout only when unset
    #[serde(default)]
    pub file_dir: Option<PathBuf>,
}

// Default value functions
fn default_watch_interval_ms() -> u64 { 100 }
fn default_poll_interval_ms() -> u64 { 1000 }
fn default_start_from_end() -> bool { true }

fn default_database_path() -> PathBuf { PathBuf::from("./telemetry.db") }
fn default_batch_size() -> usize { 100 }

fn default_notification_enabled() -> bool { true }
fn default_notification_url() -> String { "http://localhost:4000/api/notify-update".to_string() }
fn default_notification_timeout_ms() -> u64 { 2000 }

fn default_allow_list_dir() -> PathBuf { PathBuf::from(".") }

fn default_track_local_date_time() -> bool { true }
fn default_obc_id_prefix() -> char { '5' }
fn default_radio_id_prefix() -> char { '8' }

fn default_log_level() -> String { "info".to_string() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: default_notification_enabled(),
            url: default_notification_url(),
            timeout_ms: default_notification_timeout_ms(),
        }
    }
}

impl Default for AllowListConfig {
    fn default() -> Self {
        Self { dir: default_allow_list_dir() }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            track_local_date_time: default_track_local_date_time(),
            obc_id_prefix: default_obc_id_prefix(),
            radio_id_prefix: default_radio_id_prefix(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_dir: None,
        }
    }
}

impl ParserConfig {
    /// Parser variation table built from this section.
    pub fn variant(&self) -> ParserVariant {
        ParserVariant {
            obc_id_prefix: self.obc_id_prefix,
            radio_id_prefix: self.radio_id_prefix,
            track_local_date_time: self.track_local_date_time,
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> IngestError {
    IngestError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use satlog_ingest::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.source.log_file.as_os_str().is_empty() {
            return Err(invalid("source log_file cannot be empty"));
        }

        if self.source.watch_interval_ms == 0 || self.source.watch_interval_ms > 60000 {
            return Err(invalid("watch_interval_ms must be between 1 and 60000"));
        }

        if self.source.poll_interval_ms == 0 || self.source.poll_interval_ms > 60000 {
            return Err(invalid("poll_interval_ms must be between 1 and 60000"));
        }

        if self.storage.database_path.as_os_str().is_empty() {
            return Err(invalid("storage database_path cannot be empty"));
        }

        if self.storage.batch_size == 0 || self.storage.batch_size > 10000 {
            return Err(invalid("batch_size must be between 1 and 10000"));
        }

        if self.notification.enabled {
            let url = &self.notification.url;
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(format!("notification url must be http(s), got '{}'", url)));
            }
        }

        if self.notification.timeout_ms == 0 || self.notification.timeout_ms > 60000 {
            return Err(invalid("notification timeout_ms must be between 1 and 60000"));
        }

        for (name, prefix) in [
            ("obc_id_prefix", self.parser.obc_id_prefix),
            ("radio_id_prefix", self.parser.radio_id_prefix),
        ] {
            if !prefix.is_ascii_digit() {
                return Err(invalid(format!("{} must be a single digit", name)));
            }
        }

        if self.parser.obc_id_prefix == self.parser.radio_id_prefix {
            return Err(invalid("obc_id_prefix and radio_id_prefix must differ"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("logging level must be one of: trace, debug, info, warn, error"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            source: SourceConfig {
                log_file: PathBuf::from("/var/log/sat/eps.log"),
                watch_interval_ms: default_watch_interval_ms(),
                poll_interval_ms: default_poll_interval_ms(),
                start_from_end: default_start_from_end(),
            },
            storage: StorageConfig::default(),
            notification: NotificationConfig::default(),
            allow_lists: AllowListConfig::default(),
            parser: ParserConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[source]
log_file = "/tmp/charge.log"
poll_interval_ms = 100

[storage]
database_path = "/tmp/telemetry.db"

[notification]
enabled = false

[parser]
track_local_date_time = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.source.log_file, PathBuf::from("/tmp/charge.log"));
        assert_eq!(config.source.poll_interval_ms, 100);
        assert_eq!(config.source.watch_interval_ms, 100);
        assert!(!config.notification.enabled);
        assert!(!config.parser.variant().track_local_date_time);
        assert_eq!(config.storage.batch_size, 100);
    }

    #[test]
    fn test_source_section_required() {
        let result = Config::from_toml("[storage]\nbatch_size = 10\n");
        assert!(matches!(result, Err(IngestError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load("/nonexistent/satlog/config.toml");
        assert!(matches!(result, Err(IngestError::Io(_))));
    }

    #[test]
    fn test_empty_log_file() {
        let mut config = create_valid_config();
        config.source.log_file = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_zero() {
        let mut config = create_valid_config();
        config.source.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watch_interval_too_high() {
        let mut config = create_valid_config();
        config.source.watch_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_batch_size_zero() {
        let mut config = create_valid_config();
        config.storage.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_batch_size_too_high() {
        let mut config = create_valid_config();
        config.storage.batch_size = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_notification_url() {
        let mut config = create_valid_config();
        config.notification.url = "localhost:4000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_url_ignored_when_disabled() {
        let mut config = create_valid_config();
        config.notification.enabled = false;
        config.notification.url = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_notification_timeout_zero() {
        let mut config = create_valid_config();
        config.notification.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_digit_prefix() {
        let mut config = create_valid_config();
        config.parser.obc_id_prefix = 'x';
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_equal_prefixes() {
        let mut config = create_valid_config();
        config.parser.radio_id_prefix = '5';
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = create_valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parser_variant_from_config() {
        let variant = ParserConfig::default().variant();
        assert_eq!(variant, ParserVariant::default());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_watch_interval_ms(), 100);
        assert_eq!(default_poll_interval_ms(), 1000);
        assert!(default_start_from_end());
        assert_eq!(default_database_path(), PathBuf::from("./telemetry.db"));
        assert_eq!(default_batch_size(), 100);
        assert!(default_notification_enabled());
        assert_eq!(default_notification_url(), "http://localhost:4000/api/notify-update");
        assert_eq!(default_notification_timeout_ms(), 2000);
        assert_eq!(default_allow_list_dir(), PathBuf::from("."));
        assert_eq!(default_obc_id_prefix(), '5');
        assert_eq!(default_radio_id_prefix(), '8');
        assert_eq!(default_log_level(), "info");
    }
}
