use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::NotifyPolicy;
use crate::constants::{DEFAULT_LOG_ROLLOVER_SIZE, DEFAULT_SMTP_SERVER, DEFAULT_TRANSFER_LOG_PATH};
use crate::errors::ConfigError;

/// Contents of the YAML config file.
///
/// ```yaml
/// general:
///   mail_user: backup
///   mail_password: secret
/// logging:
///   log_path: /var/log/transfer_s3.log
///   log_rolloversize: 104857600
/// mail:
///   smtp_server: smtp.example.com:587
///   from_address: backup@example.com
///   to_address: [ops@example.com]
///   cc_address: []
///   notify_policy: on_flag
/// ```
///
/// Every section and field may be left out.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub general: GeneralSection,
    pub logging: LoggingSection,
    pub mail: MailSection,
}

/// Credentials for authenticated mail.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneralSection {
    pub mail_user: Option<String>,
    pub mail_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSection {
    pub log_path: PathBuf,
    /// Bytes written before the rotation handler rolls the file over
    pub log_rolloversize: u64,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_TRANSFER_LOG_PATH),
            log_rolloversize: DEFAULT_LOG_ROLLOVER_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MailSection {
    /// `host` or `host:port`
    pub smtp_server: String,
    pub from_address: Option<String>,
    pub to_address: Vec<String>,
    pub cc_address: Vec<String>,
    pub notify_policy: NotifyPolicy,
}

impl Default for MailSection {
    fn default() -> Self {
        Self {
            smtp_server: DEFAULT_SMTP_SERVER.to_string(),
            from_address: None,
            to_address: Vec::new(),
            cc_address: Vec::new(),
            notify_policy: NotifyPolicy::default(),
        }
    }
}

impl FileConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read { path: path.to_path_buf(), source }
            }
        })?;

        let config: FileConfig = serde_yaml::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Read the config file at `path`.
///
/// Returns `None` when the file does not exist and `explicit` is false, so the
/// caller can fall back to defaults. A missing file the user asked for is an
/// error, as is any unreadable or malformed file.
pub fn load_or_default_config(path: &Path, explicit: bool) -> Result<Option<FileConfig>, ConfigError> {
    match FileConfig::from_yaml_file(path) {
        Ok(config) => Ok(Some(config)),
        Err(ConfigError::NotFound(_)) if !explicit => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_full_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"
general:
  mail_user: backup
  mail_password: secret
logging:
  log_path: /tmp/transfer.log
  log_rolloversize: 1024
mail:
  smtp_server: smtp.example.com:587
  from_address: backup@example.com
  to_address: [ops@example.com, dba@example.com]
  cc_address: [lead@example.com]
  notify_policy: always
"#).unwrap();

        let config = FileConfig::from_yaml_file(file.path()).unwrap();

        assert_eq!(config.general.mail_user.as_deref(), Some("backup"));
        assert_eq!(config.general.mail_password.as_deref(), Some("secret"));
        assert_eq!(config.logging.log_path, PathBuf::from("/tmp/transfer.log"));
        assert_eq!(config.logging.log_rolloversize, 1024);
        assert_eq!(config.mail.smtp_server, "smtp.example.com:587");
        assert_eq!(config.mail.from_address.as_deref(), Some("backup@example.com"));
        assert_eq!(config.mail.to_address, vec!["ops@example.com", "dba@example.com"]);
        assert_eq!(config.mail.cc_address, vec!["lead@example.com"]);
        assert_eq!(config.mail.notify_policy, NotifyPolicy::Always);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "mail:\n  to_address: [ops@example.com]\n").unwrap();

        let config = FileConfig::from_yaml_file(file.path()).unwrap();

        assert_eq!(config.general, GeneralSection::default());
        assert_eq!(config.logging, LoggingSection::default());
        assert_eq!(config.mail.smtp_server, "127.0.0.1");
        assert_eq!(config.mail.notify_policy, NotifyPolicy::OnFlag);
        assert_eq!(config.mail.to_address, vec!["ops@example.com"]);
    }

    #[test]
    fn test_malformed_config_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "mail:\n  notify_policy: sometimes\n").unwrap();

        let err = FileConfig::from_yaml_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_or_default_config_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("transfer_s3.yaml");

        assert_eq!(load_or_default_config(&path, false).unwrap(), None);
        assert!(matches!(load_or_default_config(&path, true), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_config_existing_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "logging:\n  log_rolloversize: 10\n").unwrap();

        let config = load_or_default_config(file.path(), true).unwrap().unwrap();
        assert_eq!(config.logging.log_rolloversize, 10);
    }
}
