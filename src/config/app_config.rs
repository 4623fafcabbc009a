use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::cloud::client::StorageSettings;
use crate::config::FileConfig;
use crate::constants::{SUMMARY_CC_ADDRESSES, SUMMARY_SMTP_SERVER, SUMMARY_TO_ADDRESSES};
use crate::logging::LoggingSettings;
use crate::models::TransferJob;
use crate::notify::{MailAuth, Recipients};

/// When outcome notifications are sent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicy {
    Always,
    /// Only when `--sendmail` is given
    #[default]
    OnFlag,
    Never,
}

impl NotifyPolicy {
    pub fn allows(self, sendmail_flag: bool) -> bool {
        match self {
            NotifyPolicy::Always => true,
            NotifyPolicy::OnFlag => sendmail_flag,
            NotifyPolicy::Never => false,
        }
    }
}

/// Everything needed to send a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub smtp_server: String,
    pub sender: String,
    pub recipients: Recipients,
    pub auth: MailAuth,
    pub notify_policy: NotifyPolicy,
}

impl MailSettings {
    /// Transfer profile, taken from the config file.
    pub fn from_file(config: &FileConfig) -> Self {
        let mail = &config.mail;
        Self {
            smtp_server: mail.smtp_server.clone(),
            sender: mail
                .from_address
                .clone()
                .filter(|address| !address.is_empty())
                .unwrap_or_else(default_sender),
            recipients: Recipients::new(mail.to_address.clone(), mail.cc_address.clone()),
            auth: MailAuth::from_parts(
                config.general.mail_user.as_deref(),
                config.general.mail_password.as_deref(),
            ),
            notify_policy: mail.notify_policy,
        }
    }

    /// Summary profile: fixed relay and recipients, unauthenticated, always sent.
    pub fn summary_profile() -> Self {
        Self {
            smtp_server: SUMMARY_SMTP_SERVER.to_string(),
            sender: default_sender(),
            recipients: Recipients::new(
                SUMMARY_TO_ADDRESSES.iter().map(|a| a.to_string()).collect(),
                SUMMARY_CC_ADDRESSES.iter().map(|a| a.to_string()).collect(),
            ),
            auth: MailAuth::NoAuth,
            notify_policy: NotifyPolicy::Always,
        }
    }
}

/// `<hostname>@local`
pub fn default_sender() -> String {
    let host = hostname::get()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|_| "localhost".to_string());
    format!("{}@local", host)
}

/// Configuration of one transfer run, merged once from the command line and
/// the config file and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub job: TransferJob,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
    pub mail: MailSettings,
    /// `--sendmail`
    pub send_mail: bool,
}

impl AppConfig {
    /// Command-line values take precedence over the file.
    pub fn from_sources(args: &Args, file: &FileConfig) -> Self {
        Self {
            job: TransferJob {
                bucket: args.bucket.clone(),
                source_path: args.src_path.clone(),
                key_name: args.key_name.clone(),
                compress: !args.no_compress,
            },
            storage: StorageSettings {
                region: args.region.clone(),
                profile: args.aws_cred_secname.clone(),
            },
            logging: LoggingSettings {
                level: args.loglevel,
                destination: args.handler,
                log_path: args
                    .logpath
                    .clone()
                    .unwrap_or_else(|| file.logging.log_path.clone()),
                rollover_size: file.logging.log_rolloversize,
            },
            mail: MailSettings::from_file(file),
            send_mail: args.sendmail,
        }
    }

    pub fn should_notify(&self) -> bool {
        self.mail.notify_policy.allows(self.send_mail)
    }
}
