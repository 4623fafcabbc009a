// Config file sections and the merged runtime configuration
mod app_config;
mod file_config;

// Re-export the runtime configuration
pub use app_config::{
    AppConfig,
    MailSettings,
    NotifyPolicy,
    default_sender,
};

// Re-export the file format
pub use file_config::{
    FileConfig,
    GeneralSection,
    LoggingSection,
    MailSection,
    load_or_default_config,
};
