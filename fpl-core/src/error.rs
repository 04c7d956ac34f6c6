use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("A bot reply is already in flight")]
    ReplyInFlight,

    #[error("Invalid theme mode: {0}")]
    InvalidThemeMode(String),
}
