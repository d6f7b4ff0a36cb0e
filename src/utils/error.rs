use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Missing required setting: {name}")]
    MissingSetting { name: String },

    #[error("Invalid selector for {field}: {selector}")]
    InvalidSelector { field: String, selector: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email composition error: {0}")]
    Email(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
