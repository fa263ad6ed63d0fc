use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Failed to load page after {attempts} attempts: {message}")]
    PageLoad { attempts: u32, message: String },

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Check cycle timed out after {seconds}s")]
    CycleTimeout { seconds: u64 },

    #[error("Check cycle panicked: {0}")]
    CyclePanic(String),

    #[error("Notification rejected with status {status}")]
    NotificationRejected { status: u16 },

    #[error("Notification configuration error: {0}")]
    NotificationConfig(String),
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
