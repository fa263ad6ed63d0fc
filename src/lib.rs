pub mod checker;
pub mod config;
pub mod error;
pub mod line;
pub mod logging;
pub mod runner;
pub mod slots;

// Re-export commonly used types
pub use config::{AppConfig, Target};
pub use error::AppError;
pub use line::LineClient;
pub use slots::Slot;

pub type Result<T> = std::result::Result<T, AppError>;
