pub mod cli;
pub mod config;
pub mod events;
pub mod extractor;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod plugins;
pub mod scheduler;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
