//! # symbridge Utilities
//!
//! Shared logging bootstrap and environment settings for symbridge.

pub mod config;
pub mod logging;

// Re-export commonly used items for convenience
pub use config::{ConfigError, Settings};
pub use logging::{
    default_log_file, init_file_logging, init_logging, init_logging_with_level, LogFormat, LogGuard, LogLevel,
    LoggingError,
};
pub use tracing::{debug, error, info, trace, warn};
