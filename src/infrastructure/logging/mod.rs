//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - Pretty or JSON output on stderr
//! - Optional daily-rotated JSON log file via tracing-appender

pub mod logger;

pub use logger::{LogFormat, LoggerImpl, LOG_FILE_NAME};
