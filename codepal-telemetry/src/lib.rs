//! # codepal-telemetry
//!
//! Logging setup for codepal binaries.
//!
//! ```rust,ignore
//! codepal_telemetry::init_logging("codepal-server", LogFormat::from_env()?)?;
//! tracing::info!(memory_id = %id, "chat started");
//! ```
//!
//! `RUST_LOG` controls the filter (default `info`). `CODEPAL_LOG_FORMAT`
//! picks human-readable `text` (default) or `json` lines.

mod init;

pub use init::{LOG_FORMAT_ENV, LogFormat, init_json_telemetry, init_logging, init_telemetry};

// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};
