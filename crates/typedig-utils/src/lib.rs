//! # typedig-utils
//!
//! Shared logging bootstrap for typedig.
//!
//! Library code in `typedig-core` only emits `tracing` events; embedders call
//! one of the `init_logging*` functions here once at startup to decide where
//! those events go.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    init_logging, init_logging_from_config, init_logging_with_level, LogConfig, LogFormat, LogLevel, LoggingError,
};
pub use tracing::{debug, error, info, trace, warn};
