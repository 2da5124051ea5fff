//! weft-utils: Common utilities shared across weft crates
//!
//! This crate provides:
//! - Unified error types ([`WeftError`], [`Result`])
//! - Logging infrastructure ([`init_logging`], [`LogConfig`])
//! - XDG-compliant path utilities ([`paths`] module)

pub mod error;
pub mod logging;
pub mod paths;

// Re-export main types at crate root for convenience
pub use error::{Result, WeftError};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogOutput};

// Re-export commonly used path functions
pub use paths::{
    config_dir, engine_config_file, ensure_all_dirs, ensure_dir, log_dir, restore_dir,
    runtime_dir, state_dir,
};
