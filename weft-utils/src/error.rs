//! Error types for weft
//!
//! Provides a unified error type used across all weft crates.

use std::path::PathBuf;

/// Main error type for weft operations
#[derive(Debug, thiserror::Error)]
pub enum WeftError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Lookup Errors ===

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Pane not found: {0}")]
    PaneNotFound(String),

    #[error("Session already exists: {0}")]
    SessionExists(String),

    // === Argument Errors ===

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // === Lifecycle Errors ===

    #[error("Unavailable: {0}")]
    Unavailable(String),

    // === Spawn Errors ===

    #[error("PTY error: {0}")]
    Pty(String),

    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    // === Layout Errors ===

    #[error("Layout error: {0}")]
    Layout(String),

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WeftError {
    /// Create an invalid-argument error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an unavailable error (closed or missing component)
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a PTY error
    pub fn pty(msg: impl Into<String>) -> Self {
        Self::Pty(msg.into())
    }

    /// Create a spawn error
    pub fn spawn(msg: impl Into<String>) -> Self {
        Self::Spawn(msg.into())
    }

    /// Create a layout error
    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error identifies a missing session/pane
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound(_) | Self::PaneNotFound(_))
    }

    /// Check if this error came from process/PTY creation
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::Spawn(_) | Self::Pty(_))
    }
}

/// Result type alias using WeftError
pub type Result<T> = std::result::Result<T, WeftError>;
