//! weft-server: the terminal multiplexer engine.
//!
//! Owns every session and pane: spawns PTY-backed windows, keeps the
//! layout tree, fans output out to subscribers, and restores sessions from
//! disk. The [`session::Manager`] is the whole public surface; clients
//! drive it and never touch a PTY directly.

pub mod config;
pub mod persistence;
pub mod pty;
pub mod session;

pub use config::{EngineConfig, ToolRegistry};
pub use persistence::{load_restore_specs, save_restore_spec, SessionRestoreSpec};
pub use pty::{PtyWindow, TerminalWindow, WindowOptions, WindowSpawner};
pub use session::{Manager, SessionSpec};
