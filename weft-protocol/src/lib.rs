//! weft-protocol: Shared value types crossing the engine boundary
//!
//! Snapshots, output records, and change notifications exchanged between
//! the engine and whatever daemon/IPC layer sits in front of it. This
//! crate deliberately contains no behavior beyond plain data.

pub mod events;
pub mod types;

pub use events::{MouseEvent, MouseEventKind, PaneEvent, Toast};
pub use types::{OutputChunk, OutputLine, PaneSnapshot, SessionSnapshot};
