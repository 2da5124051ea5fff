//! Snapshot and output record types.

mod output;
mod pane;
mod session;

pub use output::{OutputChunk, OutputLine};
pub use pane::PaneSnapshot;
pub use session::SessionSnapshot;
