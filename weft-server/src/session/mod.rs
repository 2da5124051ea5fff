//! Sessions, panes, and the engine core.

pub mod build;
pub mod manager;
pub mod output_log;
pub mod pane;
pub mod send_queue;
#[allow(clippy::module_inception)]
pub mod session;

pub use manager::{Manager, SessionSpec};
pub use output_log::{OutputLog, RawSubscription};
pub use pane::{normalize_tags, Pane, PaneTasks};
pub use session::Session;
