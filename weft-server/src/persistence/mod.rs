//! Session persistence: restore specs on disk and the restore path.

pub mod restore;
pub mod types;

pub use types::{load_restore_specs, save_restore_spec, PaneRestoreSpec, SessionRestoreSpec};
