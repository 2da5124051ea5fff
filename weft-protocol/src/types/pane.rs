//! Pane snapshot type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only point-in-time view of one pane.
///
/// Geometry is expressed on the engine's virtual 1000x1000 canvas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneSnapshot {
    pub id: String,
    /// Position within the session, unique per session ("0", "1", ...).
    pub index: String,
    pub title: String,
    pub command: String,
    pub start_command: String,
    /// Detected tool id ("" when none matched).
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub pid: Option<u32>,
    pub active: bool,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub dead_status: Option<i32>,
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub preview: Vec<String>,
    #[serde(default)]
    pub restore_failed: bool,
    #[serde(default)]
    pub restore_error: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub bytes_in: u64,
    #[serde(default)]
    pub bytes_out: u64,
}
