//! Change notifications emitted by the engine.

use serde::{Deserialize, Serialize};

/// A pane changed; consumers must re-fetch state, this carries no values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneEvent {
    pub pane_id: String,
}

impl PaneEvent {
    pub fn new(pane_id: impl Into<String>) -> Self {
        Self {
            pane_id: pane_id.into(),
        }
    }
}

/// A user-visible notice attached to a pane (e.g. automation failures).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub pane_id: String,
    pub message: String,
}

impl Toast {
    pub fn new(pane_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pane_id: pane_id.into(),
            message: message.into(),
        }
    }
}

/// Mouse event kinds routed to a pane's terminal window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseEventKind {
    Press,
    Release,
    Drag,
    ScrollUp,
    ScrollDown,
}

/// A mouse event in pane-local cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub column: u16,
    pub row: u16,
}
