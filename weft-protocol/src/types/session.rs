//! Session snapshot type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PaneSnapshot;

/// Read-only point-in-time view of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub name: String,
    pub path: String,
    pub layout_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub env: Vec<String>,
    pub panes: Vec<PaneSnapshot>,
}

impl SessionSnapshot {
    /// The active pane, if any.
    pub fn active_pane(&self) -> Option<&PaneSnapshot> {
        self.panes.iter().find(|p| p.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_snapshot_serde() {
        let snap = SessionSnapshot {
            id: Uuid::new_v4(),
            name: "dev".into(),
            path: "/tmp".into(),
            layout_name: "default".into(),
            created_at: Utc::now(),
            env: vec!["FOO=bar".into()],
            panes: vec![],
        };
        let json = serde_json::to_string(&snap).unwrap();
        let back: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn test_active_pane_none_when_empty() {
        let snap = SessionSnapshot {
            id: Uuid::new_v4(),
            name: "dev".into(),
            path: String::new(),
            layout_name: String::new(),
            created_at: Utc::now(),
            env: vec![],
            panes: vec![],
        };
        assert!(snap.active_pane().is_none());
    }
}
