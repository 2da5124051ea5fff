//! A pane: one terminal window plus its engine-side bookkeeping.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;
use weft_protocol::PaneSnapshot;

use crate::pty::TerminalWindow;
use crate::session::output_log::OutputLog;

/// Cancels the pane's background tasks (automation sends). The window's
/// own tasks stop via `window.close()`.
#[derive(Clone, Default)]
pub struct PaneTasks {
    token: CancellationToken,
}

impl PaneTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }
}

pub struct Pane {
    pub id: String,
    /// Display index, unique within the session.
    pub index: String,
    pub title: String,
    pub command: String,
    pub start_command: String,
    pub tool: String,
    pub pid: Option<u32>,
    pub active: bool,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub dead: bool,
    pub dead_status: Option<i32>,
    pub restore_failed: bool,
    pub restore_error: String,
    pub cwd: String,
    pub tags: Vec<String>,
    pub(crate) last_active: Arc<AtomicI64>,
    pub output: OutputLog,
    pub window: Arc<dyn TerminalWindow>,
    pub tasks: PaneTasks,
}

impl Pane {
    pub fn last_active_handle(&self) -> Arc<AtomicI64> {
        self.last_active.clone()
    }

    pub fn touch(&self) {
        self.last_active
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        let millis = self.last_active.load(Ordering::Relaxed);
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub fn new_last_active() -> Arc<AtomicI64> {
        Arc::new(AtomicI64::new(Utc::now().timestamp_millis()))
    }

    /// Point-in-time view for persistence and clients. Live window state
    /// (title, exit, byte counters) wins over the cached fields.
    pub fn snapshot(&self, preview_lines: usize) -> PaneSnapshot {
        let window_title = self.window.title();
        let title = if window_title.is_empty() {
            self.title.clone()
        } else {
            window_title
        };
        let exited = self.window.exited();
        let preview = if preview_lines > 0 {
            self.window.preview_plain_lines(preview_lines)
        } else {
            Vec::new()
        };
        PaneSnapshot {
            id: self.id.clone(),
            index: self.index.clone(),
            title,
            command: self.command.clone(),
            start_command: self.start_command.clone(),
            tool: self.tool.clone(),
            pid: self.pid,
            active: self.active,
            left: self.left,
            top: self.top,
            width: self.width,
            height: self.height,
            dead: self.dead || exited,
            dead_status: self.dead_status.or_else(|| self.window.exit_status()),
            last_active: self.last_active(),
            preview,
            restore_failed: self.restore_failed,
            restore_error: self.restore_error.clone(),
            tags: self.tags.clone(),
            bytes_in: self.window.bytes_in(),
            bytes_out: self.window.bytes_out(),
        }
    }
}

/// Trim, lowercase, dedupe, sort. Empty entries are dropped.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Tag Normalization Tests ====================

    #[test]
    fn test_normalize_tags_trims_and_lowercases() {
        let tags = vec!["  Build ".to_string(), "DEPLOY".to_string()];
        assert_eq!(normalize_tags(&tags), vec!["build", "deploy"]);
    }

    #[test]
    fn test_normalize_tags_dedupes_and_sorts() {
        let tags = vec![
            "zeta".to_string(),
            "alpha".to_string(),
            "Alpha".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_normalize_tags_drops_empty() {
        let tags = vec!["  ".to_string(), "ok".to_string(), String::new()];
        assert_eq!(normalize_tags(&tags), vec!["ok"]);
    }

    // ==================== Activity Tests ====================

    #[test]
    fn test_last_active_round_trips() {
        let handle = Pane::new_last_active();
        let millis = handle.load(Ordering::Relaxed);
        assert!(millis > 0);
    }
}
