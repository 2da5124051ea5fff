//! The engine core: owns every session and pane, applies layout ops, and
//! fans out change notifications.
//!
//! Locking rules: read-only calls take the read lock; anything that touches
//! the layout tree or the pane maps takes the write lock. The lock is never
//! held across a window spawn, a channel send, or an output-log call; event
//! emission always happens after unlock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info};
use weft_layout::{
    build_tree, expand_layout_vars, ApplyResult, Axis, Edge, Engine, LayoutConfig, SnapState,
};
use weft_protocol::{
    MouseEvent, OutputChunk, OutputLine, PaneEvent, PaneSnapshot, SessionSnapshot, Toast,
};
use weft_utils::{Result, WeftError};

use crate::config::{EngineConfig, ToolRegistry};
use crate::pty::{TerminalWindow, WindowSpawner};
use crate::session::output_log::{OutputLog, RawSubscription};
use crate::session::pane::{normalize_tags, Pane};
use crate::session::session::Session;

const EVENT_CHANNEL_SIZE: usize = 128;
const TOAST_CHANNEL_SIZE: usize = 64;

/// Request to start a new session.
#[derive(Debug, Clone, Default)]
pub struct SessionSpec {
    pub name: String,
    pub path: String,
    pub layout: Option<LayoutConfig>,
    pub layout_name: String,
    pub env: Vec<String>,
}

pub(crate) struct State {
    pub sessions: HashMap<String, Session>,
    /// Pane id -> owning session name.
    pub panes: HashMap<String, String>,
}

/// Closed exactly once, on a pane's first output. Every waiter observes it.
pub(crate) struct OutputGate {
    ready: AtomicBool,
    notify: Notify,
}

impl OutputGate {
    pub(crate) fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub(crate) fn mark(&self) {
        if !self.ready.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub(crate) async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.ready.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

pub struct Manager {
    /// Self-reference for spawning tasks that outlive the current call.
    pub(crate) weak: std::sync::Weak<Manager>,
    pub(crate) state: RwLock<State>,
    pub(crate) config: EngineConfig,
    pub(crate) tools: ToolRegistry,
    pub(crate) spawner: WindowSpawner,
    pub(crate) closed: AtomicBool,
    next_pane: AtomicU64,
    version: AtomicU64,
    pub(crate) events_tx: Mutex<Option<mpsc::Sender<PaneEvent>>>,
    events_rx: Mutex<Option<mpsc::Receiver<PaneEvent>>>,
    pub(crate) toasts_tx: Mutex<Option<mpsc::Sender<Toast>>>,
    toasts_rx: Mutex<Option<mpsc::Receiver<Toast>>>,
    pub(crate) gates: Mutex<HashMap<String, Arc<OutputGate>>>,
}

impl Manager {
    pub fn new(config: EngineConfig, tools: ToolRegistry, spawner: WindowSpawner) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let (toasts_tx, toasts_rx) = mpsc::channel(TOAST_CHANNEL_SIZE);
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            state: RwLock::new(State {
                sessions: HashMap::new(),
                panes: HashMap::new(),
            }),
            config,
            tools,
            spawner,
            closed: AtomicBool::new(false),
            next_pane: AtomicU64::new(0),
            version: AtomicU64::new(0),
            events_tx: Mutex::new(Some(events_tx)),
            events_rx: Mutex::new(Some(events_rx)),
            toasts_tx: Mutex::new(Some(toasts_tx)),
            toasts_rx: Mutex::new(Some(toasts_rx)),
            gates: Mutex::new(HashMap::new()),
        })
    }

    /// The sole pane-event receiver. Second call returns `None`.
    pub fn take_events(&self) -> Option<mpsc::Receiver<PaneEvent>> {
        self.events_rx.lock().take()
    }

    pub fn take_toasts(&self) -> Option<mpsc::Receiver<Toast>> {
        self.toasts_rx.lock().take()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub(crate) fn bump_version(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Monotonic pane id; never reused, even after a close.
    pub(crate) fn next_pane_id(&self) -> String {
        format!("p-{}", self.next_pane.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(WeftError::unavailable("engine is shutting down"));
        }
        Ok(())
    }

    pub(crate) fn emit_event(&self, pane_id: &str) {
        if let Some(tx) = &*self.events_tx.lock() {
            // Best-effort: a full channel drops the event.
            let _ = tx.try_send(PaneEvent::new(pane_id));
        }
    }

    pub(crate) fn emit_events(&self, pane_ids: &[String]) {
        for id in pane_ids {
            self.emit_event(id);
        }
    }

    pub(crate) fn emit_toast(&self, pane_id: &str, message: impl Into<String>) {
        if let Some(tx) = &*self.toasts_tx.lock() {
            let _ = tx.try_send(Toast::new(pane_id, message));
        }
    }

    // ==================== Sessions ====================

    /// Create a session from a layout: spawn all panes, build the tree,
    /// register atomically, then dispatch automation sends.
    pub async fn start_session(&self, spec: SessionSpec) -> Result<SessionSnapshot> {
        self.ensure_open()?;
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(WeftError::invalid("session name is required"));
        }
        validate_path(&spec.path)?;

        let mut layout = spec.layout.clone().unwrap_or_default();
        expand_layout_vars(&mut layout);
        let layout_name = if !spec.layout_name.trim().is_empty() {
            spec.layout_name.trim().to_string()
        } else {
            layout.name.clone()
        };

        let panes = self
            .build_layout_panes(&layout, &spec.path, &spec.env)
            .await?;
        let ids: Vec<String> = panes.iter().map(|p| p.id.clone()).collect();

        let tree = match build_tree(&layout, &ids) {
            Ok(tree) => tree,
            Err(e) => {
                self.teardown_panes(panes);
                return Err(e);
            }
        };
        let mut engine = Engine::new(tree);
        engine.constraints = self.config.constraints();
        engine.snap = self.config.snap_config();

        let mut session = Session {
            id: uuid::Uuid::new_v4(),
            name: name.clone(),
            path: spec.path.clone(),
            layout_name,
            created_at: chrono::Utc::now(),
            env: spec.env.clone(),
            panes,
            engine,
        };
        session.set_active(&ids[0]);
        session.project_rects(&ids);

        self.register_session(session)?;
        self.apply_scrollback_budgets();
        self.bump_version();
        self.emit_events(&ids);
        info!(session = %name, panes = ids.len(), "session started");
        self.dispatch_layout_sends(&name, &layout);
        self.snapshot_session(&name, 0)
    }

    /// Insert a fully built session, failing on a name collision. On
    /// failure every pane of the rejected session is torn down.
    pub(crate) fn register_session(&self, session: Session) -> Result<()> {
        let name = session.name.clone();
        let mut state = self.state.write();
        if self.closed.load(Ordering::SeqCst) || state.sessions.contains_key(&name) {
            drop(state);
            let reason = if self.closed.load(Ordering::SeqCst) {
                WeftError::unavailable("engine is shutting down")
            } else {
                WeftError::SessionExists(name)
            };
            self.teardown_panes(session.panes);
            return Err(reason);
        }
        for pane in &session.panes {
            state.panes.insert(pane.id.clone(), name.clone());
        }
        state.sessions.insert(name, session);
        Ok(())
    }

    pub fn kill_session(&self, name: &str) -> Result<()> {
        let session = {
            let mut state = self.state.write();
            let session = state
                .sessions
                .remove(name)
                .ok_or_else(|| WeftError::SessionNotFound(name.to_string()))?;
            for pane in &session.panes {
                state.panes.remove(&pane.id);
            }
            session
        };
        let ids: Vec<String> = session.panes.iter().map(|p| p.id.clone()).collect();
        self.teardown_panes(session.panes);
        self.apply_scrollback_budgets();
        self.bump_version();
        self.emit_events(&ids);
        info!(session = %name, "session killed");
        Ok(())
    }

    pub fn rename_session(&self, old: &str, new: &str) -> Result<()> {
        let new = new.trim();
        if new.is_empty() {
            return Err(WeftError::invalid("session name is required"));
        }
        if old == new {
            return Ok(());
        }
        {
            let mut state = self.state.write();
            if state.sessions.contains_key(new) {
                return Err(WeftError::SessionExists(new.to_string()));
            }
            let mut session = state
                .sessions
                .remove(old)
                .ok_or_else(|| WeftError::SessionNotFound(old.to_string()))?;
            session.name = new.to_string();
            for pane in &session.panes {
                state.panes.insert(pane.id.clone(), new.to_string());
            }
            state.sessions.insert(new.to_string(), session);
        }
        self.bump_version();
        debug!(old = %old, new = %new, "session renamed");
        Ok(())
    }

    /// Session names, oldest first (ties broken by name).
    pub fn session_names(&self) -> Vec<String> {
        let state = self.state.read();
        let mut entries: Vec<_> = state
            .sessions
            .values()
            .map(|s| (s.created_at, s.name.clone()))
            .collect();
        entries.sort();
        entries.into_iter().map(|(_, name)| name).collect()
    }

    /// All sessions in `session_names()` order, with optional preview rows.
    pub fn snapshot(&self, preview_lines: usize) -> Vec<SessionSnapshot> {
        let state = self.state.read();
        let mut sessions: Vec<&Session> = state.sessions.values().collect();
        sessions.sort_by(|a, b| (a.created_at, &a.name).cmp(&(b.created_at, &b.name)));
        sessions
            .iter()
            .map(|s| s.snapshot(preview_lines))
            .collect()
    }

    pub fn snapshot_session(&self, name: &str, preview_lines: usize) -> Result<SessionSnapshot> {
        let state = self.state.read();
        state
            .sessions
            .get(name)
            .map(|s| s.snapshot(preview_lines))
            .ok_or_else(|| WeftError::SessionNotFound(name.to_string()))
    }

    // ==================== Layout Ops ====================

    /// Split a pane, spawning a shell in the new half. Two-phase: the
    /// window is spawned without any lock held, then the split commits
    /// under the write lock only if the target still exists.
    pub fn split_pane(
        &self,
        session_name: &str,
        pane_id: &str,
        axis: Axis,
        percent: i32,
    ) -> Result<PaneSnapshot> {
        self.ensure_open()?;
        // Preflight under the read lock.
        let (cwd, env, index) = {
            let state = self.state.read();
            let session = state
                .sessions
                .get(session_name)
                .ok_or_else(|| WeftError::SessionNotFound(session_name.to_string()))?;
            let pane = session
                .pane(pane_id)
                .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))?;
            let cwd = if pane.cwd.trim().is_empty() {
                session.path.clone()
            } else {
                pane.cwd.clone()
            };
            (cwd, session.env.clone(), session.next_index())
        };

        let new_id = self.next_pane_id();
        let pane = self.create_pane(crate::session::build::PaneSeed {
            id: new_id.clone(),
            index,
            title: String::new(),
            command: String::new(),
            start_command: String::new(),
            cwd,
            env,
        })?;

        // Commit under the write lock, re-validating the target.
        let (snapshot, affected) = {
            let mut state = self.state.write();
            let Some(session) = state.sessions.get_mut(session_name) else {
                drop(state);
                self.teardown_panes(vec![pane]);
                return Err(WeftError::SessionNotFound(session_name.to_string()));
            };
            if session.pane(pane_id).is_none() {
                drop(state);
                self.teardown_panes(vec![pane]);
                return Err(WeftError::PaneNotFound(pane_id.to_string()));
            }
            let result = match session.engine.apply(weft_layout::Op::Split {
                pane_id: pane_id.to_string(),
                new_pane_id: new_id.clone(),
                axis,
                percent,
            }) {
                Ok(result) => result,
                Err(e) => {
                    drop(state);
                    self.teardown_panes(vec![pane]);
                    return Err(e);
                }
            };
            session.panes.push(pane);
            session.project_rects(&result.affected);
            let snapshot = session
                .pane(&new_id)
                .map(|p| p.snapshot(0))
                .ok_or_else(|| WeftError::internal("new pane missing after split"))?;
            state.panes.insert(new_id.clone(), session_name.to_string());
            (snapshot, result.affected)
        };

        self.apply_scrollback_budgets();
        self.bump_version();
        self.emit_events(&affected);
        debug!(session = %session_name, pane_id = %new_id, "pane split");
        Ok(snapshot)
    }

    /// Close one pane. The last pane of a session cannot be closed; kill
    /// the session instead.
    pub fn close_pane(&self, pane_id: &str) -> Result<()> {
        self.ensure_open()?;
        let (removed, affected) = {
            let mut state = self.state.write();
            let session_name = state
                .panes
                .get(pane_id)
                .cloned()
                .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))?;
            let session = state
                .sessions
                .get_mut(&session_name)
                .ok_or_else(|| WeftError::internal("pane index points at a missing session"))?;
            if session.panes.len() <= 1 {
                return Err(WeftError::invalid(
                    "cannot close the last pane of a session; kill the session instead",
                ));
            }
            let result = session.engine.apply(weft_layout::Op::Close {
                pane_id: pane_id.to_string(),
            })?;
            let removed = session.remove_pane(pane_id);
            if removed.as_ref().is_some_and(|p| p.active) {
                if let Some(first) = session.panes.first().map(|p| p.id.clone()) {
                    session.set_active(&first);
                }
            }
            session.project_rects(&result.affected);
            state.panes.remove(pane_id);
            (removed, result.affected)
        };

        if let Some(pane) = removed {
            self.teardown_panes(vec![pane]);
        }
        self.apply_scrollback_budgets();
        self.bump_version();
        self.emit_event(pane_id);
        self.emit_events(&affected);
        debug!(pane_id = %pane_id, "pane closed");
        Ok(())
    }

    /// Exchange two panes' positions; their indices travel with them.
    pub fn swap_panes(&self, a: &str, b: &str) -> Result<()> {
        self.ensure_open()?;
        let affected = {
            let mut state = self.state.write();
            let sa = state
                .panes
                .get(a)
                .cloned()
                .ok_or_else(|| WeftError::PaneNotFound(a.to_string()))?;
            let sb = state
                .panes
                .get(b)
                .cloned()
                .ok_or_else(|| WeftError::PaneNotFound(b.to_string()))?;
            if sa != sb {
                return Err(WeftError::invalid("panes belong to different sessions"));
            }
            let session = state
                .sessions
                .get_mut(&sa)
                .ok_or_else(|| WeftError::internal("pane index points at a missing session"))?;
            let result = session.engine.apply(weft_layout::Op::Swap {
                a: a.to_string(),
                b: b.to_string(),
            })?;
            if result.changed {
                let ia = session.panes.iter().position(|p| p.id == a);
                let ib = session.panes.iter().position(|p| p.id == b);
                if let (Some(ia), Some(ib)) = (ia, ib) {
                    let index_a = session.panes[ia].index.clone();
                    session.panes[ia].index = session.panes[ib].index.clone();
                    session.panes[ib].index = index_a;
                }
                session.project_rects(&result.affected);
            }
            result.affected
        };
        self.bump_version();
        self.emit_events(&affected);
        Ok(())
    }

    /// Drag one edge of a pane. Returns the apply result so callers can
    /// thread `snap_state` through a drag gesture.
    pub fn resize_pane(
        &self,
        pane_id: &str,
        edge: Edge,
        delta: i32,
        snap: bool,
        snap_state: SnapState,
    ) -> Result<ApplyResult> {
        self.ensure_open()?;
        let result = {
            let mut state = self.state.write();
            let session_name = state
                .panes
                .get(pane_id)
                .cloned()
                .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))?;
            let session = state
                .sessions
                .get_mut(&session_name)
                .ok_or_else(|| WeftError::internal("pane index points at a missing session"))?;
            let result = session.engine.apply(weft_layout::Op::Resize {
                pane_id: pane_id.to_string(),
                edge,
                delta,
                snap,
                snap_state,
            })?;
            session.project_rects(&result.affected);
            result
        };
        self.bump_version();
        self.emit_events(&result.affected);
        Ok(result)
    }

    /// Even out sizes under a pane's parent split, or the whole session
    /// tree when no pane is given.
    pub fn reset_sizes(&self, session_name: &str, pane_id: Option<&str>) -> Result<()> {
        self.ensure_open()?;
        let affected = {
            let mut state = self.state.write();
            let session = state
                .sessions
                .get_mut(session_name)
                .ok_or_else(|| WeftError::SessionNotFound(session_name.to_string()))?;
            let result = session.engine.apply(weft_layout::Op::ResetSizes {
                pane_id: pane_id.map(str::to_string),
            })?;
            session.project_rects(&result.affected);
            result.affected
        };
        self.bump_version();
        self.emit_events(&affected);
        Ok(())
    }

    pub fn zoom_pane(&self, pane_id: &str, toggle: bool) -> Result<()> {
        self.ensure_open()?;
        let affected = {
            let mut state = self.state.write();
            let session_name = state
                .panes
                .get(pane_id)
                .cloned()
                .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))?;
            let session = state
                .sessions
                .get_mut(&session_name)
                .ok_or_else(|| WeftError::internal("pane index points at a missing session"))?;
            let result = session.engine.apply(weft_layout::Op::Zoom {
                pane_id: pane_id.to_string(),
                toggle,
            })?;
            result.affected
        };
        self.bump_version();
        self.emit_events(&affected);
        Ok(())
    }

    // ==================== Pane I/O ====================

    pub fn window(&self, pane_id: &str) -> Result<Arc<dyn TerminalWindow>> {
        let state = self.state.read();
        let session_name = state
            .panes
            .get(pane_id)
            .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))?;
        state
            .sessions
            .get(session_name)
            .and_then(|s| s.pane(pane_id))
            .map(|p| p.window.clone())
            .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))
    }

    pub fn send_input(&self, pane_id: &str, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let (window, last_active) = {
            let state = self.state.read();
            let session_name = state
                .panes
                .get(pane_id)
                .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))?;
            let pane = state
                .sessions
                .get(session_name)
                .and_then(|s| s.pane(pane_id))
                .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))?;
            (pane.window.clone(), pane.last_active_handle())
        };
        window.send_input(data)?;
        last_active.store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
        self.bump_version();
        Ok(())
    }

    pub fn send_mouse(&self, pane_id: &str, event: &MouseEvent) -> Result<()> {
        self.ensure_open()?;
        let window = self.window(pane_id)?;
        window.send_mouse(event)?;
        self.bump_version();
        Ok(())
    }

    // ==================== Tags ====================

    pub fn pane_tags(&self, pane_id: &str) -> Result<Vec<String>> {
        let state = self.state.read();
        let session_name = state
            .panes
            .get(pane_id)
            .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))?;
        state
            .sessions
            .get(session_name)
            .and_then(|s| s.pane(pane_id))
            .map(|p| p.tags.clone())
            .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))
    }

    pub fn add_pane_tags(&self, pane_id: &str, tags: &[String]) -> Result<Vec<String>> {
        let result = self.with_pane_mut(pane_id, |pane| {
            let mut all = pane.tags.clone();
            all.extend_from_slice(tags);
            pane.tags = normalize_tags(&all);
            pane.tags.clone()
        })?;
        self.bump_version();
        self.emit_event(pane_id);
        Ok(result)
    }

    pub fn remove_pane_tags(&self, pane_id: &str, tags: &[String]) -> Result<Vec<String>> {
        let remove = normalize_tags(tags);
        let result = self.with_pane_mut(pane_id, |pane| {
            pane.tags.retain(|t| !remove.contains(t));
            pane.tags.clone()
        })?;
        self.bump_version();
        self.emit_event(pane_id);
        Ok(result)
    }

    fn with_pane_mut<T>(&self, pane_id: &str, f: impl FnOnce(&mut Pane) -> T) -> Result<T> {
        let mut state = self.state.write();
        let session_name = state
            .panes
            .get(pane_id)
            .cloned()
            .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))?;
        let pane = state
            .sessions
            .get_mut(&session_name)
            .and_then(|s| s.pane_mut(pane_id))
            .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))?;
        Ok(f(pane))
    }

    // ==================== Output ====================

    pub(crate) fn output_log(&self, pane_id: &str) -> Result<OutputLog> {
        let state = self.state.read();
        let session_name = state
            .panes
            .get(pane_id)
            .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))?;
        state
            .sessions
            .get(session_name)
            .and_then(|s| s.pane(pane_id))
            .map(|p| p.output.clone())
            .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))
    }

    /// Last `limit` completed lines (0 means the full retained window).
    pub fn output_snapshot(&self, pane_id: &str, limit: usize) -> Result<Vec<OutputLine>> {
        Ok(self.output_log(pane_id)?.snapshot(limit))
    }

    /// Lines with `seq > since`, plus a truncation flag and the cursor to
    /// poll from next.
    pub fn output_lines_since(
        &self,
        pane_id: &str,
        since: u64,
    ) -> Result<(Vec<OutputLine>, bool, u64)> {
        Ok(self.output_log(pane_id)?.lines_since(since))
    }

    /// Wait up to `timeout` for lines past `since`.
    pub async fn wait_for_output(
        &self,
        pane_id: &str,
        since: u64,
        timeout: Duration,
    ) -> Result<(Vec<OutputLine>, bool, u64)> {
        let log = self.output_log(pane_id)?;
        Ok(log.wait_for_lines(since, timeout).await)
    }

    /// Subscribe to a pane's raw output chunks. `buffer` 0 picks the
    /// default (64). The guard unsubscribes on drop.
    pub fn subscribe_raw_output(
        &self,
        pane_id: &str,
        buffer: usize,
    ) -> Result<(mpsc::Receiver<OutputChunk>, RawSubscription)> {
        Ok(self.output_log(pane_id)?.subscribe(buffer))
    }

    /// Wait for a pane's first output. Returns immediately when it has
    /// already produced output or the pane is unknown; `false` only on
    /// timeout.
    pub async fn wait_for_pane_output(&self, pane_id: &str, timeout: Option<Duration>) -> bool {
        let gate = self.gates.lock().get(pane_id).cloned();
        let Some(gate) = gate else { return true };
        match timeout {
            Some(timeout) => tokio::time::timeout(timeout, gate.wait()).await.is_ok(),
            None => {
                gate.wait().await;
                true
            }
        }
    }

    pub(crate) fn ensure_gate(&self, pane_id: &str) -> Arc<OutputGate> {
        self.gates
            .lock()
            .entry(pane_id.to_string())
            .or_insert_with(|| Arc::new(OutputGate::new()))
            .clone()
    }

    // ==================== Resources ====================

    /// Re-divide the scrollback byte budget evenly across all live panes.
    pub(crate) fn apply_scrollback_budgets(&self) {
        let windows: Vec<Arc<dyn TerminalWindow>> = {
            let state = self.state.read();
            state
                .sessions
                .values()
                .flat_map(|s| s.panes.iter().map(|p| p.window.clone()))
                .collect()
        };
        if windows.is_empty() {
            return;
        }
        let share = self.config.scrollback_budget_bytes / windows.len();
        for window in windows {
            window.set_scrollback_max_bytes(share);
        }
    }

    /// Cancel tasks, disable logs, and close windows for removed panes.
    /// Called with no lock held.
    pub(crate) fn teardown_panes(&self, panes: Vec<Pane>) {
        let mut gates = self.gates.lock();
        for pane in &panes {
            gates.remove(&pane.id);
        }
        drop(gates);
        for pane in panes {
            pane.tasks.cancel();
            pane.output.disable();
            pane.window.close();
        }
    }

    /// Shut down the whole engine. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let sessions: Vec<Session> = {
            let mut state = self.state.write();
            state.panes.clear();
            state.sessions.drain().map(|(_, s)| s).collect()
        };
        for session in sessions {
            self.teardown_panes(session.panes);
        }
        self.gates.lock().clear();
        self.events_tx.lock().take();
        self.toasts_tx.lock().take();
        info!("engine closed");
    }
}

/// Empty is allowed (inherit); otherwise the path must be an existing
/// directory.
pub(crate) fn validate_path(path: &str) -> Result<()> {
    let path = path.trim();
    if path.is_empty() {
        return Ok(());
    }
    if !std::path::Path::new(path).is_dir() {
        return Err(WeftError::invalid(format!(
            "path {:?} is not a directory",
            path
        )));
    }
    Ok(())
}
