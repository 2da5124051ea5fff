//! Layout-driven automation sends.
//!
//! Each pane with queued sends gets one task that plays them back in
//! order. Failures surface as toasts; an oversized payload is skipped,
//! never silently truncated.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;
use weft_layout::{Grid, LayoutConfig, SendAction};

use crate::session::manager::Manager;

const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(750);
const MAX_SEND_DELAY: Duration = Duration::from_secs(300);
const MAX_SEND_BYTES: usize = 64 * 1024;

/// A validated send action with delays resolved and clamped.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NormalizedSend {
    pub text: String,
    /// Pre-delay; with `wait_output` set this is the wait timeout instead.
    pub delay: Duration,
    pub wait_output: bool,
    pub submit: bool,
    pub submit_delay: Duration,
}

/// Reject empty text; an action with no explicit delay waits for the
/// pane's first output (bounded by the default delay). Delays are clamped
/// to five minutes.
pub(crate) fn normalize_send_action(action: &SendAction) -> Option<NormalizedSend> {
    if action.text.trim().is_empty() {
        return None;
    }
    let delay = match action.send_delay_ms {
        Some(ms) => Duration::from_millis(ms).min(MAX_SEND_DELAY),
        None => DEFAULT_SEND_DELAY,
    };
    Some(NormalizedSend {
        text: action.text.clone(),
        delay,
        wait_output: action.wait_for_output || action.send_delay_ms.is_none(),
        submit: action.submit,
        submit_delay: action
            .submit_delay_ms
            .map(|ms| Duration::from_millis(ms).min(MAX_SEND_DELAY))
            .unwrap_or(Duration::ZERO),
    })
}

/// Submit sends the text bare (trailing newlines trimmed) and follows up
/// with a carriage return; a plain send gets a newline appended.
pub(crate) fn build_send_payload(send: &NormalizedSend) -> Vec<u8> {
    if send.submit {
        send.text.trim_end_matches(['\r', '\n']).as_bytes().to_vec()
    } else {
        let mut payload = send.text.clone().into_bytes();
        payload.push(b'\n');
        payload
    }
}

/// Per-pane-index queues: broadcast actions for every pane, then each
/// definition's direct sends for the pane with the matching index.
pub(crate) fn build_send_queues(layout: &LayoutConfig) -> HashMap<String, Vec<NormalizedSend>> {
    let count = if layout.grid.trim().is_empty() {
        layout.panes.len().max(1)
    } else {
        Grid::parse(&layout.grid).map(|g| g.panes()).unwrap_or(0)
    };
    let broadcast: Vec<NormalizedSend> = layout
        .broadcast_send
        .iter()
        .filter_map(normalize_send_action)
        .collect();

    let mut queues: HashMap<String, Vec<NormalizedSend>> = HashMap::new();
    for i in 0..count {
        if !broadcast.is_empty() {
            queues.insert(i.to_string(), broadcast.clone());
        }
    }
    for (i, def) in layout.panes.iter().enumerate() {
        let direct: Vec<NormalizedSend> = def
            .direct_send
            .iter()
            .filter_map(normalize_send_action)
            .collect();
        if !direct.is_empty() {
            queues.entry(i.to_string()).or_default().extend(direct);
        }
    }
    queues
}

impl Manager {
    /// Spawn one playback task per pane that has queued sends. Tasks stop
    /// when the pane's cancellation token fires.
    pub(crate) fn dispatch_layout_sends(&self, session_name: &str, layout: &LayoutConfig) {
        let queues = build_send_queues(layout);
        if queues.is_empty() {
            return;
        }
        let targets: Vec<(String, tokio_util::sync::CancellationToken, Vec<NormalizedSend>)> = {
            let state = self.state.read();
            let Some(session) = state.sessions.get(session_name) else {
                return;
            };
            session
                .panes
                .iter()
                .filter_map(|pane| {
                    queues
                        .get(&pane.index)
                        .map(|queue| (pane.id.clone(), pane.tasks.token(), queue.clone()))
                })
                .collect()
        };

        for (pane_id, token, queue) in targets {
            let Some(manager) = self.weak.upgrade() else { return };
            debug!(pane_id = %pane_id, sends = queue.len(), "dispatching automation sends");
            tokio::spawn(async move {
                run_pane_send_queue(manager, pane_id, token, queue).await;
            });
        }
    }

    pub(crate) fn set_pane_tool(&self, pane_id: &str, tool: &str) {
        let _ = self.with_pane_tool(pane_id, tool);
    }

    fn with_pane_tool(&self, pane_id: &str, tool: &str) -> weft_utils::Result<()> {
        let mut state = self.state.write();
        let session_name = state
            .panes
            .get(pane_id)
            .cloned()
            .ok_or_else(|| weft_utils::WeftError::PaneNotFound(pane_id.to_string()))?;
        if let Some(pane) = state
            .sessions
            .get_mut(&session_name)
            .and_then(|s| s.pane_mut(pane_id))
        {
            pane.tool = tool.to_string();
        }
        Ok(())
    }
}

async fn run_pane_send_queue(
    manager: std::sync::Arc<Manager>,
    pane_id: String,
    token: tokio_util::sync::CancellationToken,
    queue: Vec<NormalizedSend>,
) {
    for send in queue {
        if token.is_cancelled() {
            return;
        }
        if send.wait_output {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = manager.wait_for_pane_output(&pane_id, Some(send.delay)) => {}
            }
        } else if !send.delay.is_zero() {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(send.delay) => {}
            }
        }

        let payload = build_send_payload(&send);
        if payload.len() > MAX_SEND_BYTES {
            manager.emit_toast(&pane_id, "Automation send skipped: payload too large");
            continue;
        }
        if let Err(e) = manager.send_input(&pane_id, &payload) {
            manager.emit_toast(&pane_id, format!("Automation send failed: {}", e));
            continue;
        }

        if send.submit {
            if let Some(tool) = manager.tools.detect(&send.text) {
                manager.set_pane_tool(&pane_id, &tool);
            }
            if !send.submit_delay.is_zero() {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(send.submit_delay) => {}
                }
            }
            if let Err(e) = manager.send_input(&pane_id, b"\r") {
                manager.emit_toast(&pane_id, format!("Automation submit failed: {}", e));
                continue;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, ToolRegistry};
    use crate::pty::FakeWindow;
    use crate::session::manager::SessionSpec;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use weft_layout::PaneDef;

    // ==================== Normalization Tests ====================

    #[test]
    fn test_normalize_rejects_empty_text() {
        assert!(normalize_send_action(&SendAction::default()).is_none());
    }

    #[test]
    fn test_normalize_no_delay_waits_for_output() {
        let send = normalize_send_action(&SendAction {
            text: "ls".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(send.wait_output);
        assert_eq!(send.delay, DEFAULT_SEND_DELAY);
        assert_eq!(send.submit_delay, Duration::ZERO);
    }

    #[test]
    fn test_normalize_explicit_delay_skips_waiting() {
        let send = normalize_send_action(&SendAction {
            text: "ls".into(),
            send_delay_ms: Some(100),
            ..Default::default()
        })
        .unwrap();
        assert!(!send.wait_output);
        assert_eq!(send.delay, Duration::from_millis(100));
    }

    #[test]
    fn test_normalize_explicit_delay_can_still_wait() {
        let send = normalize_send_action(&SendAction {
            text: "ls".into(),
            send_delay_ms: Some(100),
            wait_for_output: true,
            ..Default::default()
        })
        .unwrap();
        assert!(send.wait_output);
    }

    #[test]
    fn test_normalize_clamps_huge_delay() {
        let send = normalize_send_action(&SendAction {
            text: "ls".into(),
            send_delay_ms: Some(86_400_000),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(send.delay, MAX_SEND_DELAY);
    }

    // ==================== Payload Tests ====================

    #[test]
    fn test_payload_appends_newline() {
        let send = normalize_send_action(&SendAction {
            text: "echo hi".into(),
            send_delay_ms: Some(0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(build_send_payload(&send), b"echo hi\n");
    }

    #[test]
    fn test_payload_submit_trims_trailing_newlines() {
        let send = normalize_send_action(&SendAction {
            text: "run\r\n".into(),
            submit: true,
            send_delay_ms: Some(0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(build_send_payload(&send), b"run");
    }

    // ==================== Queue Building Tests ====================

    #[test]
    fn test_broadcast_reaches_every_pane() {
        let layout = LayoutConfig {
            panes: vec![PaneDef::default(), PaneDef::default()],
            broadcast_send: vec![SendAction {
                text: "clear".into(),
                send_delay_ms: Some(0),
                ..Default::default()
            }],
            ..Default::default()
        };
        let queues = build_send_queues(&layout);
        assert_eq!(queues.len(), 2);
        assert!(queues.contains_key("0"));
        assert!(queues.contains_key("1"));
    }

    #[test]
    fn test_direct_send_maps_by_definition_index() {
        let layout = LayoutConfig {
            panes: vec![
                PaneDef::default(),
                PaneDef {
                    direct_send: vec![SendAction {
                        text: "only second".into(),
                        send_delay_ms: Some(0),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let queues = build_send_queues(&layout);
        assert_eq!(queues.len(), 1);
        assert_eq!(queues["1"][0].text, "only second");
    }

    // ==================== Playback Tests ====================

    type Created = Arc<Mutex<Vec<Arc<FakeWindow>>>>;

    fn test_manager() -> (Arc<Manager>, Created) {
        let created: Created = Arc::new(Mutex::new(Vec::new()));
        let manager = Manager::new(
            EngineConfig::default(),
            ToolRegistry::with_defaults(&[]),
            FakeWindow::spawner(created.clone()),
        );
        (manager, created)
    }

    fn fake(created: &Created, pane_id: &str) -> Arc<FakeWindow> {
        created
            .lock()
            .iter()
            .find(|w| crate::pty::TerminalWindow::id(w.as_ref()) == pane_id)
            .cloned()
            .unwrap()
    }

    async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_broadcast_send_delivered_to_all_panes() {
        let (manager, created) = test_manager();
        manager
            .start_session(SessionSpec {
                name: "auto".into(),
                layout: Some(LayoutConfig {
                    panes: vec![PaneDef::default(), PaneDef::default()],
                    broadcast_send: vec![SendAction {
                        text: "hello".into(),
                        send_delay_ms: Some(0),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(wait_until(|| fake(&created, "p-1").input_text() == "hello\n").await);
        assert!(wait_until(|| fake(&created, "p-2").input_text() == "hello\n").await);
    }

    #[tokio::test]
    async fn test_wait_for_output_send_fires_after_first_output() {
        let (manager, created) = test_manager();
        manager
            .start_session(SessionSpec {
                name: "auto".into(),
                layout: Some(LayoutConfig {
                    panes: vec![PaneDef {
                        direct_send: vec![SendAction {
                            text: "after output".into(),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fake(&created, "p-1").input_text().is_empty());
        fake(&created, "p-1").emit_output(b"prompt$ ");
        assert!(wait_until(|| fake(&created, "p-1").input_text() == "after output\n").await);
    }

    #[tokio::test]
    async fn test_submit_sends_carriage_return_and_detects_tool() {
        let (manager, created) = test_manager();
        manager
            .start_session(SessionSpec {
                name: "auto".into(),
                layout: Some(LayoutConfig {
                    panes: vec![PaneDef {
                        direct_send: vec![SendAction {
                            text: "vim notes.txt".into(),
                            submit: true,
                            send_delay_ms: Some(0),
                            submit_delay_ms: Some(0),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(wait_until(|| fake(&created, "p-1").input_text() == "vim notes.txt\r").await);
        assert!(wait_until(|| {
            manager
                .snapshot_session("auto", 0)
                .unwrap()
                .panes[0]
                .tool
                == "vim"
        })
        .await);
    }

    #[tokio::test]
    async fn test_oversized_payload_produces_toast() {
        let (manager, created) = test_manager();
        let mut toasts = manager.take_toasts().unwrap();
        manager
            .start_session(SessionSpec {
                name: "auto".into(),
                layout: Some(LayoutConfig {
                    panes: vec![PaneDef {
                        direct_send: vec![SendAction {
                            text: "x".repeat(MAX_SEND_BYTES + 1),
                            send_delay_ms: Some(0),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            })
            .await
            .unwrap();
        let toast = toasts.recv().await.unwrap();
        assert_eq!(toast.pane_id, "p-1");
        assert!(toast.message.contains("payload too large"));
        assert!(fake(&created, "p-1").input_text().is_empty());
    }

    #[tokio::test]
    async fn test_failed_send_produces_toast() {
        let (manager, created) = test_manager();
        let mut toasts = manager.take_toasts().unwrap();
        manager
            .start_session(SessionSpec {
                name: "auto".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        fake(&created, "p-1").set_fail_input(true);
        manager.dispatch_layout_sends(
            "auto",
            &LayoutConfig {
                panes: vec![PaneDef {
                    direct_send: vec![SendAction {
                        text: "doomed".into(),
                        send_delay_ms: Some(0),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        let toast = toasts.recv().await.unwrap();
        assert!(toast.message.contains("send failed"));
    }
}
