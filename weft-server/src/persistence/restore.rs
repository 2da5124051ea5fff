//! Session restore: rebuild a session from its persisted spec.
//!
//! Restore is forgiving. A pane whose command no longer spawns comes back
//! as a shell pane flagged `restore_failed`; a session file with no panes
//! yields one synthetic shell pane so the session still appears. Pane ids
//! are freshly allocated, indices and geometry come from the file.

use std::path::Path;

use tracing::{info, warn};
use uuid::Uuid;
use weft_layout::{build_tree, Engine, LayoutConfig};
use weft_protocol::SessionSnapshot;
use weft_utils::{Result, WeftError};

use crate::persistence::types::{PaneRestoreSpec, SessionRestoreSpec};
use crate::session::build::PaneSeed;
use crate::session::manager::Manager;
use crate::session::pane::{normalize_tags, Pane};
use crate::session::session::Session;

impl Manager {
    /// Rebuild one session from a persisted spec. Fails only on an empty
    /// name, a name collision, or when even the fallback shell cannot
    /// spawn; everything else degrades per pane.
    pub async fn restore_session(&self, spec: SessionRestoreSpec) -> Result<SessionSnapshot> {
        self.ensure_open()?;
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(WeftError::invalid("session name is required"));
        }
        let mut path = spec.path.trim().to_string();
        if !path.is_empty() && !Path::new(&path).is_dir() {
            warn!(session = %name, path = %path, "restore path no longer exists, inheriting cwd");
            path.clear();
        }

        let synthetic = spec.panes.is_empty();
        let pane_specs = if synthetic {
            vec![PaneRestoreSpec {
                index: "0".to_string(),
                width: 1000,
                height: 1000,
                active: true,
                ..Default::default()
            }]
        } else {
            spec.panes.clone()
        };

        let mut panes: Vec<Pane> = Vec::with_capacity(pane_specs.len());
        for (i, pane_spec) in pane_specs.iter().enumerate() {
            match self.restore_pane(pane_spec, i, &path, &spec.env) {
                Ok(mut pane) => {
                    pane.tags = normalize_tags(&pane_spec.tags);
                    if synthetic {
                        pane.restore_failed = true;
                        pane.restore_error = "no panes to restore".to_string();
                    }
                    panes.push(pane);
                }
                Err(e) => {
                    self.teardown_panes(panes);
                    return Err(e);
                }
            }
        }
        let ids: Vec<String> = panes.iter().map(|p| p.id.clone()).collect();

        // The split structure is not persisted; rebuild a plain tree and
        // let the saved geometry win over its guess.
        let tree = match build_tree(&LayoutConfig::default(), &ids) {
            Ok(tree) => tree,
            Err(e) => {
                self.teardown_panes(panes);
                return Err(e);
            }
        };
        let mut engine = Engine::new(tree);
        engine.constraints = self.config.constraints();
        engine.snap = self.config.snap_config();

        for (pane, pane_spec) in panes.iter_mut().zip(&pane_specs) {
            let (left, top, width, height) = pane_spec.clamped_rect();
            pane.left = left;
            pane.top = top;
            pane.width = width;
            pane.height = height;
        }

        let active_id = pane_specs
            .iter()
            .zip(&panes)
            .find(|(pane_spec, _)| pane_spec.active)
            .map(|(_, pane)| pane.id.clone())
            .unwrap_or_else(|| panes[0].id.clone());

        let mut session = Session {
            id: Uuid::new_v4(),
            name: name.clone(),
            path,
            layout_name: spec.layout_name.clone(),
            created_at: chrono::Utc::now(),
            env: spec.env.clone(),
            panes,
            engine,
        };
        session.set_active(&active_id);

        self.register_session(session)?;
        self.apply_scrollback_budgets();
        self.bump_version();
        self.emit_events(&ids);
        info!(session = %name, panes = ids.len(), "session restored");
        self.snapshot_session(&name, 0)
    }

    /// Spawn one restored pane. When the recorded command fails to spawn,
    /// fall back to a plain shell and carry the failure on the pane.
    fn restore_pane(
        &self,
        spec: &PaneRestoreSpec,
        position: usize,
        path: &str,
        env: &[String],
    ) -> Result<Pane> {
        let start = spec.start_command.trim();
        let intended = if !start.is_empty() {
            start.to_string()
        } else {
            spec.command.trim().to_string()
        };
        let cwd = {
            let cwd = spec.cwd.trim();
            if !cwd.is_empty() && Path::new(cwd).is_dir() {
                cwd.to_string()
            } else {
                path.to_string()
            }
        };
        let index = if spec.index.trim().is_empty() {
            position.to_string()
        } else {
            spec.index.trim().to_string()
        };

        let seed = PaneSeed {
            id: self.next_pane_id(),
            index: index.clone(),
            title: spec.title.clone(),
            command: intended.clone(),
            start_command: intended.clone(),
            cwd: cwd.clone(),
            env: env.to_vec(),
        };
        let error = match self.create_pane(seed) {
            Ok(pane) => return Ok(pane),
            Err(e) => e,
        };

        warn!(
            index = %index,
            command = %intended,
            error = %error,
            "restored pane failed to spawn, falling back to a shell"
        );
        let seed = PaneSeed {
            id: self.next_pane_id(),
            index,
            title: spec.title.clone(),
            command: String::new(),
            start_command: String::new(),
            cwd,
            env: env.to_vec(),
        };
        let mut pane = self.create_pane(seed)?;
        // Keep showing what the pane was supposed to run.
        pane.command = intended;
        pane.restore_failed = true;
        pane.restore_error = error.to_string();
        Ok(pane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::config::{EngineConfig, ToolRegistry};
    use crate::pty::{FakeWindow, WindowSpawner};

    type Created = Arc<Mutex<Vec<Arc<FakeWindow>>>>;

    /// Fails any spawn whose command is `ghost-cmd`; otherwise a fake.
    fn flaky_spawner(created: Created) -> WindowSpawner {
        let inner = FakeWindow::spawner(created);
        Arc::new(move |options| {
            if options.command == "ghost-cmd" {
                return Err(WeftError::spawn("ghost-cmd: command not found"));
            }
            inner(options)
        })
    }

    fn restore_manager() -> (Arc<Manager>, Created) {
        let created: Created = Arc::new(Mutex::new(Vec::new()));
        let manager = Manager::new(
            EngineConfig::default(),
            ToolRegistry::with_defaults(&[]),
            flaky_spawner(created.clone()),
        );
        (manager, created)
    }

    fn two_pane_spec() -> SessionRestoreSpec {
        SessionRestoreSpec {
            name: "dev".into(),
            layout_name: "dev-layout".into(),
            panes: vec![
                PaneRestoreSpec {
                    index: "0".into(),
                    title: "editor".into(),
                    command: "vim notes.txt".into(),
                    left: 0,
                    top: 0,
                    width: 600,
                    height: 1000,
                    ..Default::default()
                },
                PaneRestoreSpec {
                    index: "1".into(),
                    command: "htop".into(),
                    left: 600,
                    top: 0,
                    width: 400,
                    height: 1000,
                    active: true,
                    tags: vec!["Monitor".into()],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    // ==================== Restore Tests ====================

    #[tokio::test]
    async fn test_restore_preserves_geometry_and_active_flag() {
        let (manager, _) = restore_manager();
        let snapshot = manager.restore_session(two_pane_spec()).await.unwrap();
        assert_eq!(snapshot.layout_name, "dev-layout");
        assert_eq!(snapshot.panes.len(), 2);
        let editor = &snapshot.panes[0];
        let monitor = &snapshot.panes[1];
        assert_eq!(editor.index, "0");
        assert_eq!(editor.command, "vim notes.txt");
        assert_eq!(editor.tool, "vim");
        assert_eq!(
            (editor.left, editor.top, editor.width, editor.height),
            (0, 0, 600, 1000)
        );
        assert!(!editor.active);
        assert!(monitor.active);
        assert_eq!(monitor.tags, vec!["monitor"]);
        assert!(!editor.restore_failed);
    }

    #[tokio::test]
    async fn test_restore_clamps_geometry_to_canvas() {
        let (manager, _) = restore_manager();
        let mut spec = two_pane_spec();
        spec.panes[0].left = -200;
        spec.panes[0].width = 9999;
        let snapshot = manager.restore_session(spec).await.unwrap();
        let pane = &snapshot.panes[0];
        assert_eq!((pane.left, pane.width), (0, 1000));
    }

    #[tokio::test]
    async fn test_restore_without_active_flag_activates_first() {
        let (manager, _) = restore_manager();
        let mut spec = two_pane_spec();
        for pane in &mut spec.panes {
            pane.active = false;
        }
        let snapshot = manager.restore_session(spec).await.unwrap();
        assert!(snapshot.panes[0].active);
        assert!(!snapshot.panes[1].active);
    }

    #[tokio::test]
    async fn test_restore_zero_panes_creates_synthetic_shell() {
        let (manager, _) = restore_manager();
        let snapshot = manager
            .restore_session(SessionRestoreSpec {
                name: "empty".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(snapshot.panes.len(), 1);
        let pane = &snapshot.panes[0];
        assert_eq!(pane.index, "0");
        assert!(pane.active);
        assert!(pane.restore_failed);
        assert_eq!(pane.restore_error, "no panes to restore");
        assert_eq!(
            (pane.left, pane.top, pane.width, pane.height),
            (0, 0, 1000, 1000)
        );
    }

    #[tokio::test]
    async fn test_restore_spawn_failure_falls_back_to_shell() {
        let (manager, created) = restore_manager();
        let mut spec = two_pane_spec();
        spec.panes[0].command = "ghost-cmd".into();
        let snapshot = manager.restore_session(spec).await.unwrap();
        let failed = &snapshot.panes[0];
        assert!(failed.restore_failed);
        assert!(failed.restore_error.contains("ghost-cmd"));
        // The intended command is still shown, but nothing is queued to run.
        assert_eq!(failed.command, "ghost-cmd");
        assert_eq!(failed.start_command, "");
        assert!(!failed.dead);
        // One failed attempt plus two live windows.
        assert_eq!(created.lock().len(), 2);
        // The healthy pane restored normally.
        assert!(!snapshot.panes[1].restore_failed);
    }

    #[tokio::test]
    async fn test_restore_requires_name() {
        let (manager, _) = restore_manager();
        let err = manager
            .restore_session(SessionRestoreSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WeftError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_restore_name_collision_tears_down() {
        let (manager, created) = restore_manager();
        manager.restore_session(two_pane_spec()).await.unwrap();
        let err = manager.restore_session(two_pane_spec()).await.unwrap_err();
        assert!(matches!(err, WeftError::SessionExists(_)));
        // Second attempt's windows are closed, first session untouched.
        let windows = created.lock().clone();
        assert_eq!(windows.len(), 4);
        assert!(windows[2].is_closed());
        assert!(windows[3].is_closed());
        assert!(!windows[0].is_closed());
    }

    #[tokio::test]
    async fn test_restore_drops_missing_path() {
        let (manager, _) = restore_manager();
        let mut spec = two_pane_spec();
        spec.path = "/definitely/not/a/real/dir".into();
        let snapshot = manager.restore_session(spec).await.unwrap();
        assert_eq!(snapshot.path, "");
    }

    #[tokio::test]
    async fn test_restored_session_accepts_layout_ops() {
        let (manager, _) = restore_manager();
        manager.restore_session(two_pane_spec()).await.unwrap();
        let new = manager
            .split_pane("dev", "p-1", weft_layout::Axis::Horizontal, 50)
            .unwrap();
        assert_eq!(new.id, "p-3");
        let snapshot = manager.snapshot_session("dev", 0).unwrap();
        assert_eq!(snapshot.panes.len(), 3);
    }
}
