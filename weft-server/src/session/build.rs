//! Pane construction: window spawn, hooks, and bulk spawn pacing.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;
use weft_layout::{Grid, LayoutConfig};
use weft_utils::{Result, WeftError};

use crate::pty::WindowOptions;
use crate::session::manager::Manager;
use crate::session::output_log::OutputLog;
use crate::session::pane::{Pane, PaneTasks};

/// Everything needed to create one pane.
pub(crate) struct PaneSeed {
    pub id: String,
    pub index: String,
    pub title: String,
    pub command: String,
    /// Recorded separately from `command` for restore bookkeeping.
    pub start_command: String,
    pub cwd: String,
    pub env: Vec<String>,
}

impl Manager {
    /// Spawn a window and assemble the pane around it. No lock is held.
    pub(crate) fn create_pane(&self, seed: PaneSeed) -> Result<Pane> {
        let output = OutputLog::new(self.config.output_line_cap);
        let gate = self.ensure_gate(&seed.id);

        let log_hook = output.clone();
        let toast_tx = self.toasts_tx.lock().clone();
        let toast_id = seed.id.clone();

        let command = seed.command.trim().to_string();
        let (program, args) = split_command(&command)?;

        let mut options = WindowOptions::new(seed.id.clone(), program);
        options.args = args;
        options.title = seed.title.clone();
        options.dir = seed.cwd.clone();
        options.env = seed.env.clone();
        options.on_output = Some(Arc::new(move |data: Bytes| log_hook.append(&data)));
        options.on_first_read = Some(Arc::new(move || gate.mark()));
        options.on_toast = Some(Arc::new(move |message: String| {
            if let Some(tx) = &toast_tx {
                let _ = tx.try_send(weft_protocol::Toast::new(&toast_id, message));
            }
        }));

        let window = match (self.spawner)(options) {
            Ok(window) => window,
            Err(e) => {
                self.gates.lock().remove(&seed.id);
                return Err(e);
            }
        };

        let tool = self.tools.detect(&command).unwrap_or_default();
        let dead = window.exited();
        let dead_status = window.exit_status();
        Ok(Pane {
            id: seed.id,
            index: seed.index,
            title: seed.title,
            command,
            start_command: seed.start_command,
            tool,
            pid: window.pid(),
            active: false,
            left: 0,
            top: 0,
            width: 0,
            height: 0,
            dead,
            dead_status,
            restore_failed: false,
            restore_error: String::new(),
            cwd: seed.cwd,
            tags: Vec::new(),
            last_active: Pane::new_last_active(),
            output,
            window,
            tasks: PaneTasks::new(),
        })
    }

    /// Spawn every pane a layout calls for, pacing bulk spawns. On any
    /// failure the already spawned panes are torn down.
    pub(crate) async fn build_layout_panes(
        &self,
        layout: &LayoutConfig,
        path: &str,
        env: &[String],
    ) -> Result<Vec<Pane>> {
        let count = if layout.grid.trim().is_empty() {
            layout.panes.len().max(1)
        } else {
            Grid::parse(&layout.grid)?.panes()
        };
        let pacing = &self.config.spawn;
        let paced = count > pacing.threshold;

        let mut panes: Vec<Pane> = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 && paced {
                if pacing.spacing_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(pacing.spacing_ms)).await;
                }
                if pacing.wait_output_ms > 0 {
                    let prev = &panes[i - 1].id;
                    self.wait_for_pane_output(prev, Some(Duration::from_millis(pacing.wait_output_ms)))
                        .await;
                }
            }
            let cwd = layout
                .panes
                .get(i)
                .map(|def| def.cwd.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| path.to_string());
            let command = layout.command_for(i);
            let seed = PaneSeed {
                id: self.next_pane_id(),
                index: i.to_string(),
                title: layout.title_for(i),
                command: command.clone(),
                start_command: command,
                cwd,
                env: env.to_vec(),
            };
            match self.create_pane(seed) {
                Ok(pane) => panes.push(pane),
                Err(e) => {
                    debug!(error = %e, "pane spawn failed, tearing down session start");
                    self.teardown_panes(panes);
                    return Err(e);
                }
            }
        }
        Ok(panes)
    }
}

/// Split a command line into program and args. Empty means "run a shell";
/// the caller sees the resolved shell so snapshots display it.
fn split_command(command: &str) -> Result<(String, Vec<String>)> {
    if command.trim().is_empty() {
        return Ok((default_shell(), Vec::new()));
    }
    let parts = shell_words::split(command)
        .map_err(|e| WeftError::invalid(format!("bad command {:?}: {}", command, e)))?;
    match parts.split_first() {
        Some((program, args)) => Ok((program.clone(), args.to_vec())),
        None => Ok((default_shell(), Vec::new())),
    }
}

pub(crate) fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}
