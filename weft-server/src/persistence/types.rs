//! Persisted session state: serde types and file helpers.
//!
//! One JSON file per session under the state dir. An external writer
//! produces them from `Manager::snapshot()`; the daemon reads them back at
//! startup.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;
use weft_protocol::SessionSnapshot;
use weft_utils::{Result, WeftError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRestoreSpec {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub layout_name: String,
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default)]
    pub panes: Vec<PaneRestoreSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaneRestoreSpec {
    #[serde(default)]
    pub index: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub start_command: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub left: i32,
    #[serde(default)]
    pub top: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PaneRestoreSpec {
    /// Geometry forced back onto the canvas: position into [0,1000],
    /// extent into [1,1000].
    pub fn clamped_rect(&self) -> (i32, i32, i32, i32) {
        (
            self.left.clamp(0, 1000),
            self.top.clamp(0, 1000),
            self.width.clamp(1, 1000),
            self.height.clamp(1, 1000),
        )
    }
}

impl From<&SessionSnapshot> for SessionRestoreSpec {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            path: snapshot.path.clone(),
            layout_name: snapshot.layout_name.clone(),
            env: snapshot.env.clone(),
            panes: snapshot
                .panes
                .iter()
                .map(|p| PaneRestoreSpec {
                    index: p.index.clone(),
                    title: p.title.clone(),
                    command: p.command.clone(),
                    start_command: p.start_command.clone(),
                    cwd: String::new(),
                    left: p.left,
                    top: p.top,
                    width: p.width,
                    height: p.height,
                    active: p.active,
                    tags: p.tags.clone(),
                })
                .collect(),
        }
    }
}

/// Load every `*.json` restore file under `dir`. A missing directory is
/// empty; an unparseable file is skipped with a warning so one corrupt
/// session cannot block the rest.
pub fn load_restore_specs(dir: &Path) -> Result<Vec<SessionRestoreSpec>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(WeftError::FileRead {
                path: dir.to_path_buf(),
                source,
            });
        }
    };
    let mut specs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable restore file");
                continue;
            }
        };
        match serde_json::from_str::<SessionRestoreSpec>(&text) {
            Ok(spec) => specs.push(spec),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping corrupt restore file");
            }
        }
    }
    specs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(specs)
}

/// Write one session's restore file as `<name>.json` under `dir`.
pub fn save_restore_spec(dir: &Path, spec: &SessionRestoreSpec) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| WeftError::FileWrite {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(format!("{}.json", spec.name));
    let text = serde_json::to_string_pretty(spec)
        .map_err(|e| WeftError::internal(format!("encode restore spec: {}", e)))?;
    std::fs::write(&path, text).map_err(|source| WeftError::FileWrite { path, source })
}
