//! Engine configuration and the command tool detector.
//!
//! Everything here is constructor-injected into [`Manager`]: the engine
//! never reads configuration through globals.
//!
//! [`Manager`]: crate::session::Manager

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;
use weft_layout::{Constraints, SnapConfig};
use weft_utils::{Result, WeftError};

const DEFAULT_SCROLLBACK_BUDGET_BYTES: usize = 8 * 1024 * 1024;
const DEFAULT_OUTPUT_LINE_CAP: usize = 2000;

const MAX_SPAWN_SPACING_MS: u64 = 1000;
const MAX_SPAWN_WAIT_OUTPUT_MS: u64 = 10_000;

/// Engine tuning, loaded from `$XDG_CONFIG_HOME/weft/engine.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Total scrollback byte budget, divided evenly across live panes.
    pub scrollback_budget_bytes: usize,
    /// Retained lines per pane output log.
    pub output_line_cap: usize,
    /// Minimum pane extents on the 1000-unit canvas.
    pub min_pane_width: i32,
    pub min_pane_height: i32,
    pub snap: SnapSettings,
    pub spawn: SpawnPacing,
    /// Extra tool detection rules, tried before the built-ins.
    pub tools: Vec<ToolRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scrollback_budget_bytes: DEFAULT_SCROLLBACK_BUDGET_BYTES,
            output_line_cap: DEFAULT_OUTPUT_LINE_CAP,
            min_pane_width: 50,
            min_pane_height: 50,
            snap: SnapSettings::default(),
            spawn: SpawnPacing::default(),
            tools: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load from a YAML file. A missing file yields the defaults; a file
    /// that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(WeftError::FileRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let mut config: Self = serde_yaml::from_str(&text).map_err(|e| WeftError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.clamp();
        Ok(config)
    }

    fn clamp(&mut self) {
        self.spawn.spacing_ms = self.spawn.spacing_ms.min(MAX_SPAWN_SPACING_MS);
        self.spawn.wait_output_ms = self.spawn.wait_output_ms.min(MAX_SPAWN_WAIT_OUTPUT_MS);
        self.min_pane_width = self.min_pane_width.max(1);
        self.min_pane_height = self.min_pane_height.max(1);
        self.output_line_cap = self.output_line_cap.max(1);
    }

    pub fn constraints(&self) -> Constraints {
        Constraints {
            min_width: self.min_pane_width,
            min_height: self.min_pane_height,
        }
    }

    pub fn snap_config(&self) -> SnapConfig {
        SnapConfig {
            enabled: self.snap.enabled,
            engage: self.snap.engage,
            release: self.snap.release,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    pub enabled: bool,
    pub engage: i32,
    pub release: i32,
}

impl Default for SnapSettings {
    fn default() -> Self {
        let snap = SnapConfig::default();
        Self {
            enabled: snap.enabled,
            engage: snap.engage,
            release: snap.release,
        }
    }
}

/// Pacing for bulk pane startup. When a session spawns more panes than
/// `threshold`, later spawns are spaced out and can wait briefly for the
/// previous pane's first output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnPacing {
    pub threshold: usize,
    pub spacing_ms: u64,
    pub wait_output_ms: u64,
}

impl Default for SpawnPacing {
    fn default() -> Self {
        Self {
            threshold: 8,
            spacing_ms: 25,
            wait_output_ms: 0,
        }
    }
}

/// One tool detection rule: match a command's first word exactly, or the
/// whole command line against a regex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolRule {
    pub tool: String,
    pub command: String,
    pub pattern: String,
}

struct CompiledRule {
    tool: String,
    command: String,
    pattern: Option<Regex>,
}

/// Maps a command line to a tool id shown in snapshots. Rules are checked
/// in order; the first match wins.
pub struct ToolRegistry {
    rules: Vec<CompiledRule>,
}

impl ToolRegistry {
    pub fn new(rules: &[ToolRule]) -> Self {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            if rule.tool.trim().is_empty() {
                continue;
            }
            let pattern = if rule.pattern.trim().is_empty() {
                None
            } else {
                match Regex::new(&rule.pattern) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(tool = %rule.tool, error = %e, "skipping tool rule with invalid pattern");
                        continue;
                    }
                }
            };
            compiled.push(CompiledRule {
                tool: rule.tool.clone(),
                command: rule.command.trim().to_string(),
                pattern,
            });
        }
        Self { rules: compiled }
    }

    /// User rules first, then a small built-in set.
    pub fn with_defaults(rules: &[ToolRule]) -> Self {
        let mut all = rules.to_vec();
        for (tool, command) in [
            ("vim", "vim"),
            ("vim", "nvim"),
            ("git", "git"),
            ("ssh", "ssh"),
            ("htop", "htop"),
            ("python", "python"),
            ("python", "python3"),
            ("node", "node"),
        ] {
            all.push(ToolRule {
                tool: tool.to_string(),
                command: command.to_string(),
                pattern: String::new(),
            });
        }
        Self::new(&all)
    }

    /// Detect the tool for a command line, if any rule matches.
    pub fn detect(&self, command: &str) -> Option<String> {
        let command = command.trim();
        if command.is_empty() {
            return None;
        }
        let first = command.split_whitespace().next().unwrap_or_default();
        let base = first.rsplit('/').next().unwrap_or(first);
        for rule in &self.rules {
            if !rule.command.is_empty() && rule.command == base {
                return Some(rule.tool.clone());
            }
            if let Some(pattern) = &rule.pattern {
                if pattern.is_match(command) {
                    return Some(rule.tool.clone());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // ==================== EngineConfig Tests ====================

    #[test]
    fn test_default_config_values() {
        let config = EngineConfig::default();
        assert_eq!(config.output_line_cap, 2000);
        assert_eq!(config.min_pane_width, 50);
        assert_eq!(config.spawn.threshold, 8);
        assert!(config.snap.enabled);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("engine.yml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "output_line_cap: 500").unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.output_line_cap, 500);
        assert_eq!(config.min_pane_width, 50);
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yml");
        std::fs::write(&path, ": [").unwrap();
        assert!(EngineConfig::load(&path).is_err());
    }

    #[test]
    fn test_spawn_pacing_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yml");
        std::fs::write(&path, "spawn:\n  spacing_ms: 99999\n  wait_output_ms: 99999\n").unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.spawn.spacing_ms, 1000);
        assert_eq!(config.spawn.wait_output_ms, 10_000);
    }

    // ==================== ToolRegistry Tests ====================

    #[test]
    fn test_detect_by_exact_command() {
        let tools = ToolRegistry::with_defaults(&[]);
        assert_eq!(tools.detect("vim src/main.rs"), Some("vim".to_string()));
        assert_eq!(tools.detect("/usr/bin/nvim"), Some("vim".to_string()));
        assert_eq!(tools.detect("ls -la"), None);
    }

    #[test]
    fn test_detect_by_pattern() {
        let tools = ToolRegistry::new(&[ToolRule {
            tool: "build".into(),
            command: String::new(),
            pattern: r"cargo\s+(build|check)".into(),
        }]);
        assert_eq!(tools.detect("cargo build --release"), Some("build".to_string()));
        assert_eq!(tools.detect("cargo run"), None);
    }

    #[test]
    fn test_user_rules_win_over_builtins() {
        let tools = ToolRegistry::with_defaults(&[ToolRule {
            tool: "editor".into(),
            command: "vim".into(),
            pattern: String::new(),
        }]);
        assert_eq!(tools.detect("vim"), Some("editor".to_string()));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let tools = ToolRegistry::new(&[ToolRule {
            tool: "broken".into(),
            command: String::new(),
            pattern: "(".into(),
        }]);
        assert_eq!(tools.detect("anything"), None);
    }

    #[test]
    fn test_detect_empty_command() {
        let tools = ToolRegistry::with_defaults(&[]);
        assert_eq!(tools.detect("   "), None);
    }
}
