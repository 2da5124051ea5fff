//! Declarative layout definitions loaded from YAML.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use weft_utils::{Result, WeftError};

use crate::tree::Axis;

/// A named layout: either a `grid` shorthand or an ordered list of pane
/// definitions that split off the first pane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Substitution variables available as `${name}` in commands, titles,
    /// and send text. Environment variables fill the gaps.
    #[serde(default)]
    pub vars: HashMap<String, String>,
    /// Grid shorthand like "2x3" (rows x columns). Takes precedence over
    /// `panes` when set.
    #[serde(default)]
    pub grid: String,
    /// Command run in every pane that has no more specific command.
    #[serde(default)]
    pub command: String,
    /// Per-cell commands for grid layouts, in row-major order.
    #[serde(default)]
    pub commands: Vec<String>,
    /// Per-cell titles for grid layouts, in row-major order.
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub panes: Vec<PaneDef>,
    /// Automation sends delivered to every pane after startup.
    #[serde(default)]
    pub broadcast_send: Vec<SendAction>,
}

impl LayoutConfig {
    pub fn from_yaml(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).map_err(|e| WeftError::config(format!("invalid layout: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| WeftError::config(format!("layout encode: {}", e)))
    }

    /// Command for the pane at `index`, falling back to the shared command.
    pub fn command_for(&self, index: usize) -> String {
        if let Some(def) = self.panes.get(index) {
            if !def.cmd.trim().is_empty() {
                return def.cmd.clone();
            }
        }
        if let Some(cmd) = self.commands.get(index) {
            if !cmd.trim().is_empty() {
                return cmd.clone();
            }
        }
        self.command.clone()
    }

    /// Title for the pane at `index`, empty when unspecified.
    pub fn title_for(&self, index: usize) -> String {
        if let Some(def) = self.panes.get(index) {
            if !def.title.trim().is_empty() {
                return def.title.clone();
            }
        }
        self.titles.get(index).cloned().unwrap_or_default()
    }
}

/// One pane in a list layout. Every def after the first splits the first
/// pane along its declared axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaneDef {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cmd: String,
    /// Share of the split given to this pane, e.g. "30" or "30%".
    #[serde(default)]
    pub size: String,
    /// Split direction: "vertical"/"v" stacks, anything else is side by
    /// side.
    #[serde(default)]
    pub split: String,
    /// Working directory override for this pane.
    #[serde(default)]
    pub cwd: String,
    /// Automation sends delivered to this pane only.
    #[serde(default)]
    pub direct_send: Vec<SendAction>,
}

impl PaneDef {
    pub fn split_axis(&self) -> Axis {
        match self.split.trim().to_ascii_lowercase().as_str() {
            "vertical" | "v" => Axis::Vertical,
            _ => Axis::Horizontal,
        }
    }
}

/// One scripted keystroke burst for a pane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendAction {
    #[serde(default)]
    pub text: String,
    /// Delay before the text is written. `None` means the default pacing.
    #[serde(default)]
    pub send_delay_ms: Option<u64>,
    /// Send a bare carriage return after the text instead of appending a
    /// newline to it.
    #[serde(default)]
    pub submit: bool,
    #[serde(default)]
    pub submit_delay_ms: Option<u64>,
    /// Hold the send until the pane has produced output.
    #[serde(default)]
    pub wait_for_output: bool,
}

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .unwrap_or_else(|_| unreachable!("var pattern is valid"))
    })
}

/// Expand `${name}` and `${name:-default}` references. Layout vars win over
/// the environment; an unset variable without a default expands to empty.
/// Also expands `$HOME` and a leading `~/`.
pub fn expand_vars(input: &str, vars: &HashMap<String, String>) -> String {
    let mut out = var_pattern()
        .replace_all(input, |caps: &regex::Captures| {
            let name = &caps[1];
            if let Some(value) = vars.get(name) {
                return value.clone();
            }
            if let Ok(value) = std::env::var(name) {
                return value;
            }
            caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default()
        })
        .into_owned();
    if let Ok(home) = std::env::var("HOME") {
        if out.starts_with("~/") {
            out = format!("{}{}", home, &out[1..]);
        } else if out == "~" {
            out = home.clone();
        }
        out = out.replace("$HOME", &home);
    }
    out
}

/// Expand variables through every user-facing string of a layout.
pub fn expand_layout_vars(config: &mut LayoutConfig) {
    let vars = config.vars.clone();
    config.command = expand_vars(&config.command, &vars);
    for cmd in config.commands.iter_mut() {
        *cmd = expand_vars(cmd, &vars);
    }
    for title in config.titles.iter_mut() {
        *title = expand_vars(title, &vars);
    }
    for def in config.panes.iter_mut() {
        def.title = expand_vars(&def.title, &vars);
        def.cmd = expand_vars(&def.cmd, &vars);
        def.cwd = expand_vars(&def.cwd, &vars);
        for action in def.direct_send.iter_mut() {
            action.text = expand_vars(&action.text, &vars);
        }
    }
    for action in config.broadcast_send.iter_mut() {
        action.text = expand_vars(&action.text, &vars);
    }
}

/// Parse a size like "30" or "30%" into a percentage. Malformed input
/// yields 0, which downstream treats as "use the default share".
pub fn parse_percent(input: &str) -> i32 {
    let trimmed = input.trim().trim_end_matches('%').trim();
    trimmed.parse::<i32>().unwrap_or(0)
}
