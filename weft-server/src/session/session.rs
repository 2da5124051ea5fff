//! A session: a named group of panes with its own layout engine.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use weft_layout::Engine;
use weft_protocol::SessionSnapshot;

use crate::session::pane::Pane;

pub struct Session {
    pub id: Uuid,
    pub name: String,
    pub path: String,
    pub layout_name: String,
    pub created_at: DateTime<Utc>,
    /// Extra environment as `KEY=VALUE` pairs, applied to every pane.
    pub env: Vec<String>,
    pub panes: Vec<Pane>,
    pub engine: Engine,
}

impl Session {
    pub fn pane(&self, pane_id: &str) -> Option<&Pane> {
        self.panes.iter().find(|p| p.id == pane_id)
    }

    pub fn pane_mut(&mut self, pane_id: &str) -> Option<&mut Pane> {
        self.panes.iter_mut().find(|p| p.id == pane_id)
    }

    pub fn pane_by_index(&self, index: &str) -> Option<&Pane> {
        self.panes.iter().find(|p| p.index == index)
    }

    pub fn remove_pane(&mut self, pane_id: &str) -> Option<Pane> {
        let pos = self.panes.iter().position(|p| p.id == pane_id)?;
        Some(self.panes.remove(pos))
    }

    /// Mark one pane active, clearing the flag everywhere else.
    pub fn set_active(&mut self, pane_id: &str) {
        for pane in self.panes.iter_mut() {
            pane.active = pane.id == pane_id;
        }
    }

    pub fn active_pane_id(&self) -> Option<&str> {
        self.panes
            .iter()
            .find(|p| p.active)
            .map(|p| p.id.as_str())
    }

    /// Next free numeric pane index within this session.
    pub fn next_index(&self) -> String {
        let max = self
            .panes
            .iter()
            .filter_map(|p| p.index.parse::<u64>().ok())
            .max();
        match max {
            Some(max) => (max + 1).to_string(),
            None => self.panes.len().to_string(),
        }
    }

    /// Copy the engine's current geometry into the pane fields for the
    /// given panes.
    pub fn project_rects(&mut self, affected: &[String]) {
        let rects = self.engine.tree.rects();
        for pane in self.panes.iter_mut() {
            if !affected.contains(&pane.id) {
                continue;
            }
            if let Some(rect) = rects.get(&pane.id) {
                pane.left = rect.x;
                pane.top = rect.y;
                pane.width = rect.w;
                pane.height = rect.h;
            }
        }
    }

    /// Snapshot with panes ordered by index, numeric indices first.
    pub fn snapshot(&self, preview_lines: usize) -> SessionSnapshot {
        let mut panes: Vec<_> = self.panes.iter().map(|p| p.snapshot(preview_lines)).collect();
        panes.sort_by(|a, b| index_sort_key(&a.index).cmp(&index_sort_key(&b.index)));
        SessionSnapshot {
            id: self.id,
            name: self.name.clone(),
            path: self.path.clone(),
            layout_name: self.layout_name.clone(),
            created_at: self.created_at,
            env: self.env.clone(),
            panes,
        }
    }
}

fn index_sort_key(index: &str) -> (bool, u64, String) {
    match index.parse::<u64>() {
        Ok(n) => (false, n, String::new()),
        Err(_) => (true, 0, index.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_sort_key_numeric_before_lexical() {
        let mut indices = vec!["b", "10", "2", "a", "1"];
        indices.sort_by(|a, b| index_sort_key(a).cmp(&index_sort_key(b)));
        assert_eq!(indices, vec!["1", "2", "10", "a", "b"]);
    }
}
