//! The closed operation set and the engine that applies it.

use weft_utils::{Result, WeftError};

use crate::snap::{snap_position_with_targets, SnapConfig, SnapState};
use crate::tree::{Axis, Node, NodeId, NodeKind, Rect, Tree};

/// Edge of a pane being dragged during a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
    Up,
    Down,
}

impl Edge {
    pub fn axis(&self) -> Axis {
        match self {
            Edge::Left | Edge::Right => Axis::Horizontal,
            Edge::Up | Edge::Down => Axis::Vertical,
        }
    }
}

/// One layout mutation. The set is closed: `Engine::apply` matches every
/// variant exhaustively, so adding an operation is a compile-time event.
#[derive(Debug, Clone)]
pub enum Op {
    Resize {
        pane_id: String,
        edge: Edge,
        delta: i32,
        snap: bool,
        snap_state: SnapState,
    },
    Split {
        pane_id: String,
        new_pane_id: String,
        axis: Axis,
        percent: i32,
    },
    Close {
        pane_id: String,
    },
    ResetSizes {
        /// Restrict the reset to the subtree around this pane; `None`
        /// resets the whole tree.
        pane_id: Option<String>,
    },
    Swap {
        a: String,
        b: String,
    },
    Zoom {
        pane_id: String,
        toggle: bool,
    },
}

/// Outcome of one applied operation.
#[derive(Debug, Clone, Default)]
pub struct ApplyResult {
    pub changed: bool,
    pub snapped: bool,
    pub snap_state: SnapState,
    /// Panes whose rect changed; used to scope notification, not locking.
    pub affected: Vec<String>,
}

/// Minimum pane extents on the 1000-unit canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
    pub min_width: i32,
    pub min_height: i32,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            min_width: 50,
            min_height: 50,
        }
    }
}

/// Bounded undo history of tree snapshots.
#[derive(Debug, Clone, Default)]
pub struct History {
    pub limit: usize,
    entries: Vec<Tree>,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, tree: Tree) {
        if self.limit > 0 && self.entries.len() >= self.limit {
            self.entries.remove(0);
        }
        self.entries.push(tree);
    }

    pub fn pop(&mut self) -> Option<Tree> {
        self.entries.pop()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Layout engine: a tree plus the knobs that govern mutations.
#[derive(Debug, Clone)]
pub struct Engine {
    pub tree: Tree,
    pub constraints: Constraints,
    pub snap: SnapConfig,
    pub history: History,
}

impl Engine {
    pub fn new(tree: Tree) -> Self {
        Self {
            tree,
            constraints: Constraints::default(),
            snap: SnapConfig::default(),
            history: History::new(200),
        }
    }

    /// Apply one operation, recording an undo snapshot when it changed
    /// anything. `ResetSizes` clears the history.
    pub fn apply(&mut self, op: Op) -> Result<ApplyResult> {
        let before = self.tree.clone();
        let is_reset = matches!(op, Op::ResetSizes { .. });
        let result = match op {
            Op::Resize {
                pane_id,
                edge,
                delta,
                snap,
                snap_state,
            } => self.apply_resize(&pane_id, edge, delta, snap, snap_state)?,
            Op::Split {
                pane_id,
                new_pane_id,
                axis,
                percent,
            } => self.apply_split(&pane_id, &new_pane_id, axis, percent)?,
            Op::Close { pane_id } => self.apply_close(&pane_id)?,
            Op::ResetSizes { pane_id } => self.apply_reset_sizes(pane_id.as_deref())?,
            Op::Swap { a, b } => self.apply_swap(&a, &b)?,
            Op::Zoom { pane_id, toggle } => self.apply_zoom(&pane_id, toggle)?,
        };
        if result.changed {
            self.history.record(before);
        }
        if is_reset {
            self.history.clear();
        }
        Ok(result)
    }

    /// Restore the most recent history snapshot, if any.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(tree) => {
                self.tree = tree;
                true
            }
            None => false,
        }
    }

    fn min_size_for(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Horizontal => self.constraints.min_width,
            Axis::Vertical => self.constraints.min_height,
        }
    }

    fn require_leaf(&self, pane_id: &str) -> Result<NodeId> {
        self.tree
            .leaf(pane_id)
            .ok_or_else(|| WeftError::PaneNotFound(pane_id.to_string()))
    }

    fn apply_resize(
        &mut self,
        pane_id: &str,
        edge: Edge,
        delta: i32,
        snap: bool,
        snap_state: SnapState,
    ) -> Result<ApplyResult> {
        let pane_id = pane_id.trim();
        if pane_id.is_empty() {
            return Err(WeftError::invalid("resize requires pane id"));
        }
        let leaf = self.require_leaf(pane_id)?;
        let (split_id, before_id, after_id) = find_split_for_edge(&self.tree, leaf, edge)?;
        let axis = match &self.tree.node(split_id).map(|n| &n.kind) {
            Some(NodeKind::Split { axis, .. }) => *axis,
            _ => return Err(WeftError::internal("resize split vanished")),
        };
        let before_size = self
            .tree
            .node(before_id)
            .map(|n| n.size)
            .unwrap_or_default();
        let after_size = self.tree.node(after_id).map(|n| n.size).unwrap_or_default();
        let total = before_size + after_size;
        let min_size = self.min_size_for(axis);
        if total < min_size * 2 {
            return Err(WeftError::layout(format!(
                "split too small for min size {}",
                min_size
            )));
        }

        let mut desired = before_size + delta;
        let mut state = snap_state;
        let mut snapped = false;
        if snap {
            let extra = snap_targets_for_split(&self.tree, split_id, axis, min_size, total - min_size);
            let (pos, next) = snap_position_with_targets(
                &self.snap,
                desired,
                min_size,
                total - min_size,
                state,
                &extra,
            );
            desired = pos;
            state = next;
            snapped = next.active;
        }

        desired = desired.clamp(min_size, total - min_size);
        if let Some(node) = self.tree.node_mut(before_id) {
            node.size = desired;
        }
        if let Some(node) = self.tree.node_mut(after_id) {
            node.size = total - desired;
        }

        Ok(ApplyResult {
            changed: true,
            snapped,
            snap_state: state,
            affected: self.tree.panes_under(split_id),
        })
    }

    fn apply_split(
        &mut self,
        pane_id: &str,
        new_pane_id: &str,
        axis: Axis,
        percent: i32,
    ) -> Result<ApplyResult> {
        let pane_id = pane_id.trim();
        let new_pane_id = new_pane_id.trim();
        if pane_id.is_empty() || new_pane_id.is_empty() {
            return Err(WeftError::invalid("split requires pane id and new pane id"));
        }
        let leaf = self.require_leaf(pane_id)?;
        if self.tree.leaf(new_pane_id).is_some() {
            return Err(WeftError::invalid(format!(
                "pane {} already exists",
                new_pane_id
            )));
        }
        let min_size = self.min_size_for(axis);
        let new_leaf = split_leaf(&mut self.tree, leaf, new_pane_id, axis, percent, min_size)?;
        let split_id = self
            .tree
            .node(new_leaf)
            .and_then(|n| n.parent)
            .ok_or_else(|| WeftError::internal("split node missing"))?;
        Ok(ApplyResult {
            changed: true,
            affected: self.tree.panes_under(split_id),
            ..Default::default()
        })
    }

    fn apply_close(&mut self, pane_id: &str) -> Result<ApplyResult> {
        let pane_id = pane_id.trim();
        if pane_id.is_empty() {
            return Err(WeftError::invalid("close requires pane id"));
        }
        let leaf = self.require_leaf(pane_id)?;
        let parent = self.tree.node(leaf).and_then(|n| n.parent);
        self.tree.remove_pane(pane_id);
        if self.tree.zoomed_pane_id() == Some(pane_id) {
            self.tree.set_zoomed_pane_id(None);
        }

        let Some(parent_id) = parent else {
            self.tree.set_root(None);
            self.tree.release(leaf);
            return Ok(ApplyResult {
                changed: true,
                affected: vec![pane_id.to_string()],
                ..Default::default()
            });
        };

        let remaining = {
            let node = self
                .tree
                .node_mut(parent_id)
                .ok_or_else(|| WeftError::internal("close pane missing parent"))?;
            let NodeKind::Split { children, .. } = &mut node.kind else {
                return Err(WeftError::internal("close pane parent is a leaf"));
            };
            children.retain(|&c| c != leaf);
            children.clone()
        };
        self.tree.release(leaf);

        if remaining.len() != 1 {
            // Wider splits keep their shape; the freed share is
            // redistributed proportionally by projection.
            return Ok(ApplyResult {
                changed: true,
                affected: self.tree.panes_under(parent_id),
                ..Default::default()
            });
        }

        // Promote the lone sibling into the parent's slot.
        let sibling = remaining[0];
        let (grand, parent_size) = match self.tree.node(parent_id) {
            Some(node) => (node.parent, node.size),
            None => return Err(WeftError::internal("close pane parent vanished")),
        };
        if let Some(node) = self.tree.node_mut(sibling) {
            node.parent = grand;
            node.size = parent_size;
        }
        match grand {
            None => self.tree.set_root(Some(sibling)),
            Some(grand_id) => {
                if let Some(node) = self.tree.node_mut(grand_id) {
                    if let NodeKind::Split { children, .. } = &mut node.kind {
                        for child in children.iter_mut() {
                            if *child == parent_id {
                                *child = sibling;
                                break;
                            }
                        }
                    }
                }
            }
        }
        self.tree.release(parent_id);

        Ok(ApplyResult {
            changed: true,
            affected: self.tree.panes_under(sibling),
            ..Default::default()
        })
    }

    fn apply_reset_sizes(&mut self, pane_id: Option<&str>) -> Result<ApplyResult> {
        let target = match pane_id.map(str::trim).filter(|p| !p.is_empty()) {
            Some(pane_id) => {
                let leaf = self.require_leaf(pane_id)?;
                self.tree.node(leaf).and_then(|n| n.parent).unwrap_or(leaf)
            }
            None => match self.tree.root() {
                Some(root) => root,
                None => return Ok(ApplyResult::default()),
            },
        };
        let rect = self
            .tree
            .rect_for_node(target)
            .ok_or_else(|| WeftError::layout("reset sizes rect missing"))?;
        reset_node_sizes(&mut self.tree, target, rect, self.constraints)?;
        Ok(ApplyResult {
            changed: true,
            affected: self.tree.panes_under(target),
            ..Default::default()
        })
    }

    fn apply_swap(&mut self, a: &str, b: &str) -> Result<ApplyResult> {
        let a = a.trim();
        let b = b.trim();
        if a.is_empty() || b.is_empty() {
            return Err(WeftError::invalid("swap requires pane ids"));
        }
        if a == b {
            return Ok(ApplyResult::default());
        }
        let leaf_a = self.require_leaf(a)?;
        let leaf_b = self.require_leaf(b)?;
        if let Some(node) = self.tree.node_mut(leaf_a) {
            node.kind = NodeKind::Leaf { pane_id: b.to_string() };
        }
        if let Some(node) = self.tree.node_mut(leaf_b) {
            node.kind = NodeKind::Leaf { pane_id: a.to_string() };
        }
        self.tree.insert_pane(a, leaf_b);
        self.tree.insert_pane(b, leaf_a);
        Ok(ApplyResult {
            changed: true,
            affected: vec![a.to_string(), b.to_string()],
            ..Default::default()
        })
    }

    fn apply_zoom(&mut self, pane_id: &str, toggle: bool) -> Result<ApplyResult> {
        let pane_id = pane_id.trim();
        if pane_id.is_empty() {
            return Err(WeftError::invalid("zoom requires pane id"));
        }
        self.require_leaf(pane_id)?;
        let zoomed = self.tree.zoomed_pane_id() == Some(pane_id);
        if toggle {
            if zoomed {
                self.tree.set_zoomed_pane_id(None);
            } else {
                self.tree.set_zoomed_pane_id(Some(pane_id.to_string()));
            }
        } else {
            if zoomed {
                return Ok(ApplyResult::default());
            }
            self.tree.set_zoomed_pane_id(Some(pane_id.to_string()));
        }
        Ok(ApplyResult {
            changed: true,
            affected: self.tree.pane_ids(),
            ..Default::default()
        })
    }
}

/// Replace `leaf_id` with a split holding the old leaf and a new leaf for
/// `new_pane_id`. Returns the new leaf's node id.
pub(crate) fn split_leaf(
    tree: &mut Tree,
    leaf_id: NodeId,
    new_pane_id: &str,
    axis: Axis,
    percent: i32,
    min_size: i32,
) -> Result<NodeId> {
    let (pane_id, leaf_size, parent) = match tree.node(leaf_id) {
        Some(node) if node.is_leaf() => (
            node.pane_id().unwrap_or_default().to_string(),
            node.size,
            node.parent,
        ),
        Some(_) => return Err(WeftError::layout("split target is not a leaf")),
        None => return Err(WeftError::layout("split target missing")),
    };
    let rect = *tree
        .rects()
        .get(&pane_id)
        .ok_or_else(|| WeftError::layout(format!("missing rect for pane {}", pane_id)))?;
    let total = split_axis_total(rect, axis);
    let (old_size, new_size) = split_compute_sizes(total, percent, min_size)?;

    let split_id = tree.alloc(Node {
        parent,
        size: leaf_size,
        kind: NodeKind::Split {
            axis,
            children: Vec::new(),
        },
    });
    if let Some(node) = tree.node_mut(leaf_id) {
        node.parent = Some(split_id);
        node.size = old_size;
    }
    let new_leaf = tree.alloc(Node {
        parent: Some(split_id),
        size: new_size,
        kind: NodeKind::Leaf {
            pane_id: new_pane_id.to_string(),
        },
    });
    if let Some(node) = tree.node_mut(split_id) {
        if let NodeKind::Split { children, .. } = &mut node.kind {
            children.push(leaf_id);
            children.push(new_leaf);
        }
    }
    match parent {
        None => tree.set_root(Some(split_id)),
        Some(parent_id) => {
            if let Some(node) = tree.node_mut(parent_id) {
                if let NodeKind::Split { children, .. } = &mut node.kind {
                    for child in children.iter_mut() {
                        if *child == leaf_id {
                            *child = split_id;
                            break;
                        }
                    }
                }
            }
        }
    }
    tree.insert_pane(new_pane_id, new_leaf);
    Ok(new_leaf)
}

fn split_axis_total(rect: Rect, axis: Axis) -> i32 {
    match axis {
        Axis::Horizontal => rect.w,
        Axis::Vertical => rect.h,
    }
}

/// Divide `total` between the old and new pane. An out-of-range percent
/// falls back to an even split; failure to satisfy the minimum on both
/// sides is an error.
pub(crate) fn split_compute_sizes(total: i32, percent: i32, min_size: i32) -> Result<(i32, i32)> {
    if total <= 1 {
        return Err(WeftError::layout("split target too small"));
    }
    let percent = if percent <= 0 || percent >= 100 { 50 } else { percent };
    let mut new_size = total * percent / 100;
    if new_size <= 0 || new_size >= total {
        new_size = total / 2;
    }
    let mut old_size = total - new_size;
    let min_size = min_size.max(1);
    if old_size >= min_size && new_size >= min_size {
        return Ok((old_size, new_size));
    }
    if total < min_size * 2 {
        return Err(WeftError::layout(format!(
            "split min size {} not satisfied",
            min_size
        )));
    }
    new_size = total / 2;
    old_size = total - new_size;
    if old_size < min_size || new_size < min_size {
        return Err(WeftError::layout(format!(
            "split min size {} not satisfied",
            min_size
        )));
    }
    Ok((old_size, new_size))
}

/// Walk ancestors of `leaf` to the nearest split whose divider sits on
/// `edge`. Returns the split and the two children adjacent to that divider.
fn find_split_for_edge(tree: &Tree, leaf: NodeId, edge: Edge) -> Result<(NodeId, NodeId, NodeId)> {
    let axis = edge.axis();
    let mut node_id = leaf;
    while let Some(parent_id) = tree.node(node_id).and_then(|n| n.parent) {
        let Some(parent) = tree.node(parent_id) else {
            break;
        };
        if let NodeKind::Split {
            axis: parent_axis,
            children,
        } = &parent.kind
        {
            if *parent_axis == axis && children.len() >= 2 {
                if let Some(idx) = tree.child_index(parent_id, node_id) {
                    match edge {
                        Edge::Left | Edge::Up => {
                            if idx > 0 {
                                return Ok((parent_id, children[idx - 1], children[idx]));
                            }
                        }
                        Edge::Right | Edge::Down => {
                            if idx < children.len() - 1 {
                                return Ok((parent_id, children[idx], children[idx + 1]));
                            }
                        }
                    }
                }
            }
        }
        node_id = parent_id;
    }
    Err(WeftError::layout("no matching split for edge"))
}

/// Pane edges elsewhere in the tree that fall inside this split's span,
/// expressed relative to the split start and restricted to `[min, max]`.
fn snap_targets_for_split(
    tree: &Tree,
    split_id: NodeId,
    axis: Axis,
    min: i32,
    max: i32,
) -> Vec<i32> {
    let Some(rect) = tree.rect_for_node(split_id) else {
        return Vec::new();
    };
    let (start, span) = match axis {
        Axis::Horizontal => (rect.x, rect.w),
        Axis::Vertical => (rect.y, rect.h),
    };
    if span <= 0 {
        return Vec::new();
    }
    let end = start + span;
    let mut seen = Vec::new();
    for pane_rect in tree.rects().values() {
        let positions = match axis {
            Axis::Horizontal => [pane_rect.x, pane_rect.right()],
            Axis::Vertical => [pane_rect.y, pane_rect.bottom()],
        };
        for pos in positions {
            if pos <= start || pos >= end {
                continue;
            }
            let rel = pos - start;
            if rel < min || rel > max {
                continue;
            }
            seen.push(rel);
        }
    }
    seen.sort_unstable();
    seen.dedup();
    seen
}

/// Recursively give every split under `id` an even distribution, the
/// rounding remainder on the last child.
fn reset_node_sizes(tree: &mut Tree, id: NodeId, rect: Rect, constraints: Constraints) -> Result<()> {
    let (axis, children) = match tree.node(id) {
        Some(node) => match &node.kind {
            NodeKind::Leaf { .. } => return Ok(()),
            NodeKind::Split { axis, children } => (*axis, children.clone()),
        },
        None => return Ok(()),
    };
    let count = children.len() as i32;
    if count == 0 {
        return Ok(());
    }
    let (axis_size, min_size) = match axis {
        Axis::Horizontal => (rect.w, constraints.min_width),
        Axis::Vertical => (rect.h, constraints.min_height),
    };
    if axis_size < min_size * count {
        return Err(WeftError::layout(format!(
            "reset sizes exceeds min size {}",
            min_size
        )));
    }
    let base = axis_size / count;
    let remainder = axis_size % count;
    for (i, &child) in children.iter().enumerate() {
        let mut size = base;
        if i as i32 == count - 1 {
            size += remainder;
        }
        if let Some(node) = tree.node_mut(child) {
            node.size = size;
        }
    }
    let mut offset = match axis {
        Axis::Horizontal => rect.x,
        Axis::Vertical => rect.y,
    };
    for &child in &children {
        let size = tree.node(child).map(|n| n.size).unwrap_or(0);
        let child_rect = match axis {
            Axis::Horizontal => Rect::new(offset, rect.y, size, rect.h),
            Axis::Vertical => Rect::new(rect.x, offset, rect.w, size),
        };
        reset_node_sizes(tree, child, child_rect, constraints)?;
        offset += size;
    }
    Ok(())
}
