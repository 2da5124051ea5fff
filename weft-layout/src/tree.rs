//! Arena-backed layout tree and rect projection.

use std::collections::HashMap;

use crate::BASE_SIZE;

/// Index of a node inside the tree's arena.
pub type NodeId = usize;

/// Split direction. Horizontal divides width (children side by side),
/// Vertical divides height (children stacked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Absolute integer rectangle on the virtual canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Full-canvas rect.
    pub fn canvas() -> Self {
        Self::new(0, 0, BASE_SIZE, BASE_SIZE)
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }
}

/// Node payload: a pane leaf or an n-ary split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Leaf { pane_id: String },
    Split { axis: Axis, children: Vec<NodeId> },
}

/// One arena node. `size` is the node's share along its parent's axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub size: i32,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn pane_id(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Leaf { pane_id } => Some(pane_id),
            NodeKind::Split { .. } => None,
        }
    }
}

/// Arena-backed layout tree.
///
/// Freed slots are recycled through a free list so NodeIds stay stable for
/// live nodes; clones preserve ids, which keeps history snapshots cheap to
/// reason about.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    panes: HashMap<String, NodeId>,
    zoomed_pane_id: Option<String>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree with a single full-canvas leaf.
    pub fn with_root_leaf(pane_id: impl Into<String>) -> Self {
        let mut tree = Self::new();
        let pane_id = pane_id.into();
        let id = tree.alloc(Node {
            parent: None,
            size: BASE_SIZE,
            kind: NodeKind::Leaf {
                pane_id: pane_id.clone(),
            },
        });
        tree.root = Some(id);
        tree.panes.insert(pane_id, id);
        tree
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, id: Option<NodeId>) {
        self.root = id;
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id).and_then(|n| n.as_mut())
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    pub(crate) fn release(&mut self, id: NodeId) {
        if id < self.nodes.len() && self.nodes[id].take().is_some() {
            self.free.push(id);
        }
    }

    /// Leaf node id for a pane, if present.
    pub fn leaf(&self, pane_id: &str) -> Option<NodeId> {
        self.panes.get(pane_id).copied()
    }

    pub(crate) fn insert_pane(&mut self, pane_id: impl Into<String>, id: NodeId) {
        self.panes.insert(pane_id.into(), id);
    }

    pub(crate) fn remove_pane(&mut self, pane_id: &str) {
        self.panes.remove(pane_id);
    }

    pub fn pane_count(&self) -> usize {
        self.panes.len()
    }

    /// All pane ids, sorted.
    pub fn pane_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.panes.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn zoomed_pane_id(&self) -> Option<&str> {
        self.zoomed_pane_id.as_deref()
    }

    pub(crate) fn set_zoomed_pane_id(&mut self, pane_id: Option<String>) {
        self.zoomed_pane_id = pane_id;
    }

    pub(crate) fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        match &self.node(parent)?.kind {
            NodeKind::Split { children, .. } => children.iter().position(|&c| c == child),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Pane ids of every leaf under `id`, in tree order.
    pub fn panes_under(&self, id: NodeId) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_panes_under(id, &mut out);
        out
    }

    fn collect_panes_under(&self, id: NodeId, out: &mut Vec<String>) {
        let Some(node) = self.node(id) else { return };
        match &node.kind {
            NodeKind::Leaf { pane_id } => {
                if !pane_id.is_empty() {
                    out.push(pane_id.clone());
                }
            }
            NodeKind::Split { children, .. } => {
                for &child in children {
                    self.collect_panes_under(child, out);
                }
            }
        }
    }

    /// Project every leaf to its absolute rect on the canvas.
    pub fn rects(&self) -> HashMap<String, Rect> {
        let mut out = HashMap::new();
        if let Some(root) = self.root {
            self.rects_for_node(root, Rect::canvas(), &mut out);
        }
        out
    }

    /// Like [`rects`](Self::rects) but with the zoom overlay applied: the
    /// zoomed pane reports the full canvas while the real ratios are kept.
    pub fn view_rects(&self) -> HashMap<String, Rect> {
        if let Some(zoomed) = &self.zoomed_pane_id {
            if self.panes.contains_key(zoomed) {
                let mut out = HashMap::new();
                out.insert(zoomed.clone(), Rect::canvas());
                return out;
            }
        }
        self.rects()
    }

    fn rects_for_node(&self, id: NodeId, rect: Rect, out: &mut HashMap<String, Rect>) {
        if rect.is_empty() {
            return;
        }
        let Some(node) = self.node(id) else { return };
        match &node.kind {
            NodeKind::Leaf { pane_id } => {
                if !pane_id.is_empty() {
                    out.insert(pane_id.clone(), rect);
                }
            }
            NodeKind::Split { axis, children } => {
                if children.is_empty() {
                    return;
                }
                match axis {
                    Axis::Horizontal => {
                        let sizes = self.normalize_sizes(children, rect.w);
                        let mut x = rect.x;
                        for (i, &child) in children.iter().enumerate() {
                            let child_rect = Rect::new(x, rect.y, sizes[i], rect.h);
                            self.rects_for_node(child, child_rect, out);
                            x += sizes[i];
                        }
                    }
                    Axis::Vertical => {
                        let sizes = self.normalize_sizes(children, rect.h);
                        let mut y = rect.y;
                        for (i, &child) in children.iter().enumerate() {
                            let child_rect = Rect::new(rect.x, y, rect.w, sizes[i]);
                            self.rects_for_node(child, child_rect, out);
                            y += sizes[i];
                        }
                    }
                }
            }
        }
    }

    /// Absolute rect of an arbitrary node, walking the parent path down
    /// from the root.
    pub fn rect_for_node(&self, target: NodeId) -> Option<Rect> {
        self.node(target)?;
        let mut path = vec![target];
        let mut cursor = target;
        while let Some(parent) = self.node(cursor)?.parent {
            path.push(parent);
            cursor = parent;
        }
        // Walk from root toward the target.
        let mut rect = Rect::canvas();
        for i in (1..path.len()).rev() {
            let parent = path[i];
            let child = path[i - 1];
            let Some(node) = self.node(parent) else {
                return None;
            };
            let NodeKind::Split { axis, children } = &node.kind else {
                return None;
            };
            let idx = children.iter().position(|&c| c == child)?;
            match axis {
                Axis::Horizontal => {
                    let sizes = self.normalize_sizes(children, rect.w);
                    let x: i32 = rect.x + sizes[..idx].iter().sum::<i32>();
                    rect = Rect::new(x, rect.y, sizes[idx], rect.h);
                }
                Axis::Vertical => {
                    let sizes = self.normalize_sizes(children, rect.h);
                    let y: i32 = rect.y + sizes[..idx].iter().sum::<i32>();
                    rect = Rect::new(rect.x, y, rect.w, sizes[idx]);
                }
            }
        }
        Some(rect)
    }

    /// Distribute `total` across the children proportionally to their
    /// stored sizes. Negative sizes count as zero; a zero sum falls back to
    /// an even split. The rounding remainder always lands on the last
    /// child, which is what keeps the tiling gap-free.
    pub(crate) fn normalize_sizes(&self, children: &[NodeId], total: i32) -> Vec<i32> {
        let count = children.len();
        let mut sizes = vec![0i32; count];
        if count == 0 {
            return sizes;
        }
        let mut sum = 0i32;
        for (i, &child) in children.iter().enumerate() {
            let size = self.node(child).map(|n| n.size.max(0)).unwrap_or(0);
            sum += size;
            sizes[i] = size;
        }
        if sum <= 0 {
            let base = total / count as i32;
            let remainder = total % count as i32;
            for s in sizes.iter_mut() {
                *s = base;
            }
            sizes[count - 1] += remainder;
            return sizes;
        }
        let mut acc = 0i32;
        for s in sizes.iter_mut() {
            *s = (*s as i64 * total as i64 / sum as i64) as i32;
            acc += *s;
        }
        if acc != total {
            sizes[count - 1] += total - acc;
        }
        sizes
    }
}
