//! Build a layout tree from a layout definition.

use weft_utils::{Result, WeftError};

use crate::config::{parse_percent, LayoutConfig};
use crate::grid::Grid;
use crate::ops::{split_leaf, Constraints};
use crate::tree::{Axis, Node, NodeId, NodeKind, Tree};
use crate::BASE_SIZE;

/// Build the initial tree for a session. A non-empty `grid` wins; otherwise
/// the pane defs drive a sequence of splits off the first pane.
pub fn build_tree(config: &LayoutConfig, pane_ids: &[String]) -> Result<Tree> {
    if pane_ids.is_empty() {
        return Err(WeftError::layout("layout requires at least one pane"));
    }
    if !config.grid.trim().is_empty() {
        let grid = Grid::parse(&config.grid)?;
        return build_grid_tree(grid, pane_ids);
    }
    build_split_tree(config, pane_ids)
}

fn build_grid_tree(grid: Grid, pane_ids: &[String]) -> Result<Tree> {
    let mut tree = Tree::new();
    let mut row_nodes: Vec<NodeId> = Vec::new();
    let row_count = pane_ids.len().div_ceil(grid.columns);
    let row_sizes = split_sizes(BASE_SIZE, row_count);
    for (row_index, row_panes) in pane_ids.chunks(grid.columns).enumerate() {
        let row_size = row_sizes[row_index];
        let node = build_row(&mut tree, row_panes, row_size)?;
        row_nodes.push(node);
    }
    if row_nodes.len() == 1 {
        let root = row_nodes[0];
        if let Some(node) = tree.node_mut(root) {
            node.size = BASE_SIZE;
        }
        tree.set_root(Some(root));
        return Ok(tree);
    }
    let root = tree.alloc(Node {
        parent: None,
        size: BASE_SIZE,
        kind: NodeKind::Split {
            axis: Axis::Vertical,
            children: row_nodes.clone(),
        },
    });
    for node in row_nodes {
        if let Some(row) = tree.node_mut(node) {
            row.parent = Some(root);
        }
    }
    tree.set_root(Some(root));
    Ok(tree)
}

fn build_row(tree: &mut Tree, row_panes: &[String], row_size: i32) -> Result<NodeId> {
    if row_panes.len() == 1 {
        let leaf = tree.alloc(Node {
            parent: None,
            size: row_size,
            kind: NodeKind::Leaf {
                pane_id: row_panes[0].clone(),
            },
        });
        tree.insert_pane(row_panes[0].clone(), leaf);
        return Ok(leaf);
    }
    let col_sizes = split_sizes(BASE_SIZE, row_panes.len());
    let row = tree.alloc(Node {
        parent: None,
        size: row_size,
        kind: NodeKind::Split {
            axis: Axis::Horizontal,
            children: Vec::new(),
        },
    });
    let mut children = Vec::with_capacity(row_panes.len());
    for (i, pane_id) in row_panes.iter().enumerate() {
        let leaf = tree.alloc(Node {
            parent: Some(row),
            size: col_sizes[i],
            kind: NodeKind::Leaf {
                pane_id: pane_id.clone(),
            },
        });
        tree.insert_pane(pane_id.clone(), leaf);
        children.push(leaf);
    }
    if let Some(node) = tree.node_mut(row) {
        if let NodeKind::Split { children: slot, .. } = &mut node.kind {
            *slot = children;
        }
    }
    Ok(row)
}

fn build_split_tree(config: &LayoutConfig, pane_ids: &[String]) -> Result<Tree> {
    let mut tree = Tree::with_root_leaf(pane_ids[0].clone());
    let constraints = Constraints::default();
    // Every def after the first carves its pane out of the first pane.
    for (i, pane_id) in pane_ids.iter().enumerate().skip(1) {
        let def = config.panes.get(i).cloned().unwrap_or_default();
        let axis = def.split_axis();
        let percent = parse_percent(&def.size);
        let min_size = match axis {
            Axis::Horizontal => constraints.min_width,
            Axis::Vertical => constraints.min_height,
        };
        let first_leaf = tree
            .leaf(&pane_ids[0])
            .ok_or_else(|| WeftError::internal("first pane leaf missing during build"))?;
        split_leaf(&mut tree, first_leaf, pane_id, axis, percent, min_size)?;
    }
    Ok(tree)
}

/// Divide `total` into `count` near-equal shares, remainder on the last.
fn split_sizes(total: i32, count: usize) -> Vec<i32> {
    if count == 0 {
        return Vec::new();
    }
    let count_i = count as i32;
    let base = total / count_i;
    let remainder = total % count_i;
    let mut sizes = vec![base; count];
    sizes[count - 1] += remainder;
    sizes
}
