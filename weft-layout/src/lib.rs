//! weft-layout: binary space-partition layout engine
//!
//! A session's panes tile a virtual 1000x1000 canvas. The [`Tree`] is an
//! arena of nodes addressed by index; leaves carry pane ids as plain lookup
//! keys. All mutations go through [`Engine::apply`] with one [`Op`] variant
//! per operation, so the operation set is closed and exhaustively matched.

pub mod build;
pub mod config;
pub mod grid;
pub mod ops;
pub mod snap;
pub mod tree;

pub use build::build_tree;
pub use config::{expand_layout_vars, expand_vars, parse_percent, LayoutConfig, PaneDef, SendAction};
pub use grid::Grid;
pub use ops::{ApplyResult, Constraints, Edge, Engine, History, Op};
pub use snap::{snap_position_with_targets, SnapConfig, SnapState};
pub use tree::{Axis, NodeId, NodeKind, Rect, Tree};

/// Side length of the virtual canvas every session tiles.
pub const BASE_SIZE: i32 = 1000;
