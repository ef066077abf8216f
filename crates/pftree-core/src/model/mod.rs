//! Data model for the pftree directory tree.
//!
//! Re-exports the ordered directory map, node values and the tree that
//! binds the input tree, output tree and side-table together.

pub mod dir_map;
pub mod dir_tree;
pub mod node;
pub mod size;

pub use dir_map::DirMap;
pub use dir_tree::{ApplyTarget, DirTree};
pub use node::{DirMeta, NodeValue};
