//! pftree core: parallel file-tree processing.
//!
//! Probes a directory hierarchy, builds a tree keyed by every directory that
//! holds files, and pushes each directory through optional read, analyse
//! and write stages, mirroring results into an output tree.
//!
//! # Modules
//!
//! - [`scanner`]: parallel filesystem probe and tree construction.
//! - [`model`]: the ordered directory tree, node values and side-table.
//! - [`filter`]: token-based file and directory filtering.
//! - [`pipeline`]: stage traits, the executor and the batch scheduler.
//! - [`analysis`]: size statistics over the finished tree.
//! - [`stages`]: ready-made listing stages.
//! - [`engine`]: the top-level run tying all of the above together.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod model;
pub mod pipeline;
pub mod scanner;
pub mod stages;

pub use config::TreeConfig;
pub use engine::{PfTree, RunReport};
pub use error::{ConfigError, PipelineError, StageError, TreeError};
pub use model::{ApplyTarget, DirTree, NodeValue};
pub use pipeline::{Node, StageResult, Stages};
