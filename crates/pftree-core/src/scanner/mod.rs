//! Filesystem side of a run: probe the directory hierarchy, then build the
//! tree the pipeline works on.
//!
//! - [`probe`]: parallel `jwalk` traversal producing per-directory listings.
//! - [`builder`]: groups listings into tree nodes with side-table metadata.

pub mod builder;
pub mod probe;

pub use builder::{
    build_tree, refresh_meta, BuildOptions, BuildSummary, ConstructStage, DirSizer,
};
pub use probe::{probe, ProbeOptions, ProbeResult};
