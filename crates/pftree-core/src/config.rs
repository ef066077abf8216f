//! Typed run configuration.
//!
//! Every option the engine recognises lives here, with its default. The
//! struct is validated once, when [`crate::engine::PfTree::new`] is called;
//! nothing downstream re-checks it.

use crate::analysis::StatsOrder;
use crate::error::ConfigError;
use crate::filter::{FilterEngine, FilterLogic};
use crate::model::ApplyTarget;
use crate::pipeline::{LeafFormat, PathLayout};
use std::path::PathBuf;

/// Upper bound on analysis threads.
pub const MAX_THREADS: usize = 1_024;

#[derive(Debug, Clone, PartialEq)]
pub struct TreeConfig {
    /// Directory to probe. Required; defaults to the working directory.
    pub input_root: PathBuf,
    /// Root of the mirrored output tree handed to write stages.
    pub output_root: Option<PathBuf>,
    /// Deepest directory level (root = 0) to list; `None` is unbounded.
    pub max_depth: Option<usize>,
    /// Traverse symbolic directory links.
    pub follow_links: bool,
    /// Only list files whose name contains this substring.
    pub single_file_filter: Option<String>,
    /// Comma-separated file name tokens.
    pub file_filter: String,
    pub file_filter_logic: FilterLogic,
    /// Comma-separated directory path tokens.
    pub dir_filter: String,
    pub dir_filter_logic: FilterLogic,
    /// Analysis threads; 0 runs every stage sequentially.
    pub threads: usize,
    /// Rename pattern for output leaf directories, e.g. `preview-%s`.
    pub output_leaf_format: Option<LeafFormat>,
    /// Keep analysis results instead of replacing them with write results.
    pub persist_analysis_results: bool,
    pub apply_results_to: ApplyTarget,
    /// Store only this field of each analysis result.
    pub apply_key: Option<String>,
    /// Key the tree by paths relative to `input_root`.
    pub relative_dir: bool,
    /// Allow write stages to replace existing files.
    pub overwrite: bool,
    pub stats: StatsOrder,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("."),
            output_root: None,
            max_depth: None,
            follow_links: false,
            single_file_filter: None,
            file_filter: String::new(),
            file_filter_logic: FilterLogic::Or,
            dir_filter: String::new(),
            dir_filter_logic: FilterLogic::Or,
            threads: 0,
            output_leaf_format: None,
            persist_analysis_results: false,
            apply_results_to: ApplyTarget::OutputTree,
            apply_key: None,
            relative_dir: false,
            overwrite: false,
            stats: StatsOrder::Off,
        }
    }
}

impl TreeConfig {
    /// Configuration for probing `input_root` with every other option at
    /// its default.
    pub fn new(input_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            ..Self::default()
        }
    }

    /// Check the cross-field rules that the types alone cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads > MAX_THREADS {
            return Err(ConfigError::TooManyThreads {
                requested: self.threads,
                max: MAX_THREADS,
            });
        }
        if self.apply_key.as_deref() == Some("") {
            return Err(ConfigError::EmptyApplyKey);
        }
        Ok(())
    }

    /// The filter pass to run after building, if any filter is set.
    pub fn filter_engine(&self) -> Option<FilterEngine> {
        if self.file_filter.trim().is_empty() && self.dir_filter.trim().is_empty() {
            return None;
        }
        Some(FilterEngine::new(
            &self.file_filter,
            self.file_filter_logic,
            &self.dir_filter,
            self.dir_filter_logic,
        ))
    }

    /// How tree keys map to input and output locations.
    pub fn layout(&self) -> PathLayout {
        PathLayout {
            input_root: self.input_root.clone(),
            relative: self.relative_dir,
            output_root: self.output_root.clone(),
            leaf_format: self.output_leaf_format.clone(),
        }
    }
}

/// Translate a CLI-style depth, where any negative value means unbounded.
pub fn depth_limit(depth: i64) -> Option<usize> {
    usize::try_from(depth).ok()
}
