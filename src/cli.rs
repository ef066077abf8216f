//! Command-line arguments and their translation into a [`TreeConfig`].

use clap::{ArgAction, Parser};
use pftree_core::analysis::StatsOrder;
use pftree_core::config::depth_limit;
use pftree_core::filter::FilterLogic;
use pftree_core::pipeline::LeafFormat;
use pftree_core::stages::TestSpec;
use pftree_core::{ConfigError, TreeConfig};
use std::path::PathBuf;

/// Walk a directory tree into a map of directories to files, and run
/// read / analyse / write stages over every directory.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pftree",
    version,
    after_help = "EXAMPLES:\n    \
        pftree --input-dir /data --du\n    \
        pftree --input-dir /data --duf --stats-reverse --relative-dir\n    \
        pftree --input-dir /data --file-filter .dcm,.nii --json-stats\n    \
        pftree --input-dir /data --output-dir /tmp/out --test 0.1:1 --threads 8"
)]
pub struct Cli {
    /// Directory to walk
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub input_dir: PathBuf,

    /// Root of the output tree
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Deepest directory level to list (root = 0); negative is unbounded
    #[arg(long, default_value_t = -1, allow_negative_numbers = true, value_name = "NUM")]
    pub max_depth: i64,

    /// Only consider files whose name contains this string
    #[arg(long, value_name = "NAME")]
    pub input_file: Option<String>,

    /// Key directories relative to the input directory
    #[arg(long)]
    pub relative_dir: bool,

    /// Follow symbolic links to directories
    #[arg(long)]
    pub follow_links: bool,

    /// Overwrite existing files in the output tree
    #[arg(long)]
    pub overwrite: bool,

    /// Rename output leaf directories, e.g. 'preview-%s'
    #[arg(long, value_name = "FORMAT")]
    pub output_leaf_dir: Option<LeafFormat>,

    /// Analysis threads (0 runs everything sequentially)
    #[arg(long, default_value_t = 0, value_name = "NUM")]
    pub threads: usize,

    /// Comma-separated substrings file names must contain
    #[arg(long, default_value = "", value_name = "TOKENS")]
    pub file_filter: String,

    /// How file filter tokens combine (AND or OR)
    #[arg(long, default_value = "OR", value_name = "LOGIC")]
    pub file_filter_logic: FilterLogic,

    /// Comma-separated substrings directory paths must contain
    #[arg(long, default_value = "", value_name = "TOKENS")]
    pub dir_filter: String,

    /// How directory filter tokens combine (AND or OR)
    #[arg(long, default_value = "OR", value_name = "LOGIC")]
    pub dir_filter_logic: FilterLogic,

    /// Print per-directory sizes, smallest first
    #[arg(long)]
    pub stats: bool,

    /// Print per-directory sizes, largest first
    #[arg(long)]
    pub stats_reverse: bool,

    /// Print only the size summary
    #[arg(long)]
    pub du: bool,

    /// Print the full per-directory listing and the summary
    #[arg(long)]
    pub duf: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the size statistics as JSON
    #[arg(long)]
    pub json_stats: bool,

    /// Print the size statistics as CSV
    #[arg(long)]
    pub csv_stats: bool,

    /// Print the elapsed run time
    #[arg(long)]
    pub print_elapsed_time: bool,

    /// Run the built-in listing stages: analyse delay in seconds, then
    /// 0 to save file names or 1 to save the file count
    #[arg(long, value_name = "DELAY[:MODE]")]
    pub test: Option<TestSpec>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Whether any output needs the per-directory sizes.
    pub fn stats_order(&self) -> StatsOrder {
        let wanted = self.stats
            || self.stats_reverse
            || self.du
            || self.duf
            || self.json_stats
            || self.csv_stats;
        StatsOrder::from_flags(wanted, self.stats_reverse)
    }

    pub fn to_config(&self) -> Result<TreeConfig, ConfigError> {
        if self.test.is_some() && self.output_dir.is_none() {
            return Err(ConfigError::MissingOutputRoot);
        }
        Ok(TreeConfig {
            input_root: self.input_dir.clone(),
            output_root: self.output_dir.clone(),
            max_depth: depth_limit(self.max_depth),
            follow_links: self.follow_links,
            single_file_filter: self.input_file.clone(),
            file_filter: self.file_filter.clone(),
            file_filter_logic: self.file_filter_logic,
            dir_filter: self.dir_filter.clone(),
            dir_filter_logic: self.dir_filter_logic,
            threads: self.threads,
            output_leaf_format: self.output_leaf_dir.clone(),
            relative_dir: self.relative_dir,
            overwrite: self.overwrite,
            stats: self.stats_order(),
            ..TreeConfig::default()
        })
    }
}
