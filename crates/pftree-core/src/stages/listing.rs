//! Built-in stages that copy a directory listing into the output tree.
//!
//! Useful for exercising a whole run without writing any callbacks: read
//! reports the files of each directory, analyse optionally sleeps to stand
//! in for real work, and write mirrors the listing as `file-ls.txt` under
//! the output location.

use crate::error::{ConfigError, StageError};
use crate::model::NodeValue;
use crate::pipeline::{
    AnalyzeStage, Node, ReadStage, StageResult, WriteStage, FILES, FILES_ANALYZED, FILES_READ,
    FILES_SAVED, OUTPUT_LOCATION,
};
use anyhow::{anyhow, Context};
use std::fs;
use std::str::FromStr;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Name of the file written into every output directory.
pub const LISTING_FILE: &str = "file-ls.txt";

/// What the write stage puts in [`LISTING_FILE`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingMode {
    /// One basename per line.
    #[default]
    Names,
    /// The number of files.
    Count,
}

/// `delay[:mode]`, as given on the command line: the analyse delay in
/// seconds and `0` (names) or `1` (count).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TestSpec {
    pub delay: Duration,
    pub mode: ListingMode,
}

impl FromStr for TestSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConfigError::TestSpec(s.to_string());
        let (delay, mode) = match s.split_once(':') {
            Some((delay, mode)) => (delay, Some(mode)),
            None => (s, None),
        };
        let seconds: f64 = delay.trim().parse().map_err(|_| bad())?;
        let delay = Duration::try_from_secs_f64(seconds).map_err(|_| bad())?;
        let mode = match mode.map(str::trim) {
            None | Some("0") => ListingMode::Names,
            Some("1") => ListingMode::Count,
            Some(_) => return Err(bad()),
        };
        Ok(Self { delay, mode })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListingStages {
    pub delay: Duration,
    pub mode: ListingMode,
    /// Replace an existing listing file instead of keeping it.
    pub overwrite: bool,
}

impl ListingStages {
    pub fn new(spec: TestSpec, overwrite: bool) -> Self {
        Self {
            delay: spec.delay,
            mode: spec.mode,
            overwrite,
        }
    }
}

fn file_list(value: &NodeValue) -> Result<Vec<compact_str::CompactString>, StageError> {
    value
        .files()
        .ok_or_else(|| StageError::Failed(anyhow!("node holds no file list")))
}

impl ReadStage for ListingStages {
    fn read(&self, node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError> {
        let files = file_list(value)?;
        debug!("Read {} files from {}", files.len(), node.location.display());
        Ok(StageResult::ok()
            .with(FILES_READ, files.len())
            .with(FILES, files))
    }
}

impl AnalyzeStage for ListingStages {
    fn analyze(&self, _node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError> {
        let files = file_list(value)?;
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(StageResult::ok()
            .with(FILES_ANALYZED, files.len())
            .with(FILES, files))
    }
}

impl WriteStage for ListingStages {
    fn write(&self, node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError> {
        let files = file_list(value)?;
        let dir = node.location;
        let target = dir.join(LISTING_FILE);

        if target.exists() && !self.overwrite {
            debug!("Keeping existing {}", target.display());
            return Ok(StageResult::ok()
                .with(FILES_SAVED, 0)
                .with(OUTPUT_LOCATION, dir));
        }

        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        let contents = match self.mode {
            ListingMode::Names => {
                let mut out = String::new();
                for name in &files {
                    out.push_str(name);
                    out.push('\n');
                }
                out
            }
            ListingMode::Count => format!("{}\n", files.len()),
        };
        fs::write(&target, contents)
            .with_context(|| format!("failed to write {}", target.display()))?;

        Ok(StageResult::ok()
            .with(FILES_SAVED, 1)
            .with(OUTPUT_LOCATION, dir))
    }
}
