//! Mapping from tree keys to the directories stages work in.
//!
//! Keys are either the walked paths themselves or, with `relative`, paths
//! relative to the input root. Write stages get a location under the output
//! root that mirrors the key, optionally with its leaf directory renamed.

use crate::error::ConfigError;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// The single placeholder a leaf format may contain.
pub const LEAF_PLACEHOLDER: &str = "%s";

/// Rename pattern for output leaf directories, such as `preview-%s`.
///
/// The placeholder is substituted textually with the directory's basename;
/// nothing in the pattern is interpreted beyond that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafFormat(String);

impl FromStr for LeafFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let reject = |reason: &str| ConfigError::LeafFormat {
            format: s.to_string(),
            reason: reason.to_string(),
        };
        match s.matches(LEAF_PLACEHOLDER).count() {
            0 => return Err(reject("missing the %s placeholder")),
            1 => {}
            _ => return Err(reject("more than one %s placeholder")),
        }
        if s.contains('/') || s.contains(std::path::MAIN_SEPARATOR) {
            return Err(reject("path separators would move the leaf directory"));
        }
        Ok(Self(s.to_string()))
    }
}

impl LeafFormat {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute `leaf` for the placeholder.
    pub fn render(&self, leaf: &str) -> String {
        self.0.replacen(LEAF_PLACEHOLDER, leaf, 1)
    }

    /// Rename the last component of `path`, keeping its parent.
    pub fn apply(&self, path: &Path) -> PathBuf {
        match path.file_name() {
            Some(name) => path.with_file_name(self.render(&name.to_string_lossy())),
            None => path.to_path_buf(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathLayout {
    pub input_root: PathBuf,
    /// Keys are relative to `input_root`.
    pub relative: bool,
    pub output_root: Option<PathBuf>,
    pub leaf_format: Option<LeafFormat>,
}

impl PathLayout {
    /// Directory holding the files of `key`.
    pub fn input_path(&self, key: &Path) -> PathBuf {
        if self.relative {
            join_under(&self.input_root, key)
        } else {
            key.to_path_buf()
        }
    }

    /// Directory a write stage should use for `key`.
    ///
    /// Without an output root the input directory is used, so write stages
    /// that annotate in place still work. The leaf format never applies to
    /// the root itself, which would rename the output root.
    pub fn output_path(&self, key: &Path) -> PathBuf {
        let rel = self.relative_key(key);
        let base = match &self.output_root {
            Some(out) => join_under(out, &rel),
            None => self.input_path(key),
        };
        match &self.leaf_format {
            Some(format) if !is_root_key(&rel) => format.apply(&base),
            _ => base,
        }
    }

    /// `key` expressed relative to the input root.
    fn relative_key(&self, key: &Path) -> PathBuf {
        if self.relative {
            return key.to_path_buf();
        }
        match key.strip_prefix(&self.input_root) {
            Ok(rel) => rel.to_path_buf(),
            // Never let an absolute key escape the output root.
            Err(_) => key
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .collect(),
        }
    }
}

fn is_root_key(rel: &Path) -> bool {
    rel.as_os_str().is_empty() || rel == Path::new(".")
}

/// Join `rel` under `root`, treating `""` and `"."` as the root itself.
fn join_under(root: &Path, rel: &Path) -> PathBuf {
    if is_root_key(rel) {
        root.to_path_buf()
    } else {
        root.join(rel)
    }
}
