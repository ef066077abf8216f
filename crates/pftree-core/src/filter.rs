//! File and directory name filtering.
//!
//! A filter is two tiers of comma-separated substring tokens. The file tier
//! is applied to each basename, the directory tier to the node's key. A file
//! survives only if both tiers allow it; a directory that fails its tier
//! loses all of its files. An emptied node reports `status = false` and is
//! pruned by the pipeline.

use crate::error::{ConfigError, StageError};
use crate::model::NodeValue;
use crate::pipeline::{AnalyzeStage, Node, StageResult, FILES};
use compact_str::CompactString;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// How the tokens of one tier combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterLogic {
    /// Keep a name that contains every token.
    And,
    /// Keep a name that contains any token.
    #[default]
    Or,
}

impl FromStr for FilterLogic {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            _ => Err(ConfigError::InvalidLogic(s.to_string())),
        }
    }
}

impl fmt::Display for FilterLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "AND",
            Self::Or => "OR",
        })
    }
}

/// One tier of tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TokenSet {
    tokens: Vec<String>,
    logic: FilterLogic,
}

impl TokenSet {
    fn parse(spec: &str, logic: FilterLogic) -> Self {
        let tokens = spec
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        Self { tokens, logic }
    }

    /// An empty tier allows everything.
    fn allows(&self, text: &str) -> bool {
        if self.tokens.is_empty() {
            return true;
        }
        match self.logic {
            FilterLogic::Or => self.tokens.iter().any(|t| text.contains(t.as_str())),
            FilterLogic::And => self.tokens.iter().all(|t| text.contains(t.as_str())),
        }
    }
}

/// Result of filtering one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    /// `false` when no file survived.
    pub status: bool,
    /// Surviving basenames, sorted.
    pub files: Vec<CompactString>,
}

/// Two-tier boolean filter over file and directory names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEngine {
    file: TokenSet,
    dir: TokenSet,
}

impl FilterEngine {
    pub fn new(
        file_filter: &str,
        file_logic: FilterLogic,
        dir_filter: &str,
        dir_logic: FilterLogic,
    ) -> Self {
        Self {
            file: TokenSet::parse(file_filter, file_logic),
            dir: TokenSet::parse(dir_filter, dir_logic),
        }
    }

    /// Filter the files listed at `path`.
    pub fn filter(&self, path: &Path, files: &[CompactString]) -> FilterOutcome {
        let mut kept: Vec<CompactString> = if self.dir.allows(&path.to_string_lossy()) {
            files
                .iter()
                .filter(|name| self.file.allows(name))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        kept.sort_unstable();

        FilterOutcome {
            status: !kept.is_empty(),
            files: kept,
        }
    }
}

impl AnalyzeStage for FilterEngine {
    fn analyze(&self, node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError> {
        let files = value.files().ok_or_else(|| {
            anyhow::anyhow!("no file list to filter at '{}'", node.key.display())
        })?;
        let outcome = self.filter(node.key, &files);
        if !outcome.status {
            debug!("Filter emptied {}", node.key.display());
        }
        Ok(StageResult::new(outcome.status).with(FILES, outcome.files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<CompactString> {
        list.iter().map(|s| CompactString::new(s)).collect()
    }

    fn files_only(filter: &str, logic: FilterLogic) -> FilterEngine {
        FilterEngine::new(filter, logic, "", FilterLogic::Or)
    }

    fn dirs_only(filter: &str, logic: FilterLogic) -> FilterEngine {
        FilterEngine::new("", FilterLogic::Or, filter, logic)
    }

    #[test]
    fn empty_filters_pass_everything_sorted() {
        let engine = files_only("", FilterLogic::Or);
        let out = engine.filter(Path::new("/x"), &names(&["b.dcm", "a.dcm"]));
        assert!(out.status);
        assert_eq!(out.files, names(&["a.dcm", "b.dcm"]));
    }

    #[test]
    fn file_or_keeps_any_token_match() {
        let engine = files_only("dcm,nii", FilterLogic::Or);
        let out = engine.filter(Path::new("/x"), &names(&["a.dcm", "b.nii", "c.txt"]));
        assert_eq!(out.files, names(&["a.dcm", "b.nii"]));
    }

    #[test]
    fn file_and_needs_every_token() {
        let engine = files_only("scan,dcm", FilterLogic::And);
        let out = engine.filter(
            Path::new("/x"),
            &names(&["scan-1.dcm", "scan-2.nii", "other.dcm"]),
        );
        assert_eq!(out.files, names(&["scan-1.dcm"]));
    }

    #[test]
    fn dir_or_retains_path_with_one_token() {
        let engine = dirs_only("a,b", FilterLogic::Or);
        let out = engine.filter(Path::new("/x/a/y"), &names(&["f"]));
        assert!(out.status);
    }

    #[test]
    fn dir_and_prunes_path_missing_a_token() {
        let engine = dirs_only("a,b", FilterLogic::And);
        let out = engine.filter(Path::new("/x/a/y"), &names(&["f"]));
        assert!(!out.status);
        assert!(out.files.is_empty());
    }

    #[test]
    fn failing_dir_tier_empties_matching_files() {
        let engine = FilterEngine::new("dcm", FilterLogic::Or, "raw", FilterLogic::Or);
        let out = engine.filter(Path::new("/data/processed"), &names(&["a.dcm"]));
        assert!(!out.status);
    }

    #[test]
    fn tiers_combine_with_and() {
        let engine = FilterEngine::new("dcm", FilterLogic::Or, "raw", FilterLogic::Or);
        let out = engine.filter(Path::new("/data/raw"), &names(&["a.dcm", "b.txt"]));
        assert_eq!(out.files, names(&["a.dcm"]));
    }

    #[test]
    fn blank_tokens_are_ignored() {
        let engine = files_only(" , dcm ,", FilterLogic::And);
        let out = engine.filter(Path::new("/x"), &names(&["a.dcm", "b.txt"]));
        assert_eq!(out.files, names(&["a.dcm"]));
    }

    #[test]
    fn logic_parses_case_insensitively() {
        assert_eq!("and".parse::<FilterLogic>(), Ok(FilterLogic::And));
        assert_eq!(" OR ".parse::<FilterLogic>(), Ok(FilterLogic::Or));
        assert!(matches!(
            "XOR".parse::<FilterLogic>(),
            Err(ConfigError::InvalidLogic(_))
        ));
    }

    #[test]
    fn analyze_reports_status_and_files() {
        let engine = files_only("dcm", FilterLogic::Or);
        let key = Path::new("/x");
        let node = Node::new(key, key);
        let value = NodeValue::Files(names(&["b.dcm", "a.txt"]));
        let result = engine.analyze(&node, &value).unwrap();
        assert!(result.status);
        assert_eq!(result.get(FILES), Some(&serde_json::json!(["b.dcm"])));

        let none = engine
            .analyze(&node, &NodeValue::Files(names(&["a.txt"])))
            .unwrap();
        assert!(!none.status);
    }

    #[test]
    fn analyze_without_file_list_fails() {
        let engine = files_only("dcm", FilterLogic::Or);
        let key = Path::new("/x");
        let node = Node::new(key, key);
        let err = engine
            .analyze(&node, &NodeValue::Data(serde_json::json!(42)))
            .unwrap_err();
        assert!(matches!(err, StageError::Failed(_)));
    }
}
