//! Values stored at each directory key of the tree and its side-table.

use super::size::format_size;
use compact_str::CompactString;
use serde::Serialize;
use serde_json::Value;

/// The value held by one node of the tree.
///
/// Freshly built trees hold `Files`; once a stage has run, a node holds the
/// stage's result (`Data`). `Dead` marks a node whose analysis failed or whose
/// file list was filtered away; it is removed by the next prune.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeValue {
    /// Sorted basenames of the files in the directory.
    Files(Vec<CompactString>),
    /// An arbitrary stage result (or a field extracted from one).
    Data(Value),
    /// Dead sentinel, due for pruning.
    Dead,
}

impl NodeValue {
    /// Convert a JSON value into a node value.
    ///
    /// An array made only of strings is a file list, anything else is kept
    /// as opaque data.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(items) if items.iter().all(Value::is_string) => NodeValue::Files(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(CompactString::new)
                    .collect(),
            ),
            other => NodeValue::Data(other),
        }
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        matches!(self, NodeValue::Dead)
    }

    /// The file list carried by this value.
    ///
    /// Besides `Files` itself, a stage result object with a `files` string
    /// array also counts, so a filter or listing stage can follow a read.
    pub fn files(&self) -> Option<Vec<CompactString>> {
        match self {
            NodeValue::Files(files) => Some(files.clone()),
            NodeValue::Data(Value::Object(obj)) => obj.get("files").and_then(|v| {
                v.as_array()?
                    .iter()
                    .map(|f| f.as_str().map(CompactString::new))
                    .collect()
            }),
            _ => None,
        }
    }
}

impl From<Vec<CompactString>> for NodeValue {
    fn from(files: Vec<CompactString>) -> Self {
        NodeValue::Files(files)
    }
}

/// Per-directory metadata kept in the side-table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirMeta {
    /// Number of files in the directory at build time.
    pub files: usize,
    /// Total logical size of those files in bytes.
    pub size: u64,
    /// `size` formatted with binary units.
    pub size_human: String,
}

impl DirMeta {
    pub fn new(files: usize, size: u64) -> Self {
        Self {
            files,
            size,
            size_human: format_size(size),
        }
    }

    /// Metadata for a directory whose sizes were not measured.
    pub fn counted(files: usize) -> Self {
        Self::new(files, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_arrays_become_file_lists() {
        let v = NodeValue::from_json(json!(["a.txt", "b.txt"]));
        assert_eq!(
            v,
            NodeValue::Files(vec![CompactString::new("a.txt"), CompactString::new("b.txt")])
        );
    }

    #[test]
    fn mixed_arrays_stay_opaque() {
        let v = NodeValue::from_json(json!(["a.txt", 3]));
        assert!(matches!(v, NodeValue::Data(_)));
    }

    #[test]
    fn files_are_found_inside_result_objects() {
        let v = NodeValue::Data(json!({"status": true, "files": ["x", "y"]}));
        assert_eq!(v.files().map(|f| f.len()), Some(2));
        assert_eq!(NodeValue::Data(json!({"status": true})).files(), None);
        assert_eq!(NodeValue::Dead.files(), None);
    }

    #[test]
    fn dead_serializes_as_null() {
        assert_eq!(serde_json::to_string(&NodeValue::Dead).unwrap(), "null");
    }

    #[test]
    fn meta_carries_human_size() {
        let meta = DirMeta::new(2, 2048);
        assert_eq!(meta.size_human, "2.0KiB");
        assert_eq!(DirMeta::counted(5).size, 0);
    }
}
