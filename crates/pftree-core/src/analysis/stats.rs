//! Per-directory size statistics over the side-table.
//!
//! Mirrors what `du` reports for the directories holding files: one entry
//! per tree key, sorted by size, plus totals.

use crate::model::size::format_size;
use crate::model::{DirMap, DirMeta, NodeValue};
use serde::Serialize;
use std::path::PathBuf;

/// Whether (and in which direction) to report size statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StatsOrder {
    #[default]
    Off,
    Ascending,
    Descending,
}

impl StatsOrder {
    pub fn from_flags(stats: bool, reverse: bool) -> Self {
        match (stats, reverse) {
            (false, _) => StatsOrder::Off,
            (true, false) => StatsOrder::Ascending,
            (true, true) => StatsOrder::Descending,
        }
    }

    #[inline]
    pub fn is_on(self) -> bool {
        self != StatsOrder::Off
    }
}

/// One directory's line in the statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirStat {
    pub files: usize,
    pub size: u64,
    pub size_human: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    pub status: bool,
    pub dirs: usize,
    pub files: usize,
    pub total_size: u64,
    pub total_size_human: String,
    pub entries: Vec<DirStat>,
}

/// Summarise `tree` using the counts and sizes recorded in `meta`.
///
/// Only the keys of `tree` are used, so the result does not depend on what
/// stages stored as values. The sort is stable, so directories of equal
/// size keep tree order.
pub fn aggregate(tree: &DirMap<NodeValue>, meta: &DirMap<DirMeta>, reverse: bool) -> TreeStats {
    let mut entries: Vec<DirStat> = tree
        .keys()
        .map(|path| {
            let (files, size) = meta.get(path).map_or((0, 0), |m| (m.files, m.size));
            DirStat {
                files,
                size,
                size_human: format_size(size),
                path: path.clone(),
            }
        })
        .collect();

    if reverse {
        entries.sort_by(|a, b| b.size.cmp(&a.size));
    } else {
        entries.sort_by_key(|e| e.size);
    }

    let files = entries.iter().map(|e| e.files).sum();
    let total_size = entries.iter().map(|e| e.size).sum();
    TreeStats {
        status: !entries.is_empty(),
        dirs: entries.len(),
        files,
        total_size,
        total_size_human: format_size(total_size),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn side_table(rows: &[(&str, usize, u64)]) -> (DirMap<NodeValue>, DirMap<DirMeta>) {
        let mut tree = DirMap::new();
        let mut meta = DirMap::new();
        for &(path, files, size) in rows {
            let names = (0..files).map(|i| format!("f{i}").into()).collect();
            tree.insert(PathBuf::from(path), NodeValue::Files(names));
            meta.insert(PathBuf::from(path), DirMeta::new(files, size));
        }
        (tree, meta)
    }

    #[test]
    fn three_subdirs_sum_and_sort_ascending() {
        let (tree, meta) = side_table(&[("/r/a", 2, 300), ("/r/b", 2, 700), ("/r/c", 2, 100)]);
        let stats = aggregate(&tree, &meta, false);

        assert!(stats.status);
        assert_eq!(stats.dirs, 3);
        assert_eq!(stats.files, 6);
        assert_eq!(stats.total_size, 1100);
        assert_eq!(stats.total_size_human, "1.1KiB");
        let sizes: Vec<u64> = stats.entries.iter().map(|e| e.size).collect();
        assert_eq!(sizes, vec![100, 300, 700]);
    }

    #[test]
    fn reverse_sorts_descending() {
        let (tree, meta) = side_table(&[("/r/a", 1, 5), ("/r/b", 1, 50), ("/r/c", 1, 500)]);
        let stats = aggregate(&tree, &meta, true);
        let paths: Vec<_> = stats.entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/r/c"), PathBuf::from("/r/b"), PathBuf::from("/r/a")]
        );
    }

    #[test]
    fn equal_sizes_keep_tree_order() {
        let (tree, meta) = side_table(&[("/z", 1, 10), ("/a", 1, 10), ("/m", 1, 10)]);
        let stats = aggregate(&tree, &meta, false);
        let paths: Vec<_> = stats.entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/z"), PathBuf::from("/a"), PathBuf::from("/m")]);
    }

    #[test]
    fn counts_come_from_the_side_table_whatever_the_value() {
        let (mut tree, mut meta) = side_table(&[("/r/a", 4, 40), ("/r/b", 2, 20)]);
        tree.insert(PathBuf::from("/r/a"), NodeValue::Data(json!({"status": true})));
        meta.insert(PathBuf::from("/r/b"), DirMeta::new(1, 5));

        let stats = aggregate(&tree, &meta, false);
        let rows: Vec<(usize, u64)> = stats.entries.iter().map(|e| (e.files, e.size)).collect();
        assert_eq!(rows, vec![(1, 5), (4, 40)]);
        assert_eq!(stats.files, 5);
    }

    #[test]
    fn empty_tree_reports_no_status() {
        let stats = aggregate(&DirMap::new(), &DirMap::new(), false);
        assert!(!stats.status);
        assert_eq!(stats.total_size_human, "0.0B");
    }

    #[test]
    fn order_flags() {
        assert_eq!(StatsOrder::from_flags(false, true), StatsOrder::Off);
        assert_eq!(StatsOrder::from_flags(true, false), StatsOrder::Ascending);
        assert_eq!(StatsOrder::from_flags(true, true), StatsOrder::Descending);
        assert!(!StatsOrder::Off.is_on());
    }
}
