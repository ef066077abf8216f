//! Turns the probe's file groups into a [`DirTree`].
//!
//! Side-table metadata is computed per directory in parallel with rayon;
//! insertion into the tree then happens in probe order so the tree key
//! order is deterministic.

use crate::model::{DirMeta, DirTree, NodeValue};
use compact_str::CompactString;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// Computes the side-table entry of one directory from its files.
pub trait ConstructStage: Send + Sync {
    fn construct(&self, dir: &Path, files: &[CompactString]) -> DirMeta;
}

impl<F> ConstructStage for F
where
    F: Fn(&Path, &[CompactString]) -> DirMeta + Send + Sync,
{
    fn construct(&self, dir: &Path, files: &[CompactString]) -> DirMeta {
        self(dir, files)
    }
}

/// Sums the logical size of the regular files in a directory.
///
/// Symbolic links count as zero bytes. Files that cannot be stat'ed
/// (removed since the probe, permission denied) also count as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirSizer;

impl ConstructStage for DirSizer {
    fn construct(&self, dir: &Path, files: &[CompactString]) -> DirMeta {
        let size = files
            .iter()
            .map(|name| {
                let path = dir.join(name.as_str());
                match fs::symlink_metadata(&path) {
                    Ok(meta) if meta.file_type().is_symlink() => 0,
                    Ok(meta) => meta.len(),
                    Err(err) => {
                        debug!("Cannot stat {}: {err}", path.display());
                        0
                    }
                }
            })
            .sum();
        DirMeta::new(files.len(), size)
    }
}

/// How tree keys are derived from directory paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub root: PathBuf,
    /// Key directories relative to `root` (the root itself becomes `.`).
    pub relative: bool,
}

impl BuildOptions {
    pub fn key_for(&self, dir: &Path) -> PathBuf {
        if !self.relative {
            return dir.to_path_buf();
        }
        match dir.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => PathBuf::from("."),
            Ok(rel) => rel.to_path_buf(),
            Err(_) => dir.to_path_buf(),
        }
    }
}

/// Outcome of [`build_tree`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub status: bool,
    pub dirs: usize,
    pub files: usize,
}

/// Build a tree from groups of file paths sharing a parent directory.
///
/// Each node holds the sorted basenames of its group. Without a
/// `construct` stage the side-table only records file counts.
pub fn build_tree(
    file_groups: &[Vec<PathBuf>],
    options: &BuildOptions,
    construct: Option<&dyn ConstructStage>,
) -> (DirTree, BuildSummary) {
    let start = Instant::now();

    let nodes: Vec<(PathBuf, Vec<CompactString>)> = file_groups
        .iter()
        .filter_map(|group| {
            let dir = group.first()?.parent()?.to_path_buf();
            let mut names: Vec<CompactString> = group
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| CompactString::new(n.to_string_lossy()))
                .collect();
            names.sort_unstable();
            Some((dir, names))
        })
        .collect();

    let metas: Vec<DirMeta> = nodes
        .par_iter()
        .map(|(dir, names)| match construct {
            Some(stage) => stage.construct(dir, names),
            None => DirMeta::counted(names.len()),
        })
        .collect();

    let mut tree = DirTree::with_capacity(nodes.len());
    let mut files = 0;
    for ((dir, names), meta) in nodes.into_iter().zip(metas) {
        files += names.len();
        tree.add_dir(options.key_for(&dir), NodeValue::Files(names), meta);
    }

    let summary = BuildSummary {
        status: !tree.is_empty(),
        dirs: tree.len(),
        files,
    };
    debug!(
        "Built tree with {} dirs and {} files in {:?}",
        summary.dirs,
        summary.files,
        start.elapsed()
    );
    (tree, summary)
}

/// Recompute the side-table for every node that holds a file list.
///
/// Run after a pass that shrank the file lists, so that counts and sizes
/// describe the surviving files. `locate` maps a key to its directory.
/// Nodes holding anything else keep their entry.
pub fn refresh_meta<L>(tree: &mut DirTree, locate: L, construct: Option<&dyn ConstructStage>)
where
    L: Fn(&Path) -> PathBuf + Sync,
{
    let listed: Vec<(PathBuf, Vec<CompactString>)> = tree
        .input
        .iter()
        .filter_map(|(key, value)| match value {
            NodeValue::Files(files) => Some((key.clone(), files.clone())),
            _ => None,
        })
        .collect();

    let metas: Vec<(PathBuf, DirMeta)> = listed
        .into_par_iter()
        .map(|(key, files)| {
            let meta = match construct {
                Some(stage) => stage.construct(&locate(&key), &files),
                None => DirMeta::counted(files.len()),
            };
            (key, meta)
        })
        .collect();

    for (key, meta) in metas {
        tree.meta.insert(key, meta);
    }
}
