//! The directory tree that the pipeline runs over.
//!
//! Three maps share one key set: the `input` tree (file lists, then read
//! and possibly analysis results), the `output` tree (analysis/write results
//! by default) and the `meta` side-table filled in at build time. Every
//! operation that removes keys goes through [`DirTree::prune_dead_branches`]
//! so the three never drift apart.

use super::dir_map::DirMap;
use super::node::{DirMeta, NodeValue};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirTree {
    pub input: DirMap<NodeValue>,
    pub output: DirMap<NodeValue>,
    pub meta: DirMap<DirMeta>,
}

/// Which of the two trees receives analysis results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplyTarget {
    InputTree,
    #[default]
    OutputTree,
}

impl DirTree {
    pub fn with_capacity(dirs: usize) -> Self {
        Self {
            input: DirMap::with_capacity(dirs),
            output: DirMap::with_capacity(dirs),
            meta: DirMap::with_capacity(dirs),
        }
    }

    /// Register a directory with its files and side-table entry.
    ///
    /// The output tree gets the same key with a `null` placeholder.
    pub fn add_dir(&mut self, key: PathBuf, value: NodeValue, meta: DirMeta) {
        self.output.insert(key.clone(), NodeValue::Data(Value::Null));
        self.meta.insert(key.clone(), meta);
        self.input.insert(key, value);
    }

    /// Number of directory nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.input.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    pub fn tree(&self, target: ApplyTarget) -> &DirMap<NodeValue> {
        match target {
            ApplyTarget::InputTree => &self.input,
            ApplyTarget::OutputTree => &self.output,
        }
    }

    pub fn tree_mut(&mut self, target: ApplyTarget) -> &mut DirMap<NodeValue> {
        match target {
            ApplyTarget::InputTree => &mut self.input,
            ApplyTarget::OutputTree => &mut self.output,
        }
    }

    /// Mark a node as dead in the input tree (and the output tree, if it
    /// already holds a value for it).
    pub fn mark_dead(&mut self, key: &Path) {
        if let Some(v) = self.input.get_mut(key) {
            *v = NodeValue::Dead;
        }
        if let Some(v) = self.output.get_mut(key) {
            *v = NodeValue::Dead;
        }
    }

    /// Remove every node whose input or output value is the dead sentinel.
    ///
    /// The input tree and side-table are rebuilt over the surviving keys,
    /// and the output tree is rebuilt as a fresh copy bound to exactly those
    /// keys: a survivor keeps its output value, or takes its input value if
    /// the output tree had none. Returns the number of nodes removed.
    pub fn prune_dead_branches(&mut self) -> usize {
        let before = self.input.len();
        let output = &self.output;
        self.input.retain(|key, value| {
            !value.is_dead() && !output.get(key).is_some_and(NodeValue::is_dead)
        });

        let input = &self.input;
        self.meta.retain(|key, _| input.contains_key(key));

        let mut rebuilt = DirMap::with_capacity(self.input.len());
        for (key, value) in self.input.iter() {
            let kept = self.output.get(key).unwrap_or(value).clone();
            rebuilt.insert(key.clone(), kept);
        }
        self.output = rebuilt;

        let removed = before - self.input.len();
        if removed > 0 {
            debug!("Pruned {removed} dead branches, {} remain", self.input.len());
        }
        removed
    }

    /// `true` if the input tree, output tree and side-table hold the same keys.
    pub fn is_in_sync(&self) -> bool {
        self.input.same_keys(&self.output) && self.input.same_keys(&self.meta)
    }
}
