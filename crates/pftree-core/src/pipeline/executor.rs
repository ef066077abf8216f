//! Runs the read / analyse / write stages over every node of a [`DirTree`].
//!
//! # Scheduling
//!
//! With `threads == 0` each node goes through read, analyse and write before
//! the next node starts. With `threads > 0` the run is three global phases
//! separated by barriers: every read in tree order, then every analysis via
//! [`run_batched`], then every write for the nodes that survived. Reads and
//! writes are I/O bound and stay sequential.
//!
//! # Failure handling
//!
//! An analysis that fails, or returns `status = false`, only kills its own
//! node, which is pruned before the write phase (or at the end of a
//! sequential run). A stage result without `status` in any stage, or an
//! error from a read or write callback, aborts the whole run.

use super::batch::run_batched;
use super::{
    AnalyzeStage, Node, PathLayout, PipelineRunResult, ProcessOptions, ProcessType, ReadStage,
    Stage, StageResult, Stages, WriteStage, FILES_ANALYZED, FILES_READ, FILES_SAVED,
};
use crate::error::{PipelineError, StageError};
use crate::model::{DirTree, NodeValue};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Running totals for one stage.
#[derive(Debug, Clone, Default)]
struct StageTally {
    /// OR across every node's status.
    status: bool,
    files: u64,
    last: Option<StageResult>,
}

impl StageTally {
    fn record(&mut self, result: &StageResult, count_field: &str) {
        self.status |= result.status;
        self.files += result.count(count_field);
        self.last = Some(result.clone());
    }
}

/// Per-run context, folded into a [`PipelineRunResult`] at the end.
#[derive(Debug, Default)]
struct RunTally {
    nodes: usize,
    read: StageTally,
    analyze: StageTally,
    write: StageTally,
}

impl RunTally {
    fn finish(self, stages: &Stages<'_>, process_type: ProcessType) -> PipelineRunResult {
        let configured = [
            (stages.read.is_some(), self.read.status),
            (stages.analyze.is_some(), self.analyze.status),
            (stages.write.is_some(), self.write.status),
        ];
        let status = configured
            .iter()
            .filter(|(present, _)| *present)
            .all(|(_, ok)| *ok);

        PipelineRunResult {
            status,
            process_type,
            file_sets_processed: self.nodes,
            files_read: self.read.files,
            files_analyzed: self.analyze.files,
            files_saved: self.write.files,
            last_read_result: self.read.last,
            last_analyze_result: self.analyze.last,
            last_write_result: self.write.last,
        }
    }
}

/// Turn a stage error from a non-recovering stage into a run-level error.
fn fatal(stage: Stage, path: &Path, err: StageError) -> PipelineError {
    match err {
        StageError::MissingStatus => PipelineError::ContractViolation {
            stage,
            path: path.to_path_buf(),
            reason: StageError::MissingStatus.to_string(),
        },
        StageError::Failed(source) => PipelineError::StageFailed {
            stage,
            path: path.to_path_buf(),
            source,
        },
    }
}

pub struct PipelineExecutor<'t> {
    tree: &'t mut DirTree,
    layout: &'t PathLayout,
}

impl<'t> PipelineExecutor<'t> {
    pub fn new(tree: &'t mut DirTree, layout: &'t PathLayout) -> Self {
        Self { tree, layout }
    }

    /// Run `stages` over every node.
    pub fn process(
        &mut self,
        stages: &Stages<'_>,
        options: &ProcessOptions,
    ) -> Result<PipelineRunResult, PipelineError> {
        let start = Instant::now();
        let process_type = if options.threads == 0 {
            ProcessType::Sequential
        } else {
            ProcessType::Threaded
        };
        let mut tally = RunTally {
            nodes: self.tree.len(),
            ..RunTally::default()
        };
        info!(
            "Processing {} directories ({:?}, {} threads)",
            tally.nodes, process_type, options.threads
        );

        match process_type {
            ProcessType::Sequential => self.run_sequential(stages, options, &mut tally)?,
            ProcessType::Threaded => self.run_threaded(stages, options, &mut tally)?,
        }

        let result = tally.finish(stages, process_type);
        info!(
            "Pipeline finished in {:?}: {} directories remain, status {}",
            start.elapsed(),
            self.tree.len(),
            result.status
        );
        Ok(result)
    }

    fn run_sequential(
        &mut self,
        stages: &Stages<'_>,
        options: &ProcessOptions,
        tally: &mut RunTally,
    ) -> Result<(), PipelineError> {
        let keys: Vec<PathBuf> = self.tree.input.keys().cloned().collect();

        for key in &keys {
            if let Some(read) = stages.read {
                self.read_node(key, read, &mut tally.read)?;
            }

            let value = self.current_input(key);
            let for_write = match stages.analyze {
                Some(analyze) => {
                    let location = self.layout.input_path(key);
                    let outcome = analyze.analyze(&Node::new(key, &location), &value);
                    match self.settle_analysis(key, &location, outcome, options, &mut tally.analyze)? {
                        Some(result) => result,
                        None => continue,
                    }
                }
                None => value,
            };

            if let Some(write) = stages.write {
                self.write_node(key, &for_write, write, options, &mut tally.write)?;
            }
        }

        self.tree.prune_dead_branches();
        Ok(())
    }

    fn run_threaded(
        &mut self,
        stages: &Stages<'_>,
        options: &ProcessOptions,
        tally: &mut RunTally,
    ) -> Result<(), PipelineError> {
        let keys: Vec<PathBuf> = self.tree.input.keys().cloned().collect();

        // Phase 1: reads, in tree order.
        if let Some(read) = stages.read {
            for key in &keys {
                self.read_node(key, read, &mut tally.read)?;
            }
        }

        // Phase 2: batched analysis. Workers only read the tree; results
        // are applied here once each batch has joined.
        let mut for_write: HashMap<PathBuf, NodeValue> = HashMap::new();
        if let Some(analyze) = stages.analyze {
            let jobs: Vec<(&PathBuf, PathBuf)> = keys
                .iter()
                .map(|key| (key, self.layout.input_path(key)))
                .collect();
            let input = &self.tree.input;
            let outcomes = run_batched(
                &jobs,
                options.threads,
                |(key, location)| match input.get(key) {
                    Some(value) => analyze.analyze(&Node::new(key, location), value),
                    None => Err(anyhow::anyhow!("node vanished before analysis").into()),
                },
                |outcome| matches!(outcome, Err(StageError::MissingStatus)),
            )?;

            for ((key, location), outcome) in jobs.iter().zip(outcomes) {
                let Some(outcome) = outcome else { continue };
                if let Some(result) =
                    self.settle_analysis(key, location, outcome, options, &mut tally.analyze)?
                {
                    for_write.insert((*key).clone(), result);
                }
            }
            self.tree.prune_dead_branches();
        }

        // Phase 3: writes for the survivors, in tree order.
        if let Some(write) = stages.write {
            for key in &keys {
                if !self.tree.input.contains_key(key) {
                    continue;
                }
                let value = match for_write.remove(key) {
                    Some(value) => value,
                    None => self.current_input(key),
                };
                self.write_node(key, &value, write, options, &mut tally.write)?;
            }
        }
        Ok(())
    }

    fn current_input(&self, key: &Path) -> NodeValue {
        self.tree
            .input
            .get(key)
            .cloned()
            .unwrap_or(NodeValue::Dead)
    }

    /// Run the read stage for one node; its result replaces the input value.
    fn read_node(
        &mut self,
        key: &Path,
        read: &dyn ReadStage,
        tally: &mut StageTally,
    ) -> Result<(), PipelineError> {
        let location = self.layout.input_path(key);
        let value = self.current_input(key);
        let result = read
            .read(&Node::new(key, &location), &value)
            .map_err(|e| fatal(Stage::Read, &location, e))?;
        tally.record(&result, FILES_READ);
        self.tree
            .input
            .insert(key.to_path_buf(), NodeValue::Data(result.to_value()));
        Ok(())
    }

    /// Apply one node's analysis outcome to the tree.
    ///
    /// Returns the full analysis result to hand to the write stage, or
    /// `None` if the node is now dead.
    fn settle_analysis(
        &mut self,
        key: &Path,
        location: &Path,
        outcome: Result<StageResult, StageError>,
        options: &ProcessOptions,
        tally: &mut StageTally,
    ) -> Result<Option<NodeValue>, PipelineError> {
        let result = match outcome {
            Ok(result) => result,
            Err(StageError::MissingStatus) => {
                return Err(fatal(Stage::Analyze, location, StageError::MissingStatus));
            }
            Err(StageError::Failed(err)) => {
                warn!("Analysis failed at {}: {err:#}", key.display());
                self.tree.mark_dead(key);
                return Ok(None);
            }
        };

        tally.record(&result, FILES_ANALYZED);
        if !result.status {
            debug!("Analysis rejected {}", key.display());
            self.tree.mark_dead(key);
            return Ok(None);
        }

        let stored = match &options.apply_key {
            Some(field) => match result.get(field) {
                Some(v) => NodeValue::from_json(v.clone()),
                None => {
                    return Err(PipelineError::ContractViolation {
                        stage: Stage::Analyze,
                        path: location.to_path_buf(),
                        reason: format!("result has no `{field}` field to apply"),
                    });
                }
            },
            None => NodeValue::Data(result.to_value()),
        };
        self.tree
            .tree_mut(options.apply_to)
            .insert(key.to_path_buf(), stored);
        Ok(Some(NodeValue::Data(result.to_value())))
    }

    /// Run the write stage for one node at its output location.
    fn write_node(
        &mut self,
        key: &Path,
        value: &NodeValue,
        write: &dyn WriteStage,
        options: &ProcessOptions,
        tally: &mut StageTally,
    ) -> Result<(), PipelineError> {
        let location = self.layout.output_path(key);
        let result = write
            .write(&Node::new(key, &location), value)
            .map_err(|e| fatal(Stage::Write, &location, e))?;
        tally.record(&result, FILES_SAVED);
        if !options.persist {
            self.tree
                .tree_mut(options.apply_to)
                .insert(key.to_path_buf(), NodeValue::Data(result.to_value()));
        }
        Ok(())
    }
}
