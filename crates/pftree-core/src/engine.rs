//! Top-level run: probe the input directory, build the tree, filter it,
//! push it through the user's stages and summarise the result.

use crate::analysis::{aggregate, StatsOrder, TreeStats};
use crate::config::TreeConfig;
use crate::error::TreeError;
use crate::model::{ApplyTarget, DirTree};
use crate::pipeline::{
    AnalyzeStage, PipelineExecutor, PipelineRunResult, ProcessOptions, ReadStage, Stages,
    WriteStage, FILES,
};
use crate::scanner::{
    build_tree, probe, refresh_meta, BuildOptions, BuildSummary, ConstructStage, DirSizer,
    ProbeOptions,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

/// What the probe found, without the listings themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProbeSummary {
    pub status: bool,
    pub dirs: usize,
    pub files: usize,
    pub errors: u64,
}

/// Everything a run reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Probe status AND pipeline status (when a pipeline ran).
    pub status: bool,
    pub probe: ProbeSummary,
    pub build: BuildSummary,
    /// Outcome of the filter pass, when filters are configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<PipelineRunResult>,
    /// Outcome of the user's stages, when any are configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineRunResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<TreeStats>,
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run in seconds.
    pub run_time: f64,
}

/// A configured tree run.
///
/// ```no_run
/// use pftree_core::{PfTree, TreeConfig};
///
/// let mut run = PfTree::new(TreeConfig::new("/data"))?;
/// let report = run.run()?;
/// println!("{} directories", report.build.dirs);
/// # Ok::<(), pftree_core::TreeError>(())
/// ```
pub struct PfTree<'s> {
    config: TreeConfig,
    stages: Stages<'s>,
    construct: Option<&'s dyn ConstructStage>,
    tree: DirTree,
}

impl<'s> PfTree<'s> {
    /// Validate `config` and prepare a run with no stages attached.
    pub fn new(config: TreeConfig) -> Result<Self, TreeError> {
        config.validate()?;
        Ok(Self {
            config,
            stages: Stages::new(),
            construct: None,
            tree: DirTree::default(),
        })
    }

    pub fn with_read(mut self, stage: &'s dyn ReadStage) -> Self {
        self.stages = self.stages.read(stage);
        self
    }

    pub fn with_analyze(mut self, stage: &'s dyn AnalyzeStage) -> Self {
        self.stages = self.stages.analyze(stage);
        self
    }

    pub fn with_write(mut self, stage: &'s dyn WriteStage) -> Self {
        self.stages = self.stages.write(stage);
        self
    }

    /// Replace the side-table constructor used while building the tree.
    pub fn with_construct(mut self, stage: &'s dyn ConstructStage) -> Self {
        self.construct = Some(stage);
        self
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The tree as left by the last [`run`](Self::run).
    pub fn tree(&self) -> &DirTree {
        &self.tree
    }

    pub fn into_tree(self) -> DirTree {
        self.tree
    }

    /// Execute the whole run. The tree is rebuilt from scratch each time.
    pub fn run(&mut self) -> Result<RunReport, TreeError> {
        let started_at = Utc::now();
        let start = Instant::now();
        let config = &self.config;

        if !config.input_root.is_dir() {
            return Err(TreeError::InputRootMissing(config.input_root.clone()));
        }
        info!("Probing {}", config.input_root.display());

        let listing = probe(
            &config.input_root,
            &ProbeOptions {
                max_depth: config.max_depth,
                follow_links: config.follow_links,
                single_file_filter: config.single_file_filter.clone(),
            },
        );
        if listing.errors > 0 {
            warn!("{} entries could not be read during the probe", listing.errors);
        }
        let probe_summary = ProbeSummary {
            status: listing.status,
            dirs: listing.dirs.iter().map(Vec::len).sum(),
            files: listing.file_count(),
            errors: listing.errors,
        };

        let sizer = DirSizer;
        let construct: Option<&dyn ConstructStage> = match self.construct {
            Some(stage) => Some(stage),
            None if config.stats.is_on() => Some(&sizer),
            None => None,
        };
        let (tree, build) = build_tree(
            &listing.files,
            &BuildOptions {
                root: config.input_root.clone(),
                relative: config.relative_dir,
            },
            construct,
        );
        self.tree = tree;
        info!("Built tree: {} directories, {} files", build.dirs, build.files);

        let layout = config.layout();

        let filter = match config.filter_engine() {
            Some(engine) => {
                let result = PipelineExecutor::new(&mut self.tree, &layout).process(
                    &Stages::new().analyze(&engine),
                    &ProcessOptions {
                        apply_to: ApplyTarget::InputTree,
                        apply_key: Some(FILES.to_string()),
                        persist: true,
                        threads: config.threads,
                    },
                )?;
                refresh_meta(&mut self.tree, |key| layout.input_path(key), construct);
                info!(
                    "Filter kept {} of {} directories",
                    self.tree.len(),
                    build.dirs
                );
                Some(result)
            }
            None => None,
        };

        let mut executor = PipelineExecutor::new(&mut self.tree, &layout);
        let pipeline = if self.stages.is_empty() {
            None
        } else {
            Some(executor.process(
                &self.stages,
                &ProcessOptions {
                    apply_to: config.apply_results_to,
                    apply_key: config.apply_key.clone(),
                    persist: config.persist_analysis_results,
                    threads: config.threads,
                },
            )?)
        };

        let stats = config.stats.is_on().then(|| {
            aggregate(
                &self.tree.input,
                &self.tree.meta,
                config.stats == StatsOrder::Descending,
            )
        });

        let status = listing.status && pipeline.as_ref().map_or(true, |p| p.status);
        let run_time = start.elapsed().as_secs_f64();
        info!("Run finished in {run_time:.3}s, status {status}");

        Ok(RunReport {
            status,
            probe: probe_summary,
            build,
            filter,
            pipeline,
            stats,
            started_at,
            run_time,
        })
    }
}
