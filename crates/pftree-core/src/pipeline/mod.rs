//! Read / analyse / write pipeline over the directory tree.
//!
//! Each stage is a trait with one method taking the node being processed
//! and its current tree value, and returning a [`StageResult`]. Closures
//! with the same shape implement the traits directly, and [`JsonStage`]
//! adapts callbacks that build their result as untyped JSON.
//!
//! - [`executor`]: runs the stages over every node, sequentially or with
//!   thread-batched analysis.
//! - [`batch`]: the bounded start/join batch scheduler.
//! - [`layout`]: maps tree keys to input and output locations.

pub mod batch;
pub mod executor;
pub mod layout;

pub use batch::{run_batched, BatchPlan};
pub use executor::PipelineExecutor;
pub use layout::{LeafFormat, PathLayout, LEAF_PLACEHOLDER};

use crate::error::StageError;
use crate::model::{ApplyTarget, NodeValue};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// Field carrying a file list.
pub const FILES: &str = "files";
/// Field summed into [`PipelineRunResult::files_read`].
pub const FILES_READ: &str = "filesRead";
/// Field summed into [`PipelineRunResult::files_analyzed`].
pub const FILES_ANALYZED: &str = "filesAnalyzed";
/// Field summed into [`PipelineRunResult::files_saved`].
pub const FILES_SAVED: &str = "filesSaved";
/// Where a write stage put its output.
pub const OUTPUT_LOCATION: &str = "outputLocation";

/// The three pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Read,
    Analyze,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Read => "read",
            Stage::Analyze => "analyze",
            Stage::Write => "write",
        })
    }
}

/// The node a stage is invoked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node<'a> {
    /// Tree key of the directory.
    pub key: &'a Path,
    /// Filesystem location for this stage: the input directory for read
    /// and analyse, the (possibly renamed) output directory for write.
    pub location: &'a Path,
}

impl<'a> Node<'a> {
    pub fn new(key: &'a Path, location: &'a Path) -> Self {
        Self { key, location }
    }
}

/// What every stage returns: a mandatory status plus free-form fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageResult {
    pub status: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StageResult {
    pub fn new(status: bool) -> Self {
        Self {
            status,
            fields: Map::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(true)
    }

    pub fn failed() -> Self {
        Self::new(false)
    }

    /// Builder-style field insertion.
    ///
    /// Values that cannot be represented as JSON are stored as `null`.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Numeric field as a counter; absent or non-numeric fields count 0.
    pub fn count(&self, key: &str) -> u64 {
        self.get(key).and_then(Value::as_u64).unwrap_or(0)
    }

    /// The result as a JSON object, `status` included.
    pub fn to_value(&self) -> Value {
        let mut obj = self.fields.clone();
        obj.insert("status".to_string(), Value::Bool(self.status));
        Value::Object(obj)
    }
}

impl TryFrom<Value> for StageResult {
    type Error = StageError;

    /// Validate an untyped result. A missing or non-boolean `status` is a
    /// contract violation.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut fields) = value else {
            return Err(StageError::MissingStatus);
        };
        match fields.remove("status") {
            Some(Value::Bool(status)) => Ok(Self { status, fields }),
            _ => Err(StageError::MissingStatus),
        }
    }
}

pub trait ReadStage: Send + Sync {
    fn read(&self, node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError>;
}

pub trait AnalyzeStage: Send + Sync {
    fn analyze(&self, node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError>;
}

pub trait WriteStage: Send + Sync {
    fn write(&self, node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError>;
}

impl<F> ReadStage for F
where
    F: Fn(&Node<'_>, &NodeValue) -> Result<StageResult, StageError> + Send + Sync,
{
    fn read(&self, node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError> {
        self(node, value)
    }
}

impl<F> AnalyzeStage for F
where
    F: Fn(&Node<'_>, &NodeValue) -> Result<StageResult, StageError> + Send + Sync,
{
    fn analyze(&self, node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError> {
        self(node, value)
    }
}

impl<F> WriteStage for F
where
    F: Fn(&Node<'_>, &NodeValue) -> Result<StageResult, StageError> + Send + Sync,
{
    fn write(&self, node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError> {
        self(node, value)
    }
}

/// Adapter for callbacks that return untyped JSON.
///
/// The JSON is validated on every call; a result without a boolean
/// `status` aborts the run as a contract violation.
pub struct JsonStage<F>(pub F);

impl<F> JsonStage<F>
where
    F: Fn(&Node<'_>, &NodeValue) -> anyhow::Result<Value> + Send + Sync,
{
    fn call(&self, node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError> {
        StageResult::try_from((self.0)(node, value)?)
    }
}

impl<F> ReadStage for JsonStage<F>
where
    F: Fn(&Node<'_>, &NodeValue) -> anyhow::Result<Value> + Send + Sync,
{
    fn read(&self, node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError> {
        self.call(node, value)
    }
}

impl<F> AnalyzeStage for JsonStage<F>
where
    F: Fn(&Node<'_>, &NodeValue) -> anyhow::Result<Value> + Send + Sync,
{
    fn analyze(&self, node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError> {
        self.call(node, value)
    }
}

impl<F> WriteStage for JsonStage<F>
where
    F: Fn(&Node<'_>, &NodeValue) -> anyhow::Result<Value> + Send + Sync,
{
    fn write(&self, node: &Node<'_>, value: &NodeValue) -> Result<StageResult, StageError> {
        self.call(node, value)
    }
}

/// The stages to run; any of them may be absent.
#[derive(Clone, Copy, Default)]
pub struct Stages<'a> {
    pub read: Option<&'a dyn ReadStage>,
    pub analyze: Option<&'a dyn AnalyzeStage>,
    pub write: Option<&'a dyn WriteStage>,
}

impl<'a> Stages<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(mut self, stage: &'a dyn ReadStage) -> Self {
        self.read = Some(stage);
        self
    }

    pub fn analyze(mut self, stage: &'a dyn AnalyzeStage) -> Self {
        self.analyze = Some(stage);
        self
    }

    pub fn write(mut self, stage: &'a dyn WriteStage) -> Self {
        self.write = Some(stage);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.read.is_none() && self.analyze.is_none() && self.write.is_none()
    }
}

/// How results are stored and how analysis is scheduled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    pub apply_to: ApplyTarget,
    /// Store only this field of each analysis result.
    pub apply_key: Option<String>,
    /// Keep analysis results rather than replacing them with write results.
    pub persist: bool,
    /// Analysis threads; 0 runs everything sequentially.
    pub threads: usize,
}

/// How a pipeline run was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessType {
    Sequential,
    Threaded,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunResult {
    pub status: bool,
    pub process_type: ProcessType,
    pub file_sets_processed: usize,
    pub files_read: u64,
    pub files_analyzed: u64,
    pub files_saved: u64,
    pub last_read_result: Option<StageResult>,
    pub last_analyze_result: Option<StageResult>,
    pub last_write_result: Option<StageResult>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_round_trips_through_json() {
        let result = StageResult::ok().with(FILES_READ, 3).with(FILES, ["a", "b"]);
        let value = result.to_value();
        assert_eq!(value["status"], json!(true));
        assert_eq!(value[FILES_READ], json!(3));
        assert_eq!(StageResult::try_from(value).unwrap(), result);
    }

    #[test]
    fn missing_status_is_a_contract_violation() {
        let err = StageResult::try_from(json!({"filesRead": 1})).unwrap_err();
        assert!(matches!(err, StageError::MissingStatus));
        let err = StageResult::try_from(json!({"status": "yes"})).unwrap_err();
        assert!(matches!(err, StageError::MissingStatus));
        let err = StageResult::try_from(json!([true])).unwrap_err();
        assert!(matches!(err, StageError::MissingStatus));
    }

    #[test]
    fn count_ignores_missing_and_non_numeric_fields() {
        let result = StageResult::ok().with(FILES_SAVED, 4).with("note", "x");
        assert_eq!(result.count(FILES_SAVED), 4);
        assert_eq!(result.count("note"), 0);
        assert_eq!(result.count(FILES_READ), 0);
    }

    #[test]
    fn serialized_result_is_flat() {
        let result = StageResult::failed().with(FILES_ANALYZED, 0);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": false, "filesAnalyzed": 0})
        );
    }

    fn echo(_node: &Node<'_>, _value: &NodeValue) -> anyhow::Result<Value> {
        Ok(json!({"status": true, "filesRead": 2}))
    }

    #[test]
    fn json_stage_validates_results() {
        let stage = JsonStage(echo);
        let key = Path::new("/k");
        let result = stage.read(&Node::new(key, key), &NodeValue::Dead).unwrap();
        assert!(result.status);
        assert_eq!(result.count(FILES_READ), 2);
    }

    #[test]
    fn stage_display_names() {
        assert_eq!(Stage::Read.to_string(), "read");
        assert_eq!(Stage::Analyze.to_string(), "analyze");
        assert_eq!(Stage::Write.to_string(), "write");
    }
}
