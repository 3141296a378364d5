#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runners.
pub mod apps;
/// Generate-on-miss disk cache.
pub mod cache;
/// Partition, preparation, and evaluation settings.
pub mod config;
/// Centralized constants used across folds, splits, sources, and evaluation.
pub mod constants;
/// Pair and example record types.
pub mod data;
/// Evaluation aggregator and model/loader traits.
pub mod eval;
/// Stratified fold assignment.
pub mod folds;
/// Fold balance and classification metrics.
pub mod metrics;
/// Per-dataset preparation pipeline.
pub mod partition;
/// Catalogs, joins, and the benchmark dataset registry.
pub mod source;
/// Rotation windows and split emission.
pub mod splits;
/// Filesystem and TSV transports.
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Text normalization helpers.
pub mod utils;

mod errors;

pub use config::{EvalSplit, EvaluationConfig, ModelType, PartitionConfig, PrepareConfig};
pub use data::{FoldedPair, JoinedExample, Pair};
pub use errors::PrepError;
pub use eval::{
    DataLoader, Device, EvalBatch, EvalModel, EvalOutcome, EvalResult, Evaluation, ModelInputs,
    ModelOutput, PredictionSnapshot,
};
pub use folds::{FoldAssignment, assign_folds};
pub use partition::{PrepareSummary, prepare_all, prepare_dataset};
pub use source::{Catalog, DatasetSpec, JoinSide, JoinSpec, PairJoin, PairKey};
pub use splits::{EmitSummary, RotationWindow, SplitLabel, emit_splits};
pub use types::{
    CacheKey, CatalogName, DatasetKey, ExperimentName, FieldName, FoldIndex, OutputKey, RecordId,
};
