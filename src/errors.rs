use std::io;

use thiserror::Error;

use crate::types::{CacheKey, CatalogName, DatasetKey, RecordId};

/// Error type for partitioning, joining, evaluation, and cache failures.
#[derive(Debug, Error)]
pub enum PrepError {
    /// A pair table without positives.
    #[error("dataset '{dataset}' has no positive pairs; the negative/positive ratio is undefined")]
    DegenerateDataset {
        /// Registry key of the dataset.
        dataset: DatasetKey,
    },
    /// A join key matched more than one catalog record.
    #[error("catalog '{catalog}' has {matches} records for id '{id}' (expected at most one)")]
    JoinCardinalityViolation {
        /// Catalog holding the duplicates.
        catalog: CatalogName,
        /// The duplicated id.
        id: RecordId,
        /// Records sharing `id`.
        matches: usize,
    },
    /// The loader produced no batches.
    #[error("evaluation loader yielded no batches")]
    EmptyEvaluationSet,
    /// Cache miss with nothing to build the value.
    #[error("cache miss for '{key}' and no generator was supplied")]
    MissingGenerator {
        /// Key that was looked up.
        key: CacheKey,
    },
    /// A stored cache entry could not be decoded.
    #[error("cache entry '{key}' is unreadable: {reason}")]
    Cache {
        /// Key of the entry.
        key: CacheKey,
        /// Decoder message.
        reason: String,
    },
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Malformed CSV input.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// JSON or binary encoding failure.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Invalid settings or malformed input.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        PrepError::Serialization(err.to_string())
    }
}
