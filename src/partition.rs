//! Dataset partitioner: pair table → folds → joined split files.

use tracing::{debug, info, warn};

use crate::cache::DiskCache;
use crate::config::{PartitionConfig, PrepareConfig};
use crate::errors::PrepError;
use crate::folds::{FoldAssignment, assign_folds, fold_sizes};
use crate::metrics::fold_skew;
use crate::source::datasets::DatasetSpec;
use crate::splits::{EmitSummary, emit_splits};
use crate::transport::tsv::read_pairs;
use crate::types::{CacheKey, DatasetKey, OutputKey};

/// Outcome of preparing one dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareSummary {
    /// Registry key of the dataset.
    pub dataset: DatasetKey,
    /// Prefix of the emitted window directories.
    pub output_key: OutputKey,
    /// Negative-per-positive cap `N` for this dataset.
    pub ratio_cap: usize,
    /// Positive pairs in the table.
    pub positives: usize,
    /// Negatives kept, `N` per positive.
    pub negatives_retained: usize,
    /// Negatives beyond `N` per positive.
    pub negatives_dropped: usize,
    /// Windows written to disk.
    pub emitted: EmitSummary,
}

/// Cache key for a dataset's fold assignment under `partition`.
pub fn folds_cache_key(spec: &DatasetSpec, partition: &PartitionConfig) -> CacheKey {
    format!(
        "folds/{}-f{}-c{}-s{}",
        spec.output_key, partition.fold_count, partition.neg_per_pos_cap, partition.seed
    )
}

/// Read the pair table of `spec` and assign folds.
pub fn load_assignment(
    spec: &DatasetSpec,
    config: &PrepareConfig,
) -> Result<FoldAssignment, PrepError> {
    let build = || {
        let pairs = read_pairs(spec.pair_table_path(&config.data_root))?;
        assign_folds(spec.key, pairs, &config.partition)
    };
    match &config.cache_root {
        Some(root) => DiskCache::new(root)
            .load_or_generate(&folds_cache_key(spec, &config.partition), build),
        None => build(),
    }
}

/// Prepare every rotation window of one dataset.
pub fn prepare_dataset(
    spec: &DatasetSpec,
    config: &PrepareConfig,
) -> Result<PrepareSummary, PrepError> {
    let partition = config.partition.validated()?;
    let assignment = load_assignment(spec, config)?;
    log_fold_balance(spec, &assignment, partition.fold_count);
    if assignment.ratio_cap == 0 {
        warn!(
            dataset = spec.key,
            positives = assignment.positives,
            "fewer negatives than positives; no rotation windows to emit"
        );
    }

    let join = spec.bind(&config.data_root)?;
    let emitted = emit_splits(&assignment, partition.fold_count, &join, |ratio, rotation| {
        spec.window_dir(&config.output_root, ratio, rotation)
    })?;

    info!(
        dataset = spec.key,
        ratio_cap = assignment.ratio_cap,
        windows = emitted.windows.len(),
        "prepared dataset"
    );
    Ok(PrepareSummary {
        dataset: spec.dataset_key(),
        output_key: spec.output_key(),
        ratio_cap: assignment.ratio_cap,
        positives: assignment.positives,
        negatives_retained: assignment.negatives_retained,
        negatives_dropped: assignment.negatives_dropped,
        emitted,
    })
}

/// Prepare `specs` in order, stopping at the first failure.
pub fn prepare_all(
    specs: &[DatasetSpec],
    config: &PrepareConfig,
) -> Result<Vec<PrepareSummary>, PrepError> {
    specs
        .iter()
        .map(|spec| prepare_dataset(spec, config))
        .collect()
}

fn log_fold_balance(spec: &DatasetSpec, assignment: &FoldAssignment, fold_count: usize) {
    let sizes = fold_sizes(&assignment.pairs, fold_count);
    for (class, counts) in [("positive", &sizes.positives), ("negative", &sizes.negatives)] {
        if let Some(skew) = fold_skew(counts) {
            info!(
                dataset = spec.key,
                class,
                total = skew.total,
                folds = skew.folds,
                min = skew.min,
                max = skew.max,
                mean = skew.mean,
                max_share = skew.max_share,
                min_share = skew.min_share,
                spread = skew.spread,
                "fold balance"
            );
            for share in &skew.per_fold {
                debug!(
                    dataset = spec.key,
                    class,
                    fold = share.fold,
                    count = share.count,
                    share = share.share,
                    "fold share"
                );
            }
        }
    }
}
