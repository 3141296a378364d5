use std::path::PathBuf;

use crate::constants::apps::{DEFAULT_DATA_ROOT, DEFAULT_OUTPUT_ROOT};
use crate::constants::folds::{FOLD_COUNT, NEG_PER_POS_CAP, SHUFFLE_SEED};
use crate::errors::PrepError;
use crate::types::ExperimentName;

/// Fold assignment and imbalance settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionConfig {
    /// Number of folds each class is dealt into.
    pub fold_count: usize,
    /// Upper bound on the negative-per-positive ratio.
    pub neg_per_pos_cap: usize,
    /// RNG seed for the per-class shuffles.
    pub seed: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            fold_count: FOLD_COUNT,
            neg_per_pos_cap: NEG_PER_POS_CAP,
            seed: SHUFFLE_SEED,
        }
    }
}

impl PartitionConfig {
    /// Override the fold count.
    pub fn with_fold_count(mut self, fold_count: usize) -> Self {
        self.fold_count = fold_count;
        self
    }

    /// Override the negative-per-positive cap.
    pub fn with_neg_per_pos_cap(mut self, cap: usize) -> Self {
        self.neg_per_pos_cap = cap;
        self
    }

    /// Override the shuffle seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject settings that cannot produce disjoint train/validation/test folds.
    pub fn validated(self) -> Result<Self, PrepError> {
        if self.fold_count < 2 {
            return Err(PrepError::Configuration(format!(
                "fold_count must be at least 2 (got {})",
                self.fold_count
            )));
        }
        if self.neg_per_pos_cap == 0 {
            return Err(PrepError::Configuration(
                "neg_per_pos_cap must be positive".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Filesystem layout and partition settings for a preparation run.
#[derive(Clone, Debug)]
pub struct PrepareConfig {
    /// Root holding one directory per dataset key.
    pub data_root: PathBuf,
    /// Root receiving `{output_key}-{ratio}-{rotation}` directories.
    pub output_root: PathBuf,
    /// Fold assignment settings shared by every dataset.
    pub partition: PartitionConfig,
    /// Optional cache root for fold assignments; `None` recomputes every run.
    pub cache_root: Option<PathBuf>,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            partition: PartitionConfig::default(),
            cache_root: None,
        }
    }
}

impl PrepareConfig {
    /// Create a config with explicit data and output roots.
    pub fn new(data_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            output_root: output_root.into(),
            partition: PartitionConfig::default(),
            cache_root: None,
        }
    }

    /// Override partition settings.
    pub fn with_partition(mut self, partition: PartitionConfig) -> Self {
        self.partition = partition;
        self
    }

    /// Cache fold assignments under `root`.
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }
}

/// Transformer family of the evaluated model.
///
/// Decides how segment ids are handed to the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelType {
    /// BERT.
    Bert,
    /// XLNet.
    XlNet,
    /// XLM.
    Xlm,
    /// RoBERTa.
    Roberta,
    /// DistilBERT.
    DistilBert,
}

impl ModelType {
    /// Whether segment ids are passed to the model; XLM, RoBERTa, and DistilBERT get none.
    pub fn uses_segment_ids(self) -> bool {
        matches!(self, ModelType::Bert | ModelType::XlNet)
    }
}

/// Which held-out split an `Evaluation` reports on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvalSplit {
    /// Validation split (`dev.tsv`).
    Validation,
    /// Test split.
    Test,
}

impl EvalSplit {
    /// Name used in result headers and snapshot paths.
    pub fn as_str(self) -> &'static str {
        match self {
            EvalSplit::Validation => "validation",
            EvalSplit::Test => "test",
        }
    }
}

/// Settings for one evaluation aggregator.
#[derive(Clone, Debug)]
pub struct EvaluationConfig {
    /// Experiment directory name under `model_output_dir`.
    pub experiment: ExperimentName,
    /// Root for all experiment outputs.
    pub model_output_dir: PathBuf,
    /// Number of output classes expected per logit row.
    pub n_labels: usize,
    /// Model family; controls `token_type_ids` handling.
    pub model_type: ModelType,
    /// Held-out split evaluated by this aggregator.
    pub split: EvalSplit,
}

impl EvaluationConfig {
    /// Create a binary-classification config for `experiment`.
    pub fn new(
        experiment: impl Into<ExperimentName>,
        model_output_dir: impl Into<PathBuf>,
        split: EvalSplit,
    ) -> Self {
        Self {
            experiment: experiment.into(),
            model_output_dir: model_output_dir.into(),
            n_labels: 2,
            model_type: ModelType::Bert,
            split,
        }
    }

    /// Override the model family.
    pub fn with_model_type(mut self, model_type: ModelType) -> Self {
        self.model_type = model_type;
        self
    }

    /// Override the number of output classes.
    pub fn with_n_labels(mut self, n_labels: usize) -> Self {
        self.n_labels = n_labels;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_defaults_match_benchmark_protocol() {
        let config = PartitionConfig::default();
        assert_eq!(config.fold_count, 10);
        assert_eq!(config.neg_per_pos_cap, 5);
        assert_eq!(config.seed, 0);
        assert!(config.validated().is_ok());
    }

    #[test]
    fn partition_rejects_single_fold_and_zero_cap() {
        let single = PartitionConfig::default().with_fold_count(1);
        assert!(matches!(
            single.validated(),
            Err(PrepError::Configuration(_))
        ));
        let zero_cap = PartitionConfig::default().with_neg_per_pos_cap(0);
        assert!(matches!(
            zero_cap.validated(),
            Err(PrepError::Configuration(_))
        ));
    }

    #[test]
    fn segment_ids_follow_model_family() {
        assert!(ModelType::Bert.uses_segment_ids());
        assert!(ModelType::XlNet.uses_segment_ids());
        assert!(!ModelType::Roberta.uses_segment_ids());
        assert!(!ModelType::Xlm.uses_segment_ids());
        assert!(!ModelType::DistilBert.uses_segment_ids());
    }
}
