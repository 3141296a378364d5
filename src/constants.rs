use crate::splits::SplitLabel;

/// Constants used by fold assignment and imbalance control.
pub mod folds {
    /// Number of folds each class is dealt into.
    pub const FOLD_COUNT: usize = 10;
    /// Upper bound on the negative-per-positive ratio `N`.
    pub const NEG_PER_POS_CAP: usize = 5;
    /// Seed used for both per-class shuffles.
    pub const SHUFFLE_SEED: u64 = 0;
}

/// Constants used by split emission and TSV layout.
pub mod splits {
    use super::SplitLabel;

    /// Canonical emission order for one rotation window.
    pub const ALL_SPLITS: [SplitLabel; 3] =
        [SplitLabel::Train, SplitLabel::Validation, SplitLabel::Test];
    /// Field delimiter for emitted example files.
    pub const TSV_DELIMITER: u8 = b'\t';
    /// Header row of emitted example files, in column order.
    pub const EXAMPLE_HEADER: [&str; 4] = ["idx", "text_left", "text_right", "label"];
}

/// Constants used when reading source catalogs and pair tables.
pub mod source {
    /// Pair table file name inside each dataset directory.
    pub const PAIR_TABLE_FILE: &str = "feature_vector.csv";
    /// Directory holding per-dataset record catalogs.
    pub const CATALOG_DIR: &str = "record_descriptions";
    /// Catalog column holding the record identifier.
    pub const SUBJECT_ID_COLUMN: &str = "subject_id";
    /// Pair table column holding the left record id.
    pub const SOURCE_ID_COLUMN: &str = "source_id";
    /// Pair table column holding the right record id.
    pub const TARGET_ID_COLUMN: &str = "target_id";
    /// Pair table column holding the match label.
    pub const LABEL_COLUMN: &str = "label";
    /// Separator placed between concatenated catalog fields.
    pub const FIELD_SEPARATOR: &str = " ";
}

/// Constants used by the evaluation aggregator.
pub mod eval {
    /// Results log file name inside the experiment directory.
    pub const RESULTS_FILE: &str = "eval_results.txt";
    /// Extension used for per-epoch prediction snapshots.
    pub const SNAPSHOT_EXTENSION: &str = "json";
    /// Class index treated as positive for binary F1.
    pub const POSITIVE_CLASS: usize = 1;
}

/// Constants used by the generate-on-miss disk cache.
pub mod cache {
    /// Default cache root relative to the working directory.
    pub const DEFAULT_CACHE_DIR: &str = "cache";
    /// File extension for cache entries.
    pub const CACHE_EXTENSION: &str = "bin";
    /// Prefix marker for bitcode-encoded payloads.
    pub const BITCODE_PREFIX: u8 = b'B';
    /// Version tag for cache entry payloads.
    pub const CACHE_RECORD_VERSION: u8 = 1;
}

/// Constants used by the command-line runner.
pub mod apps {
    /// Default data root holding one directory per dataset.
    pub const DEFAULT_DATA_ROOT: &str = "data";
    /// Default output root for emitted `{key}-{ratio}-{rotation}` directories.
    pub const DEFAULT_OUTPUT_ROOT: &str = "entity-matching-transformer/data";
}
