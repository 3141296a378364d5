/// Opaque record identifier referenced by a pair (`source_id` / `target_id`).
/// Examples: `b000jz4hqo`, `http://www.google.com/base/feeds/snippets/11125907881740407428`
pub type RecordId = String;
/// Name of a benchmark dataset directory under the data root.
/// Examples: `amazon-google`, `products_(Walmart-Amazon)`, `wdc_xlarge_shoes`
pub type DatasetKey = String;
/// Short name used when building output directory names.
/// Examples: `amazon-google`, `walmart-amazon`
pub type OutputKey = String;
/// Human-readable catalog name used in join diagnostics.
/// Examples: `1_abt.csv`, `1_computers_single_view.csv`
pub type CatalogName = String;
/// Catalog column name.
/// Examples: `title`, `specTableContent`, `longdescr`
pub type FieldName = String;
/// Relative cache key; maps to `{root}/{key}.bin`.
/// Examples: `folds/abt-buy-f10-c5-s0`, `folds/walmart-amazon-f5-c3-s7`
pub type CacheKey = String;
/// Experiment identifier used to place evaluation outputs.
/// Examples: `abt-buy-3-4`, `wdc_xlarge_watches-1-0`
pub type ExperimentName = String;
/// Zero-based fold index in `0..fold_count`.
pub type FoldIndex = usize;
