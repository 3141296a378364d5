/// Encoding-aware file reads and directory helpers.
pub mod fs;
/// Pair-table CSV and example TSV I/O.
pub mod tsv;
