//! Source catalogs, declarative joins, and the dataset registry.
//!
//! Ownership model:
//! - `Catalog` owns the parsed records of one catalog file.
//! - `JoinSide` binds a pair key and field list to a shared catalog.
//! - `DatasetSpec` is static data; `bind` turns it into a `JoinSpec`.

/// Record catalogs keyed by `subject_id`.
pub mod catalog;
/// Benchmark dataset declarations.
pub mod datasets;
/// Join trait and declarative join specification.
pub mod join;

pub use catalog::{Catalog, CatalogRecord};
pub use datasets::{DatasetSpec, SideDecl, benchmark_datasets, find_dataset};
pub use join::{JoinSide, JoinSpec, PairJoin, PairKey};
