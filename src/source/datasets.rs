//! Registry of the benchmark entity-matching datasets.
//!
//! Each dataset is plain data: where its pair table and catalogs live, how
//! they are encoded, and which pair id feeds which catalog fields. Binding a
//! spec loads the catalogs and yields a [`JoinSpec`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::constants::source::{CATALOG_DIR, PAIR_TABLE_FILE};
use crate::errors::PrepError;
use crate::source::catalog::Catalog;
use crate::source::join::{JoinSide, JoinSpec, PairKey};
use crate::transport::fs::SourceEncoding;
use crate::types::{DatasetKey, OutputKey};

/// Declaration of one join side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SideDecl {
    /// Pair id joined against this catalog.
    pub key: PairKey,
    /// Catalog file name under `{data_root}/{dataset}/record_descriptions/`.
    pub catalog_file: &'static str,
    /// Byte encoding of the catalog file.
    pub encoding: SourceEncoding,
    /// Fields concatenated into the record text.
    pub fields: &'static [&'static str],
}

/// Declaration of one benchmark dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetSpec {
    /// Directory name under the data root.
    pub key: &'static str,
    /// Prefix of emitted `{output_key}-{ratio}-{rotation}` directories.
    pub output_key: &'static str,
    /// Catalog feeding `text_left`.
    pub left: SideDecl,
    /// Catalog feeding `text_right`.
    pub right: SideDecl,
}

const NAME_DESCRIPTION_MANUFACTURER: &[&str] = &["name", "description", "manufacturer"];
const NAME_DESCRIPTION_PRICE: &[&str] = &["name", "description", "price"];
const WALMART_AMAZON_FIELDS: &[&str] = &[
    "title",
    "brand",
    "modelno",
    "price",
    "groupname",
    "longdescr",
];
const SINGLE_VIEW_FIELDS: &[&str] = &["title", "brand", "description", "specTableContent"];

/// The six benchmark datasets, in preparation order.
pub fn benchmark_datasets() -> Vec<DatasetSpec> {
    vec![
        DatasetSpec {
            key: "amazon-google",
            output_key: "amazon-google",
            left: SideDecl {
                key: PairKey::Target,
                catalog_file: "2_google.csv",
                encoding: SourceEncoding::Latin1,
                fields: NAME_DESCRIPTION_MANUFACTURER,
            },
            right: SideDecl {
                key: PairKey::Source,
                catalog_file: "1_amazon.csv",
                encoding: SourceEncoding::Latin1,
                fields: NAME_DESCRIPTION_MANUFACTURER,
            },
        },
        DatasetSpec {
            key: "abt-buy",
            output_key: "abt-buy",
            left: SideDecl {
                key: PairKey::Source,
                catalog_file: "1_abt.csv",
                encoding: SourceEncoding::Latin1,
                fields: NAME_DESCRIPTION_PRICE,
            },
            right: SideDecl {
                key: PairKey::Target,
                catalog_file: "2_buy.csv",
                encoding: SourceEncoding::Latin1,
                fields: NAME_DESCRIPTION_PRICE,
            },
        },
        DatasetSpec {
            key: "products_(Walmart-Amazon)",
            output_key: "walmart-amazon",
            left: SideDecl {
                key: PairKey::Source,
                catalog_file: "1_walmart.csv",
                encoding: SourceEncoding::Utf8,
                fields: WALMART_AMAZON_FIELDS,
            },
            right: SideDecl {
                key: PairKey::Target,
                catalog_file: "2_amazon.csv",
                encoding: SourceEncoding::Utf8,
                fields: WALMART_AMAZON_FIELDS,
            },
        },
        single_view("wdc_xlarge_computers", "1_computers_single_view.csv", SourceEncoding::Utf8),
        single_view("wdc_xlarge_shoes", "1_shoes_single_view.csv", SourceEncoding::Latin1),
        single_view("wdc_xlarge_watches", "1_watches_single_view.csv", SourceEncoding::Utf8),
    ]
}

/// Self-joined catalog: text_left from `target_id`, text_right from `source_id`.
fn single_view(
    key: &'static str,
    catalog_file: &'static str,
    encoding: SourceEncoding,
) -> DatasetSpec {
    let side = |key| SideDecl {
        key,
        catalog_file,
        encoding,
        fields: SINGLE_VIEW_FIELDS,
    };
    DatasetSpec {
        key,
        output_key: key,
        left: side(PairKey::Target),
        right: side(PairKey::Source),
    }
}

/// Look up a registered dataset by `key` or `output_key`.
pub fn find_dataset(name: &str) -> Option<DatasetSpec> {
    benchmark_datasets()
        .into_iter()
        .find(|spec| spec.key == name || spec.output_key == name)
}

impl DatasetSpec {
    /// Registry key as an owned [`DatasetKey`].
    pub fn dataset_key(&self) -> DatasetKey {
        self.key.to_string()
    }

    /// Output prefix as an owned [`OutputKey`].
    pub fn output_key(&self) -> OutputKey {
        self.output_key.to_string()
    }

    /// Whether both sides read one shared catalog.
    pub fn is_symmetric(&self) -> bool {
        self.left.catalog_file == self.right.catalog_file
    }

    /// `{data_root}/{key}/feature_vector.csv`
    pub fn pair_table_path(&self, data_root: &Path) -> PathBuf {
        data_root.join(self.key).join(PAIR_TABLE_FILE)
    }

    /// `{data_root}/{key}/record_descriptions/{file}`
    pub fn catalog_path(&self, data_root: &Path, file: &str) -> PathBuf {
        data_root.join(self.key).join(CATALOG_DIR).join(file)
    }

    /// `{output_root}/{output_key}-{ratio}-{rotation}`
    pub fn window_dir(&self, output_root: &Path, ratio: usize, rotation: usize) -> PathBuf {
        output_root.join(format!("{}-{ratio}-{rotation}", self.output_key))
    }

    /// Load the catalogs under `data_root` and bind the declared fields.
    ///
    /// A catalog shared by both sides is loaded once.
    pub fn bind(&self, data_root: &Path) -> Result<JoinSpec, PrepError> {
        let mut loaded: HashMap<&'static str, Arc<Catalog>> = HashMap::new();
        let mut side = |decl: &SideDecl| -> Result<JoinSide, PrepError> {
            let catalog = match loaded.get(decl.catalog_file) {
                Some(catalog) => Arc::clone(catalog),
                None => {
                    let path = self.catalog_path(data_root, decl.catalog_file);
                    let catalog = Arc::new(Catalog::from_path(&path, decl.encoding)?);
                    loaded.insert(decl.catalog_file, Arc::clone(&catalog));
                    catalog
                }
            };
            JoinSide::new(decl.key, catalog, decl.fields.iter().copied())
        };
        let left = side(&self.left)?;
        let right = side(&self.right)?;
        Ok(JoinSpec::new(left, right))
    }
}
