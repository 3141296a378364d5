use std::collections::HashMap;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use crate::constants::source::SUBJECT_ID_COLUMN;
use crate::errors::PrepError;
use crate::transport::fs::{SourceEncoding, read_to_string_with};
use crate::transport::tsv::column_index;
use crate::types::{CatalogName, FieldName, RecordId};

/// One record of a source catalog.
///
/// `values` is aligned with the owning catalog's `columns`; an empty cell is
/// an empty string, never a null marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogRecord {
    /// Trimmed record id.
    pub subject_id: RecordId,
    /// Field values in catalog column order.
    pub values: Vec<String>,
}

/// In-memory record catalog keyed by `subject_id`.
///
/// Duplicate ids are kept so joins can report them instead of silently
/// picking one.
#[derive(Clone, Debug)]
pub struct Catalog {
    name: CatalogName,
    columns: Vec<FieldName>,
    records: Vec<CatalogRecord>,
    index: HashMap<RecordId, Vec<usize>>,
}

impl Catalog {
    /// Build a catalog from already-parsed rows.
    pub fn from_records(
        name: impl Into<CatalogName>,
        columns: Vec<FieldName>,
        records: Vec<CatalogRecord>,
    ) -> Self {
        let mut index: HashMap<RecordId, Vec<usize>> = HashMap::new();
        for (position, record) in records.iter().enumerate() {
            index
                .entry(record.subject_id.clone())
                .or_default()
                .push(position);
        }
        Self {
            name: name.into(),
            columns,
            records,
            index,
        }
    }

    /// Parse comma-separated catalog text with a header row containing `subject_id`.
    pub fn from_csv_str(name: impl Into<CatalogName>, text: &str) -> Result<Self, PrepError> {
        let name = name.into();
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        let headers = reader.headers()?.clone();
        let id_column = column_index(&headers, SUBJECT_ID_COLUMN, Path::new(&name))?;
        let columns: Vec<FieldName> = headers.iter().map(|h| h.trim().to_string()).collect();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let values: Vec<String> = (0..columns.len())
                .map(|idx| row.get(idx).unwrap_or_default().to_string())
                .collect();
            records.push(CatalogRecord {
                subject_id: values[id_column].trim().to_string(),
                values,
            });
        }
        Ok(Self::from_records(name, columns, records))
    }

    /// Load a catalog file decoded with `encoding`; the file name becomes the catalog name.
    pub fn from_path(path: &Path, encoding: SourceEncoding) -> Result<Self, PrepError> {
        let text = read_to_string_with(path, encoding)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let catalog = Self::from_csv_str(name, &text)?;
        debug!(
            catalog = %catalog.name,
            records = catalog.len(),
            columns = catalog.columns.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    /// Name used in errors and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column names after `subject_id`.
    pub fn columns(&self) -> &[FieldName] {
        &self.columns
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Position of `field` in `columns`.
    pub fn column_position(&self, field: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == field)
    }

    /// The unique record for `id`, `None` when absent.
    ///
    /// More than one record for `id` is a `JoinCardinalityViolation`.
    pub fn lookup(&self, id: &str) -> Result<Option<&CatalogRecord>, PrepError> {
        match self.index.get(id).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([position]) => Ok(Some(&self.records[*position])),
            Some(positions) => Err(PrepError::JoinCardinalityViolation {
                catalog: self.name.clone(),
                id: id.to_string(),
                matches: positions.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_header_and_fills_missing_cells() {
        let catalog = Catalog::from_csv_str(
            "1_abt.csv",
            "subject_id,name,description,price\n7,Sony TV,,$499\n8,Canon EOS\n",
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.column_position("price"), Some(3));
        let record = catalog.lookup("8").unwrap().unwrap();
        assert_eq!(record.values, vec!["8", "Canon EOS", "", ""]);
        assert!(catalog.lookup("9").unwrap().is_none());
    }

    #[test]
    fn duplicate_ids_fail_on_lookup_only() {
        let catalog = Catalog::from_csv_str(
            "2_buy.csv",
            "subject_id,name\n1,first\n1,second\n2,third\n",
        )
        .unwrap();
        assert!(catalog.lookup("2").unwrap().is_some());
        let err = catalog.lookup("1").unwrap_err();
        assert!(matches!(
            err,
            PrepError::JoinCardinalityViolation { ref id, matches: 2, .. } if id == "1"
        ));
    }

    #[test]
    fn missing_subject_id_column_is_a_configuration_error() {
        let err = Catalog::from_csv_str("bad.csv", "id,name\n1,x\n").unwrap_err();
        assert!(matches!(err, PrepError::Configuration(_)));
    }

    #[test]
    fn from_path_decodes_latin1() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("1_shoes_single_view.csv");
        fs::write(&path, b"subject_id,title\nx1,Caf\xE9 Racer\n").unwrap();
        let catalog = Catalog::from_path(&path, SourceEncoding::Latin1).unwrap();
        assert_eq!(catalog.name(), "1_shoes_single_view.csv");
        assert_eq!(catalog.lookup("x1").unwrap().unwrap().values[1], "Café Racer");
    }
}
