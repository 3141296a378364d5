use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::constants::source::{LABEL_COLUMN, SOURCE_ID_COLUMN, TARGET_ID_COLUMN};
use crate::constants::splits::{EXAMPLE_HEADER, TSV_DELIMITER};
use crate::data::{JoinedExample, Pair};
use crate::errors::PrepError;
use crate::transport::fs::ensure_parent_dir;

/// Write `examples` as a tab-separated file with an `idx text_left text_right label` header.
///
/// The header is written even when `examples` is empty.
pub fn write_examples(path: impl AsRef<Path>, examples: &[JoinedExample]) -> Result<(), PrepError> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let mut writer = WriterBuilder::new()
        .delimiter(TSV_DELIMITER)
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(EXAMPLE_HEADER)?;
    for example in examples {
        writer.serialize(example)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a file produced by [`write_examples`].
pub fn read_examples(path: impl AsRef<Path>) -> Result<Vec<JoinedExample>, PrepError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(TSV_DELIMITER)
        .has_headers(true)
        .from_path(path)?;
    let mut examples = Vec::new();
    for row in reader.deserialize() {
        examples.push(row?);
    }
    Ok(examples)
}

/// Read `source_id,target_id,label` from a pair table; other columns are ignored.
///
/// Labels accept `0`/`1` and `true`/`false` (any case). Ids are trimmed the
/// same way catalog `subject_id`s are.
pub fn read_pairs(path: impl AsRef<Path>) -> Result<Vec<Pair>, PrepError> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let source = column_index(&headers, SOURCE_ID_COLUMN, path)?;
    let target = column_index(&headers, TARGET_ID_COLUMN, path)?;
    let label = column_index(&headers, LABEL_COLUMN, path)?;

    let mut pairs = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        let raw_label = record.get(label).unwrap_or_default();
        let parsed = parse_label(raw_label).ok_or_else(|| {
            PrepError::Configuration(format!(
                "{}: row {} has unparseable label '{raw_label}'",
                path.display(),
                row_idx + 1
            ))
        })?;
        pairs.push(Pair::new(
            record.get(source).unwrap_or_default().trim(),
            record.get(target).unwrap_or_default().trim(),
            parsed,
        ));
    }
    Ok(pairs)
}

/// Position of `name` in `headers`.
pub fn column_index(headers: &StringRecord, name: &str, path: &Path) -> Result<usize, PrepError> {
    headers
        .iter()
        .position(|header| header.trim() == name)
        .ok_or_else(|| {
            PrepError::Configuration(format!(
                "{} is missing required column '{name}'",
                path.display()
            ))
        })
}

fn parse_label(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" => Some(false),
        _ => None,
    }
}
