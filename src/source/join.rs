//! Declarative catalog joins.
//!
//! Every dataset shares one join routine: look up each side of a pair in a
//! catalog, concatenate an ordered field list, and normalize the text. A
//! dataset only declares which pair id feeds which catalog and which fields
//! to read.

use std::sync::Arc;

use tracing::debug;

use crate::data::{FoldedPair, JoinedExample, Pair};
use crate::errors::PrepError;
use crate::source::catalog::Catalog;
use crate::types::FieldName;
use crate::utils::compose_text;

/// Turns fold-annotated pairs into indexed text examples.
pub trait PairJoin {
    /// Join `rows` in order and number the results `0..rows.len()`.
    fn join(&self, rows: &[FoldedPair]) -> Result<Vec<JoinedExample>, PrepError>;
}

impl<F> PairJoin for F
where
    F: Fn(&[FoldedPair]) -> Result<Vec<JoinedExample>, PrepError>,
{
    fn join(&self, rows: &[FoldedPair]) -> Result<Vec<JoinedExample>, PrepError> {
        self(rows)
    }
}

/// Which id of a pair is used as the join key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairKey {
    /// `source_id`.
    Source,
    /// `target_id`.
    Target,
}

impl PairKey {
    /// The id this key selects from `pair`.
    pub fn id_of(self, pair: &Pair) -> &str {
        match self {
            PairKey::Source => &pair.source_id,
            PairKey::Target => &pair.target_id,
        }
    }
}

/// One side of a join: key, catalog, and the ordered fields forming its text.
#[derive(Clone, Debug)]
pub struct JoinSide {
    key: PairKey,
    catalog: Arc<Catalog>,
    fields: Vec<FieldName>,
    positions: Vec<usize>,
}

impl JoinSide {
    /// Bind `fields` to `catalog`; unknown field names are rejected here, not per row.
    pub fn new<I, S>(key: PairKey, catalog: Arc<Catalog>, fields: I) -> Result<Self, PrepError>
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        let fields: Vec<FieldName> = fields.into_iter().map(Into::into).collect();
        let positions = fields
            .iter()
            .map(|field| {
                catalog.column_position(field).ok_or_else(|| {
                    PrepError::Configuration(format!(
                        "catalog '{}' has no column '{field}'",
                        catalog.name()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            key,
            catalog,
            fields,
            positions,
        })
    }

    /// Pair id this side joins on.
    pub fn key(&self) -> PairKey {
        self.key
    }

    /// Catalog this side reads from.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Fields concatenated into the side's text.
    pub fn fields(&self) -> &[FieldName] {
        &self.fields
    }

    /// Normalized text for `pair`, or `None` when the id has no catalog record.
    pub fn text_for(&self, pair: &Pair) -> Result<Option<String>, PrepError> {
        let id = self.key.id_of(pair);
        let Some(record) = self.catalog.lookup(id)? else {
            return Ok(None);
        };
        Ok(Some(compose_text(self.positions.iter().map(|&position| {
            record.values.get(position).map(String::as_str)
        }))))
    }
}

/// Left-join specification producing `(text_left, text_right)` for each pair.
#[derive(Clone, Debug)]
pub struct JoinSpec {
    /// Side producing `text_left`.
    pub left: JoinSide,
    /// Side producing `text_right`.
    pub right: JoinSide,
}

impl JoinSpec {
    /// Join `left` and `right` row by row.
    pub fn new(left: JoinSide, right: JoinSide) -> Self {
        Self { left, right }
    }

    /// Whether both sides read the same catalog (self-join).
    pub fn is_symmetric(&self) -> bool {
        Arc::ptr_eq(&self.left.catalog, &self.right.catalog)
    }
}

impl PairJoin for JoinSpec {
    fn join(&self, rows: &[FoldedPair]) -> Result<Vec<JoinedExample>, PrepError> {
        let mut unmatched = 0usize;
        let mut examples = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            let left = self.left.text_for(&row.pair)?;
            let right = self.right.text_for(&row.pair)?;
            unmatched += usize::from(left.is_none()) + usize::from(right.is_none());
            examples.push(JoinedExample {
                idx,
                text_left: left.unwrap_or_default(),
                text_right: right.unwrap_or_default(),
                label: u8::from(row.label()),
            });
        }
        if unmatched > 0 {
            debug!(
                left = self.left.catalog.name(),
                right = self.right.catalog.name(),
                unmatched,
                "pair ids without a catalog record joined as empty text"
            );
        }
        Ok(examples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(name: &str, text: &str) -> Arc<Catalog> {
        Arc::new(Catalog::from_csv_str(name, text).unwrap())
    }

    fn row(source: &str, target: &str, label: bool, fold: usize) -> FoldedPair {
        FoldedPair {
            pair: Pair::new(source, target, label),
            fold,
        }
    }

    #[test]
    fn asymmetric_join_reads_each_side_from_its_catalog() {
        let abt = catalog(
            "1_abt.csv",
            "subject_id,name,description,price\na1,Sony  BRAVIA,46in LCD,$1999\n",
        );
        let buy = catalog(
            "2_buy.csv",
            "subject_id,name,description,price\nb1,SONY KDL46,,\n",
        );
        let spec = JoinSpec::new(
            JoinSide::new(PairKey::Source, abt, ["name", "description", "price"]).unwrap(),
            JoinSide::new(PairKey::Target, buy, ["name", "description", "price"]).unwrap(),
        );
        assert!(!spec.is_symmetric());

        let examples = spec.join(&[row("a1", "b1", true, 3)]).unwrap();
        assert_eq!(
            examples,
            vec![JoinedExample {
                idx: 0,
                text_left: "sony bravia 46in lcd $1999".to_string(),
                text_right: "sony kdl46".to_string(),
                label: 1,
            }]
        );
    }

    #[test]
    fn symmetric_join_reindexes_and_keeps_order() {
        let computers = catalog(
            "1_computers_single_view.csv",
            "subject_id,title,brand\nc1,ThinkPad X1,Lenovo\nc2,MacBook Air,Apple\nc3,XPS 13,Dell\n",
        );
        let spec = JoinSpec::new(
            JoinSide::new(PairKey::Target, computers.clone(), ["title", "brand"]).unwrap(),
            JoinSide::new(PairKey::Source, computers, ["title", "brand"]).unwrap(),
        );
        assert!(spec.is_symmetric());

        let rows = [row("c1", "c2", false, 7), row("c3", "c3", true, 1)];
        let examples = spec.join(&rows).unwrap();
        assert_eq!(examples[0].idx, 0);
        assert_eq!(examples[0].text_left, "macbook air apple");
        assert_eq!(examples[0].text_right, "thinkpad x1 lenovo");
        assert_eq!(examples[0].label, 0);
        assert_eq!(examples[1].idx, 1);
        assert_eq!(examples[1].text_left, examples[1].text_right);
    }

    #[test]
    fn unmatched_ids_join_as_empty_text() {
        let left = catalog("left.csv", "subject_id,title\nx,Known\n");
        let right = catalog("right.csv", "subject_id,title\n");
        let spec = JoinSpec::new(
            JoinSide::new(PairKey::Source, left, ["title"]).unwrap(),
            JoinSide::new(PairKey::Target, right, ["title"]).unwrap(),
        );
        let examples = spec.join(&[row("x", "missing", false, 0)]).unwrap();
        assert_eq!(examples[0].text_left, "known");
        assert_eq!(examples[0].text_right, "");
    }

    #[test]
    fn duplicate_catalog_match_is_a_cardinality_violation() {
        let left = catalog("1_walmart.csv", "subject_id,title\n5,tv\n5,tv stand\n");
        let right = catalog("2_amazon.csv", "subject_id,title\n9,television\n");
        let spec = JoinSpec::new(
            JoinSide::new(PairKey::Source, left, ["title"]).unwrap(),
            JoinSide::new(PairKey::Target, right, ["title"]).unwrap(),
        );
        let err = spec.join(&[row("5", "9", true, 0)]).unwrap_err();
        assert!(matches!(
            err,
            PrepError::JoinCardinalityViolation { ref catalog, matches: 2, .. }
                if catalog == "1_walmart.csv"
        ));
    }

    #[test]
    fn unknown_field_is_rejected_when_binding() {
        let shoes = catalog("1_shoes_single_view.csv", "subject_id,title\n");
        let err = JoinSide::new(PairKey::Source, shoes, ["title", "specTableContent"]).unwrap_err();
        assert!(matches!(err, PrepError::Configuration(msg) if msg.contains("specTableContent")));
    }

    #[test]
    fn closures_act_as_joins() {
        let join = |rows: &[FoldedPair]| -> Result<Vec<JoinedExample>, PrepError> {
            Ok(rows
                .iter()
                .enumerate()
                .map(|(idx, row)| JoinedExample {
                    idx,
                    text_left: row.pair.source_id.clone(),
                    text_right: row.pair.target_id.clone(),
                    label: u8::from(row.label()),
                })
                .collect())
        };
        let examples = join.join(&[row("a", "b", true, 0)]).unwrap();
        assert_eq!(examples[0].text_left, "a");
    }
}
