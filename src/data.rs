use serde::{Deserialize, Serialize};

pub use crate::types::{FoldIndex, RecordId};

/// Labelled candidate pair read from a dataset's pair table.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct Pair {
    /// Id of the record in the source-side catalog.
    pub source_id: RecordId,
    /// Id of the record in the target-side catalog.
    pub target_id: RecordId,
    /// `true` when both records describe the same entity.
    pub label: bool,
}

impl Pair {
    /// Build a pair from its ids and label.
    pub fn new(source_id: impl Into<RecordId>, target_id: impl Into<RecordId>, label: bool) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            label,
        }
    }
}

/// Pair annotated with its fold.
///
/// Tables of folded pairs keep the stratified shuffle order: every positive
/// first, then the retained negatives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode)]
pub struct FoldedPair {
    /// The original pair.
    pub pair: Pair,
    /// Fold the pair was dealt into.
    pub fold: FoldIndex,
}

impl FoldedPair {
    /// Match label of the underlying pair.
    pub fn label(&self) -> bool {
        self.pair.label
    }
}

/// One model-ready row of a `train`/`dev`/`test` file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedExample {
    /// Fresh 0-based row index; not stable across different filters.
    pub idx: usize,
    /// Normalized text of the left record.
    pub text_left: String,
    /// Normalized text of the right record.
    pub text_right: String,
    /// `1` for a match, `0` otherwise.
    pub label: u8,
}
