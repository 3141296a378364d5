use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::splits::ALL_SPLITS;
use crate::data::FoldedPair;
use crate::errors::PrepError;
use crate::folds::{FoldAssignment, rows_in_fold};
use crate::source::join::PairJoin;
use crate::transport::tsv::write_examples;
use crate::types::FoldIndex;

/// Logical dataset partitions emitted for each rotation window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitLabel {
    /// Training split.
    Train,
    /// Validation split (written as `dev.tsv`).
    Validation,
    /// Test split.
    Test,
}

impl SplitLabel {
    /// File name of this split inside a window directory.
    pub fn file_name(self) -> &'static str {
        match self {
            SplitLabel::Train => "train.tsv",
            SplitLabel::Validation => "dev.tsv",
            SplitLabel::Test => "test.tsv",
        }
    }
}

/// One (imbalance ratio, rotation) combination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RotationWindow {
    /// Negative-per-positive ratio level in `1..=N`.
    pub ratio: usize,
    /// Rotation index in `0..fold_count`; equals the test fold.
    pub rotation: usize,
    /// Fold written to `test.tsv`.
    pub test_fold: FoldIndex,
    /// `(rotation - 1) mod fold_count`.
    pub validation_fold: FoldIndex,
}

impl RotationWindow {
    /// Window for `ratio` and `rotation` over `fold_count` folds.
    ///
    /// Needs at least two folds and `rotation < fold_count`.
    pub fn new(ratio: usize, rotation: usize, fold_count: usize) -> Result<Self, PrepError> {
        check_fold_count(fold_count)?;
        if rotation >= fold_count {
            return Err(PrepError::Configuration(format!(
                "rotation {rotation} out of range for {fold_count} folds"
            )));
        }
        Ok(Self::at(ratio, rotation, fold_count))
    }

    fn at(ratio: usize, rotation: usize, fold_count: usize) -> Self {
        Self {
            ratio,
            rotation,
            test_fold: rotation,
            validation_fold: (rotation + fold_count - 1) % fold_count,
        }
    }

    /// Whether rows of `fold` are held out of training in this window.
    pub fn holds_out(&self, fold: FoldIndex) -> bool {
        fold == self.test_fold || fold == self.validation_fold
    }
}

/// Every window for ratios `1..=ratio_cap` and rotations `0..fold_count`, ratio-major.
pub fn windows(ratio_cap: usize, fold_count: usize) -> impl Iterator<Item = RotationWindow> {
    (1..=ratio_cap).flat_map(move |ratio| {
        (0..fold_count).map(move |rotation| RotationWindow::at(ratio, rotation, fold_count))
    })
}

fn check_fold_count(fold_count: usize) -> Result<(), PrepError> {
    if fold_count < 2 {
        return Err(PrepError::Configuration(format!(
            "fold_count must be at least 2 (got {fold_count})"
        )));
    }
    Ok(())
}

/// Length of the table prefix used for training at `ratio`.
///
/// `(total / (ratio_cap + 1)) * (ratio + 1)`, clamped to `total`.
pub fn train_prefix_len(total: usize, ratio_cap: usize, ratio: usize) -> usize {
    (total / (ratio_cap + 1))
        .saturating_mul(ratio + 1)
        .min(total)
}

/// Training rows: a prefix of the table minus held-out folds, order preserved.
pub fn train_rows(
    pairs: &[FoldedPair],
    ratio_cap: usize,
    window: &RotationWindow,
) -> Vec<FoldedPair> {
    let prefix = train_prefix_len(pairs.len(), ratio_cap, window.ratio);
    pairs[..prefix]
        .iter()
        .filter(|row| !window.holds_out(row.fold))
        .cloned()
        .collect()
}

/// Validation rows: the full validation fold.
pub fn validation_rows(pairs: &[FoldedPair], window: &RotationWindow) -> Vec<FoldedPair> {
    rows_in_fold(pairs, window.validation_fold).cloned().collect()
}

/// Test rows: the full test fold.
pub fn test_rows(pairs: &[FoldedPair], window: &RotationWindow) -> Vec<FoldedPair> {
    rows_in_fold(pairs, window.test_fold).cloned().collect()
}

/// Rows of `label` for `window`.
pub fn split_rows(
    assignment: &FoldAssignment,
    window: &RotationWindow,
    label: SplitLabel,
) -> Vec<FoldedPair> {
    match label {
        SplitLabel::Train => train_rows(&assignment.pairs, assignment.ratio_cap, window),
        SplitLabel::Validation => validation_rows(&assignment.pairs, window),
        SplitLabel::Test => test_rows(&assignment.pairs, window),
    }
}

/// Row counts written for one window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowSummary {
    /// The window these counts belong to.
    pub window: RotationWindow,
    /// Directory holding the three split files.
    pub dir: PathBuf,
    /// Rows in `train.tsv`.
    pub train: usize,
    /// Rows in `dev.tsv`.
    pub validation: usize,
    /// Rows in `test.tsv`.
    pub test: usize,
}

/// Result of a full `emit_splits` run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmitSummary {
    /// One entry per window, ratio-major.
    pub windows: Vec<WindowSummary>,
}

impl EmitSummary {
    /// Three files per window.
    pub fn files_written(&self) -> usize {
        self.windows.len() * ALL_SPLITS.len()
    }
}

/// Join and write `train.tsv`, `dev.tsv`, and `test.tsv` for every window.
///
/// Fails on the first error; directories from earlier windows are left as written.
pub fn emit_splits<J, D>(
    assignment: &FoldAssignment,
    fold_count: usize,
    join: &J,
    output_dir_for: D,
) -> Result<EmitSummary, PrepError>
where
    J: PairJoin + ?Sized,
    D: Fn(usize, usize) -> PathBuf,
{
    check_fold_count(fold_count)?;
    let mut summary = EmitSummary::default();
    for window in windows(assignment.ratio_cap, fold_count) {
        let dir = output_dir_for(window.ratio, window.rotation);
        fs::create_dir_all(&dir)?;
        let mut counts = [0usize; 3];
        for (slot, label) in ALL_SPLITS.into_iter().enumerate() {
            let rows = split_rows(assignment, &window, label);
            counts[slot] = write_split(&dir, label, &rows, join)?;
        }
        debug!(
            ratio = window.ratio,
            rotation = window.rotation,
            train = counts[0],
            validation = counts[1],
            test = counts[2],
            dir = %dir.display(),
            "wrote rotation window"
        );
        summary.windows.push(WindowSummary {
            window,
            dir,
            train: counts[0],
            validation: counts[1],
            test: counts[2],
        });
    }
    info!(
        windows = summary.windows.len(),
        files = summary.files_written(),
        "emitted split files"
    );
    Ok(summary)
}

fn write_split<J: PairJoin + ?Sized>(
    dir: &Path,
    label: SplitLabel,
    rows: &[FoldedPair],
    join: &J,
) -> Result<usize, PrepError> {
    let examples = join.join(rows)?;
    write_examples(dir.join(label.file_name()), &examples)?;
    Ok(examples.len())
}
