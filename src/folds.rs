//! Stratified, seeded fold assignment.
//!
//! Positives and negatives are shuffled independently with the same seed,
//! negatives are truncated to `N * positives`, and each class is dealt into
//! folds by position. The resulting row order is load-bearing: rotation
//! windows take prefixes of it to control the class ratio.

use rand::seq::SliceRandom;
use tracing::debug;

use crate::config::PartitionConfig;
use crate::data::{FoldedPair, Pair};
use crate::errors::PrepError;
use crate::types::{DatasetKey, FoldIndex};

/// splitmix64 stream; seeded shuffles are reproducible on every platform.
#[derive(Debug, Clone)]
pub(crate) struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64_internal(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(0x9E3779B97F4A7C15);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

impl rand::RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64_internal() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u64_internal()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut offset = 0;
        while offset < dest.len() {
            let bytes = self.next_u64_internal().to_le_bytes();
            let copy_len = (dest.len() - offset).min(bytes.len());
            dest[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
            offset += copy_len;
        }
    }
}

/// Fold-annotated pair table plus the imbalance bound it was built with.
#[derive(Clone, Debug, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub struct FoldAssignment {
    /// Positives (shuffled) followed by retained negatives (shuffled).
    pub pairs: Vec<FoldedPair>,
    /// `N`: the largest negative-per-positive ratio that can be sampled.
    pub ratio_cap: usize,
    /// Number of positive pairs.
    pub positives: usize,
    /// Negatives kept after applying the ratio cap.
    pub negatives_retained: usize,
    /// Negatives dropped by truncation to `N * positives`.
    pub negatives_dropped: usize,
}

impl FoldAssignment {
    /// Total rows in the assignment.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no rows were assigned.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Per-class row counts for each fold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoldSizes {
    /// Positive rows per fold.
    pub positives: Vec<usize>,
    /// Negative rows per fold.
    pub negatives: Vec<usize>,
}

/// `min(negatives / positives, cap)`; zero positives is a degenerate dataset.
pub fn ratio_cap(
    dataset: &str,
    positives: usize,
    negatives: usize,
    cap: usize,
) -> Result<usize, PrepError> {
    if positives == 0 {
        return Err(PrepError::DegenerateDataset {
            dataset: DatasetKey::from(dataset),
        });
    }
    Ok((negatives / positives).min(cap))
}

/// Assign folds to `pairs` for `dataset` (the name only labels errors and logs).
pub fn assign_folds(
    dataset: &str,
    pairs: Vec<Pair>,
    config: &PartitionConfig,
) -> Result<FoldAssignment, PrepError> {
    let config = config.validated()?;
    let (mut positives, mut negatives): (Vec<Pair>, Vec<Pair>) =
        pairs.into_iter().partition(|pair| pair.label);
    let n = ratio_cap(
        dataset,
        positives.len(),
        negatives.len(),
        config.neg_per_pos_cap,
    )?;

    positives.shuffle(&mut DeterministicRng::new(config.seed));
    negatives.shuffle(&mut DeterministicRng::new(config.seed));

    let keep = n * positives.len();
    let negatives_dropped = negatives.len() - keep;
    negatives.truncate(keep);

    let positives_len = positives.len();
    let negatives_retained = negatives.len();
    let mut folded = Vec::with_capacity(positives_len + negatives_retained);
    deal_into_folds(positives, config.fold_count, &mut folded);
    deal_into_folds(negatives, config.fold_count, &mut folded);

    debug!(
        dataset,
        positives = positives_len,
        negatives_retained,
        negatives_dropped,
        ratio_cap = n,
        "assigned folds"
    );

    Ok(FoldAssignment {
        pairs: folded,
        ratio_cap: n,
        positives: positives_len,
        negatives_retained,
        negatives_dropped,
    })
}

fn deal_into_folds(class: Vec<Pair>, fold_count: usize, out: &mut Vec<FoldedPair>) {
    out.extend(
        class
            .into_iter()
            .enumerate()
            .map(|(position, pair)| FoldedPair {
                pair,
                fold: position % fold_count,
            }),
    );
}

/// Count rows per fold, separately for each class.
pub fn fold_sizes(pairs: &[FoldedPair], fold_count: usize) -> FoldSizes {
    let mut sizes = FoldSizes {
        positives: vec![0; fold_count],
        negatives: vec![0; fold_count],
    };
    for row in pairs {
        let bucket = if row.label() {
            &mut sizes.positives
        } else {
            &mut sizes.negatives
        };
        if let Some(slot) = bucket.get_mut(row.fold) {
            *slot += 1;
        }
    }
    sizes
}

/// Rows whose fold is `fold`, in table order.
pub fn rows_in_fold(pairs: &[FoldedPair], fold: FoldIndex) -> impl Iterator<Item = &FoldedPair> {
    pairs.iter().filter(move |row| row.fold == fold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn build_pairs(positives: usize, negatives: usize) -> Vec<Pair> {
        (0..positives)
            .map(|idx| Pair::new(format!("s{idx}"), format!("t{idx}"), true))
            .chain(
                (0..negatives)
                    .map(|idx| Pair::new(format!("s{idx}"), format!("n{idx}"), false)),
            )
            .collect()
    }

    #[test]
    fn benchmark_scenario_caps_ratio_and_truncates_negatives() {
        let assignment =
            assign_folds("scenario", build_pairs(100, 1000), &PartitionConfig::default())
                .unwrap();
        assert_eq!(assignment.ratio_cap, 5);
        assert_eq!(assignment.positives, 100);
        assert_eq!(assignment.negatives_retained, 500);
        assert_eq!(assignment.negatives_dropped, 500);
        assert_eq!(assignment.len(), 600);

        let sizes = fold_sizes(&assignment.pairs, 10);
        assert!(sizes.positives.iter().all(|&count| count == 10));
        assert!(sizes.negatives.iter().all(|&count| count == 50));
    }

    #[test]
    fn ratio_below_cap_uses_floor() {
        let assignment =
            assign_folds("floor", build_pairs(10, 29), &PartitionConfig::default()).unwrap();
        assert_eq!(assignment.ratio_cap, 2);
        assert_eq!(assignment.negatives_retained, 20);
        assert_eq!(assignment.negatives_dropped, 9);
    }

    #[test]
    fn fewer_negatives_than_positives_keeps_only_positives() {
        let assignment =
            assign_folds("sparse", build_pairs(10, 4), &PartitionConfig::default()).unwrap();
        assert_eq!(assignment.ratio_cap, 0);
        assert_eq!(assignment.negatives_retained, 0);
        assert!(assignment.pairs.iter().all(FoldedPair::label));
    }

    #[test]
    fn zero_positives_is_degenerate() {
        let err = assign_folds("empty", build_pairs(0, 50), &PartitionConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PrepError::DegenerateDataset { ref dataset } if dataset == "empty"
        ));
    }

    #[test]
    fn positives_precede_negatives() {
        let assignment =
            assign_folds("order", build_pairs(20, 60), &PartitionConfig::default()).unwrap();
        let first_negative = assignment
            .pairs
            .iter()
            .position(|row| !row.label())
            .unwrap();
        assert_eq!(first_negative, 20);
        assert!(assignment.pairs[first_negative..].iter().all(|row| !row.label()));
    }

    #[test]
    fn folds_follow_position_within_class() {
        let assignment =
            assign_folds("modulo", build_pairs(13, 26), &PartitionConfig::default()).unwrap();
        for (position, row) in assignment.pairs[..13].iter().enumerate() {
            assert_eq!(row.fold, position % 10);
        }
        for (position, row) in assignment.pairs[13..].iter().enumerate() {
            assert_eq!(row.fold, position % 10);
        }
    }

    #[test]
    fn shuffle_actually_permutes_and_depends_on_seed() {
        let pairs = build_pairs(50, 100);
        let seeded_zero = assign_folds("seed", pairs.clone(), &PartitionConfig::default()).unwrap();
        let seeded_one = assign_folds(
            "seed",
            pairs.clone(),
            &PartitionConfig::default().with_seed(1),
        )
        .unwrap();
        let input_positive_order: Vec<&Pair> = pairs.iter().filter(|pair| pair.label).collect();
        let shuffled: Vec<&Pair> = seeded_zero.pairs[..50].iter().map(|row| &row.pair).collect();
        assert_ne!(shuffled, input_positive_order);
        assert_ne!(seeded_zero.pairs, seeded_one.pairs);
    }

    #[test]
    fn deterministic_rng_stream_is_stable() {
        use rand::RngCore;
        let mut rng = DeterministicRng::new(0);
        assert_eq!(rng.next_u64(), 0xE220_A839_7B1D_CDAF);
    }

    proptest! {
        #[test]
        fn assignment_is_deterministic_and_balanced(
            positives in 1usize..80,
            negatives in 0usize..400,
            fold_count in 2usize..12,
            seed in any::<u64>(),
        ) {
            let config = PartitionConfig::default()
                .with_fold_count(fold_count)
                .with_seed(seed);
            let first = assign_folds("prop", build_pairs(positives, negatives), &config).unwrap();
            let second = assign_folds("prop", build_pairs(positives, negatives), &config).unwrap();
            prop_assert_eq!(&first, &second);

            let n = (negatives / positives).min(config.neg_per_pos_cap);
            prop_assert_eq!(first.ratio_cap, n);
            prop_assert_eq!(first.negatives_retained, n * positives);
            prop_assert!(first.pairs.iter().all(|row| row.fold < fold_count));

            let sizes = fold_sizes(&first.pairs, fold_count);
            for class in [&sizes.positives, &sizes.negatives] {
                let max = class.iter().max().copied().unwrap_or(0);
                let min = class.iter().min().copied().unwrap_or(0);
                prop_assert!(max - min <= 1);
            }
        }
    }
}
