//! Seeded train/test partitioning.

use cytotrace_core::{CytoError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Row indices of each partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition rows into train and test sets.
///
/// Without stratification the rows are shuffled once and the first
/// `ceil(n * test_ratio)` become the test set. With stratification each class
/// is shuffled and split separately (`round` per class), preserving the class
/// ratio. The result depends only on `labels.len()`, the labels (when
/// stratifying), `test_ratio`, and `seed`.
///
/// # Errors
///
/// Returns [`CytoError::Config`] if `test_ratio` is outside `(0, 1)` and
/// [`CytoError::Dataset`] if either partition would be empty.
pub fn train_test_split(
    labels: &[u8],
    test_ratio: f64,
    seed: u64,
    stratify: bool,
) -> Result<SplitIndices> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(CytoError::Config(format!(
            "test_ratio must be in (0, 1), got {test_ratio}"
        )));
    }
    let n = labels.len();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let split = if stratify {
        let mut class0: Vec<usize> = Vec::new();
        let mut class1: Vec<usize> = Vec::new();
        for (i, &l) in labels.iter().enumerate() {
            if l == 0 {
                class0.push(i);
            } else {
                class1.push(i);
            }
        }
        class0.shuffle(&mut rng);
        class1.shuffle(&mut rng);

        let test0 = (class0.len() as f64 * test_ratio).round() as usize;
        let test1 = (class1.len() as f64 * test_ratio).round() as usize;

        SplitIndices {
            test: class0[..test0]
                .iter()
                .chain(class1[..test1].iter())
                .copied()
                .collect(),
            train: class0[test0..]
                .iter()
                .chain(class1[test1..].iter())
                .copied()
                .collect(),
        }
    } else {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);
        let n_test = ((n as f64 * test_ratio).ceil() as usize).min(n);
        let train = indices.split_off(n_test);
        SplitIndices {
            train,
            test: indices,
        }
    };

    if split.train.is_empty() || split.test.is_empty() {
        return Err(CytoError::Dataset(format!(
            "{} rows cannot be split with test_ratio {} (train={}, test={})",
            n,
            test_ratio,
            split.train.len(),
            split.test.len()
        )));
    }

    tracing::debug!(
        train = split.train.len(),
        test = split.test.len(),
        stratify,
        seed,
        "Split dataset"
    );
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_partition(split: &SplitIndices, n: usize) -> bool {
        let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        all == (0..n).collect::<Vec<_>>()
    }

    #[test]
    fn test_split_sizes() {
        let labels = vec![0u8; 569];
        let split = train_test_split(&labels, 0.2, 42, false).unwrap();
        assert_eq!(split.test.len(), 114);
        assert_eq!(split.train.len(), 455);
        assert!(is_partition(&split, 569));
    }

    #[test]
    fn test_split_is_deterministic() {
        let labels: Vec<u8> = (0..100).map(|i| (i % 3 == 0) as u8).collect();
        let a = train_test_split(&labels, 0.2, 42, false).unwrap();
        let b = train_test_split(&labels, 0.2, 42, false).unwrap();
        let c = train_test_split(&labels, 0.2, 43, false).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_stratified_split_preserves_ratio() {
        // 80 benign (0), 20 malignant (1)
        let labels: Vec<u8> = (0..100).map(|i| (i >= 80) as u8).collect();
        let split = train_test_split(&labels, 0.2, 42, true).unwrap();
        let test_malignant = split.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(split.test.len(), 20);
        assert_eq!(test_malignant, 4);
        assert!(is_partition(&split, 100));
    }

    #[test]
    fn test_rejects_ratio_outside_unit_interval() {
        let labels = [0u8, 0, 1, 1];
        for stratify in [false, true] {
            for ratio in [1.5, 1.0, 0.0, -0.2, f64::NAN] {
                assert!(
                    matches!(
                        train_test_split(&labels, ratio, 42, stratify),
                        Err(CytoError::Config(_))
                    ),
                    "ratio {ratio} stratify {stratify}"
                );
            }
        }
    }

    #[test]
    fn test_stratified_high_ratio_stays_in_bounds() {
        let labels = [0u8, 0, 0, 1, 1];
        let split = train_test_split(&labels, 0.6, 42, true).unwrap();
        assert!(is_partition(&split, 5));
        assert_eq!(split.test.len(), 3);
    }

    #[test]
    fn test_rejects_degenerate_split() {
        assert!(train_test_split(&[0], 0.2, 42, false).is_err());
        assert!(train_test_split(&[], 0.2, 42, false).is_err());
    }
}
