//! Isolation forest for multivariate anomaly detection.
//!
//! Rows are isolated by random axis-aligned splits; anomalies need fewer
//! splits. With automatic contamination a row is anomalous when its score
//! `2^(-E[h(x)] / c(n))` exceeds 0.5.

use rand::prelude::*;
use rand::rngs::StdRng;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone)]
enum IsolationTree {
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<IsolationTree>,
        right: Box<IsolationTree>,
    },
    External {
        size: usize,
    },
}

impl IsolationTree {
    fn build(
        rows: &[Vec<f64>],
        indices: &[usize],
        height: usize,
        max_height: usize,
        rng: &mut StdRng,
    ) -> Self {
        let n_samples = indices.len();
        if height >= max_height || n_samples <= 1 {
            return IsolationTree::External { size: n_samples };
        }

        let n_features = rows[indices[0]].len();
        let feature = rng.gen_range(0..n_features);

        let (min_val, max_val) = indices.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), &i| (lo.min(rows[i][feature]), hi.max(rows[i][feature])),
        );
        if !min_val.is_finite() || !max_val.is_finite() || max_val - min_val < 1e-12 {
            return IsolationTree::External { size: n_samples };
        }

        // max - min overflows for values near ±f64::MAX; interpolate instead.
        let threshold = if (max_val - min_val).is_finite() {
            rng.gen_range(min_val..max_val)
        } else {
            let t: f64 = rng.r#gen();
            min_val * (1.0 - t) + max_val * t
        };
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| rows[i][feature] < threshold);

        if left.is_empty() || right.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        IsolationTree::Internal {
            feature,
            threshold,
            left: Box::new(Self::build(rows, &left, height + 1, max_height, rng)),
            right: Box::new(Self::build(rows, &right, height + 1, max_height, rng)),
        }
    }

    fn path_length(&self, sample: &[f64], depth: usize) -> f64 {
        match self {
            IsolationTree::External { size } => depth as f64 + average_path_length(*size),
            IsolationTree::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] < *threshold {
                    left.path_length(sample, depth + 1)
                } else {
                    right.path_length(sample, depth + 1)
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Seeded isolation forest with automatic contamination.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    n_estimators: usize,
    max_samples: usize,
    seed: u64,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            seed: 42,
        }
    }
}

impl IsolationForest {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Anomaly score per row, in `[0, 1]`; higher is more anomalous.
    ///
    /// Every row must have the same, non-zero number of features.
    pub fn score(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        let n = rows.len();
        if n == 0 || rows[0].is_empty() {
            return vec![0.0; n];
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let subsample = self.max_samples.min(n);
        let max_height = (subsample as f64).log2().ceil().max(1.0) as usize;
        let all: Vec<usize> = (0..n).collect();

        let trees: Vec<IsolationTree> = (0..self.n_estimators)
            .map(|_| {
                let indices: Vec<usize> =
                    all.choose_multiple(&mut rng, subsample).copied().collect();
                IsolationTree::build(rows, &indices, 0, max_height, &mut rng)
            })
            .collect();

        let c_n = average_path_length(subsample);
        rows.iter()
            .map(|row| {
                let mean_path = trees.iter().map(|t| t.path_length(row, 0)).sum::<f64>()
                    / trees.len() as f64;
                if c_n > 0.0 {
                    2f64.powf(-mean_path / c_n)
                } else {
                    0.5
                }
            })
            .collect()
    }

    /// Flags rows whose anomaly score exceeds 0.5.
    pub fn predict_outliers(&self, rows: &[Vec<f64>]) -> Vec<bool> {
        self.score(rows).into_iter().map(|s| s > 0.5).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_rows() -> Vec<Vec<f64>> {
        let mut rows: Vec<Vec<f64>> = (0..200)
            .map(|i| vec![(i % 10) as f64, ((i % 7) + 1) as f64])
            .collect();
        rows.push(vec![500.0, 500.0]);
        rows.push(vec![-300.0, -300.0]);
        rows
    }

    #[test]
    fn test_outliers_score_higher() {
        let rows = clustered_rows();
        let scores = IsolationForest::default().score(&rows);
        assert!(scores[200] > scores[0]);
        assert!(scores[201] > scores[0]);
    }

    #[test]
    fn test_predict_flags_extreme_points() {
        let rows = clustered_rows();
        let flags = IsolationForest::default().predict_outliers(&rows);
        assert!(flags[200]);
        assert!(flags[201]);
        assert_eq!(flags.len(), rows.len());
    }

    #[test]
    fn test_deterministic_for_seed() {
        let rows = clustered_rows();
        let a = IsolationForest::default().with_seed(7).score(&rows);
        let b = IsolationForest::default().with_seed(7).score(&rows);
        assert_eq!(a, b);
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.244).abs() < 0.01);
    }

    #[test]
    fn test_extreme_magnitudes_split() {
        let mut rows: Vec<Vec<f64>> = (0..50).map(|i| vec![(i % 5) as f64]).collect();
        rows.push(vec![1.5e308]);
        rows.push(vec![-1.5e308]);

        let forest = IsolationForest::default();
        let scores = forest.score(&rows);
        assert_eq!(scores.len(), rows.len());
        assert!(scores.iter().all(|s| s.is_finite()));
        assert!(scores[50] > scores[0]);
        assert_eq!(forest.predict_outliers(&rows).len(), rows.len());
    }

    #[test]
    fn test_infinite_feature_does_not_split() {
        let rows = vec![
            vec![1.0],
            vec![2.0],
            vec![f64::INFINITY],
            vec![f64::NEG_INFINITY],
        ];
        assert_eq!(IsolationForest::default().score(&rows).len(), 4);
    }

    #[test]
    fn test_empty_input() {
        assert!(IsolationForest::default().score(&[]).is_empty());
    }
}
