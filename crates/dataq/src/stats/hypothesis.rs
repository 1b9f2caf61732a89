//! Distribution comparisons and independence tests.

use super::descriptive::sorted;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::{BTreeSet, HashMap};

/// Outcome of a chi-square test of independence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiSquareResult {
    pub statistic: f64,
    pub p_value: f64,
    pub dof: usize,
    /// Total number of observations in the table.
    pub n: f64,
    /// `min(rows, cols)` of the table.
    pub min_dim: usize,
}

impl ChiSquareResult {
    /// Cramér's V effect size; `None` for a degenerate table.
    pub fn cramers_v(&self) -> Option<f64> {
        let denom = self.n * (self.min_dim as f64 - 1.0);
        if denom <= 0.0 {
            return None;
        }
        Some((self.statistic / denom).sqrt())
    }
}

/// Chi-square test of independence on an observed contingency table.
///
/// Tables with one degree of freedom use Yates' continuity correction.
/// Returns `None` when any row or column sums to zero (expected
/// frequencies would be zero) or the table is ragged/empty.
pub fn chi_square_contingency(table: &[Vec<f64>]) -> Option<ChiSquareResult> {
    let rows = table.len();
    let cols = table.first()?.len();
    if cols == 0 || table.iter().any(|r| r.len() != cols) {
        return None;
    }

    let row_sums: Vec<f64> = table.iter().map(|r| r.iter().sum()).collect();
    let col_sums: Vec<f64> = (0..cols)
        .map(|j| table.iter().map(|r| r[j]).sum())
        .collect();
    let n: f64 = row_sums.iter().sum();
    if n <= 0.0 || row_sums.iter().any(|&s| s == 0.0) || col_sums.iter().any(|&s| s == 0.0) {
        return None;
    }

    let dof = (rows - 1) * (cols - 1);
    let min_dim = rows.min(cols);
    if dof == 0 {
        return Some(ChiSquareResult {
            statistic: 0.0,
            p_value: 1.0,
            dof,
            n,
            min_dim,
        });
    }

    let mut statistic = 0.0;
    for (i, row) in table.iter().enumerate() {
        for (j, &observed) in row.iter().enumerate() {
            let expected = row_sums[i] * col_sums[j] / n;
            let mut diff = observed - expected;
            if dof == 1 {
                diff = diff.signum() * (diff.abs() - 0.5).max(0.0);
            }
            statistic += diff * diff / expected;
        }
    }

    let p_value = ChiSquared::new(dof as f64).ok()?.sf(statistic);
    Some(ChiSquareResult {
        statistic,
        p_value,
        dof,
        n,
        min_dim,
    })
}

/// Two-sample Kolmogorov–Smirnov result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// Two-sample Kolmogorov–Smirnov test.
///
/// The p-value uses the asymptotic Kolmogorov distribution with Stephens'
/// small-sample correction of the effective sample size.
pub fn ks_two_sample(a: &[f64], b: &[f64]) -> Option<KsResult> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let a = sorted(a);
    let b = sorted(b);
    let (n1, n2) = (a.len() as f64, b.len() as f64);

    let mut statistic: f64 = 0.0;
    for &x in a.iter().chain(b.iter()) {
        let fa = a.partition_point(|&v| v <= x) as f64 / n1;
        let fb = b.partition_point(|&v| v <= x) as f64 / n2;
        statistic = statistic.max((fa - fb).abs());
    }

    let en = (n1 * n2 / (n1 + n2)).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * statistic;
    Some(KsResult {
        statistic,
        p_value: kolmogorov_survival(lambda),
    })
}

/// `P(K > lambda)` for the Kolmogorov distribution.
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda < 1e-3 {
        return 1.0;
    }
    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut previous: f64 = 0.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = fac * (a2 * jf * jf).exp();
        sum += term;
        if term.abs() <= 0.001 * previous || term.abs() <= 1e-8 * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        previous = term.abs();
    }
    1.0
}

/// First Wasserstein (earth mover's) distance between two 1-D samples.
pub fn wasserstein_distance(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let a = sorted(a);
    let b = sorted(b);
    let mut all: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    all.sort_by(f64::total_cmp);

    let (na, nb) = (a.len() as f64, b.len() as f64);
    let mut distance = 0.0;
    for window in all.windows(2) {
        let (x, next) = (window[0], window[1]);
        let dx = next - x;
        if dx == 0.0 {
            continue;
        }
        let fa = a.partition_point(|&v| v <= x) as f64 / na;
        let fb = b.partition_point(|&v| v <= x) as f64 / nb;
        distance += (fa - fb).abs() * dx;
    }
    Some(distance)
}

const PSI_SMOOTHING: f64 = 0.0001;

/// Population stability index between two categorical samples.
///
/// Frequencies are normalized per side and smoothed additively so a category
/// missing from one side never produces `ln(0)`.
pub fn population_stability_index<'a>(
    old: impl IntoIterator<Item = &'a str>,
    new: impl IntoIterator<Item = &'a str>,
) -> f64 {
    let old_freq = normalized_frequencies(old);
    let new_freq = normalized_frequencies(new);

    let categories: BTreeSet<&str> = old_freq.keys().chain(new_freq.keys()).copied().collect();
    categories
        .into_iter()
        .map(|cat| {
            let o = old_freq.get(cat).copied().unwrap_or(0.0) + PSI_SMOOTHING;
            let n = new_freq.get(cat).copied().unwrap_or(0.0) + PSI_SMOOTHING;
            (n - o) * (n / o).ln()
        })
        .sum()
}

fn normalized_frequencies<'a>(values: impl IntoIterator<Item = &'a str>) -> HashMap<&'a str, f64> {
    let mut counts: HashMap<&str, f64> = HashMap::new();
    let mut total = 0.0;
    for v in values {
        *counts.entry(v).or_insert(0.0) += 1.0;
        total += 1.0;
    }
    if total > 0.0 {
        for c in counts.values_mut() {
            *c /= total;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chi_square_independent_table() {
        let table = vec![vec![10.0, 10.0], vec![10.0, 10.0]];
        let result = chi_square_contingency(&table).unwrap();
        assert_eq!(result.dof, 1);
        assert_eq!(result.statistic, 0.0);
        assert!((result.p_value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_chi_square_yates_correction() {
        // Expected 25 in every cell; |O-E| = 15 becomes 14.5 after correction.
        let table = vec![vec![40.0, 10.0], vec![10.0, 40.0]];
        let result = chi_square_contingency(&table).unwrap();
        let expected = 4.0 * 14.5f64.powi(2) / 25.0;
        assert!((result.statistic - expected).abs() < 1e-9);
        assert!(result.p_value < 0.001);
        let v = result.cramers_v().unwrap();
        assert!((v - (expected / 100.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_chi_square_larger_table_uncorrected() {
        let table = vec![
            vec![30.0, 0.0, 0.0],
            vec![0.0, 30.0, 0.0],
            vec![0.0, 0.0, 30.0],
        ];
        let result = chi_square_contingency(&table).unwrap();
        assert_eq!(result.dof, 4);
        assert!((result.statistic - 180.0).abs() < 1e-9);
        assert!((result.cramers_v().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_chi_square_degenerate() {
        assert!(chi_square_contingency(&[vec![5.0, 0.0], vec![3.0, 0.0]]).is_none());
        assert!(chi_square_contingency(&[]).is_none());
        let single_row = chi_square_contingency(&[vec![5.0, 3.0]]).unwrap();
        assert_eq!(single_row.p_value, 1.0);
    }

    #[test]
    fn test_ks_identical_samples() {
        let a: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let result = ks_two_sample(&a, &a).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_ks_shifted_samples() {
        let a: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..100).map(|i| i as f64 + 80.0).collect();
        let result = ks_two_sample(&a, &b).unwrap();
        assert!((result.statistic - 0.8).abs() < 1e-12);
        assert!(result.p_value < 0.001);
    }

    #[test]
    fn test_wasserstein() {
        assert_eq!(wasserstein_distance(&[0.0, 1.0, 3.0], &[0.0, 1.0, 3.0]), Some(0.0));
        let d = wasserstein_distance(&[0.0, 1.0, 2.0], &[5.0, 6.0, 7.0]).unwrap();
        assert!((d - 5.0).abs() < 1e-12);
        assert_eq!(wasserstein_distance(&[], &[1.0]), None);
    }

    #[test]
    fn test_psi_identical_is_zero() {
        let values = ["a", "b", "b", "c"];
        let psi = population_stability_index(values, values);
        assert!(psi.abs() < 1e-12);
    }

    #[test]
    fn test_psi_detects_shift() {
        let old = ["a"; 90].into_iter().chain(["b"; 10]);
        let new = ["a"; 10].into_iter().chain(["b"; 90]);
        assert!(population_stability_index(old, new) > 0.2);
    }
}
