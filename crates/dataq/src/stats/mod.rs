//! Statistical building blocks shared by the analyzers.
//!
//! Everything here works on plain `f64` slices so the analyzers decide how
//! nulls are dropped before a statistic is computed.

pub mod descriptive;
pub mod hypothesis;
pub mod isolation_forest;

pub use descriptive::{
    IqrBounds, iqr_bounds, mean, median, min_max, pearson, quantile_linear, sorted, std_dev,
    variance,
};
pub use hypothesis::{
    ChiSquareResult, KsResult, chi_square_contingency, ks_two_sample, population_stability_index,
    wasserstein_distance,
};
pub use isolation_forest::IsolationForest;
