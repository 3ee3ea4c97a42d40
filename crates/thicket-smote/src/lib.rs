//! Minority-class oversampling for imbalanced datasets.
//!
//! [`KnnEngine`] is a brute-force k-nearest-neighbour search over dataset
//! rows. [`SmoteConfig::smote`] interpolates synthetic minority rows between
//! minority neighbours; [`SmoteConfig::lnsmote`] bounds each interpolation by
//! the safe levels of its endpoints and reports rows that cannot be safely
//! oversampled as outliers.

mod config;
mod distance;
mod error;
mod knn;
mod lnsmote;
mod result;
mod smote;

pub use config::SmoteConfig;
pub use distance::{Distance, DistanceMetric};
pub use error::SmoteError;
pub use knn::{KnnEngine, Neighbor};
pub use result::OversampleResult;
