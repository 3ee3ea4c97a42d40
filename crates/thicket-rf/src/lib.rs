//! Tree ensembles for tabular classification.
//!
//! Provides a Gini gain engine, CART decision trees, a bootstrap-aggregated
//! Random Forest with out-of-bag evaluation, a Cascaded Random Forest of
//! weighted stages, confusion-matrix based evaluation, model files and
//! stratified cross-validation.

mod arena;
mod bag;
mod cascade;
mod config;
mod confusion;
mod error;
mod eval;
mod forest;
mod gini;
mod node;
mod oob;
mod predict;
mod result;
mod serialize;
mod split;
mod stats;
mod tree;

pub use arena::SampleId;
pub use bag::{BagRecord, bag_size};
pub use cascade::{CascadeConfig, CascadeResult, CascadeStage, CascadedForest, StageReport};
pub use config::{MAX_PERCENT_BOOT, OobMode, RandomForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix, PredictionGroups, group_index_predictions};
pub use error::RfError;
pub use eval::{CrossValidation, CrossValidationResult};
pub use forest::RandomForest;
pub use gini::{GiniGainEngine, GiniResult, MAX_EXHAUSTIVE_CATEGORIES, SplitCandidate, impurity};
pub use node::{AttributeIndex, Impurity, Node, NodeIndex, SplitPredicate};
pub use oob::{OobReport, OobSummary};
pub use predict::SetPrediction;
pub use result::{RandomForestResult, TrainingMetadata};
pub use stats::{BinaryCounts, Stat, auc};
pub use tree::{DecisionTree, DecisionTreeConfig};
