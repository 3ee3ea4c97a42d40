//! Typed tabular data for thicket: attribute values, samples, class value
//! spaces and the in-memory dataset consumed by the tree, forest and
//! oversampling crates.

mod dataset;
mod error;
mod sample;
mod space;
mod value;

pub use dataset::{Dataset, Schema};
pub use error::DataError;
pub use sample::Sample;
pub use space::ValueSpace;
pub use value::{Attribute, AttributeKind, Value};
