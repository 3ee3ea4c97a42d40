//! File I/O for thicket: a delimited dataset reader, delimited record
//! writers for statistics and sample dumps, and JSON run summaries.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::ExperimentName;
pub use error::IoError;
pub use reader::DelimitedReader;
pub use writer::{DelimitedWriter, ResultWriter};
