//! Error types for the dataset agent protocol layer.

mod driver;
mod publish;

pub use driver::*;
pub use publish::*;
