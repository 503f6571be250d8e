//! arff-dataset library
//!
//! In-memory, schema-driven tabular store with sparse ARFF serialization.
//! Attributes are registered in an ordered schema, rows hold sparse
//! per-attribute records, and datasets round-trip through the ARFF text
//! format.

pub mod data;
pub mod dataset;
pub mod normalization;
pub mod schema;
pub mod utils;

pub use data::{DataRecord, DataRow, Value};
pub use dataset::Dataset;
pub use normalization::Normalization;
pub use schema::{ClassLabels, Header, HeaderKind, Schema};
pub use utils::{ArffError, Result};
