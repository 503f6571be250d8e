//! Utility modules

pub mod error;

pub use error::{ArffError, FormatError, Result, SchemaError, StateError, TypeMismatchError};
