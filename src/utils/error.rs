//! Error types for arff-dataset

use std::io;
use thiserror::Error;

/// Top-level library error
#[derive(Error, Debug)]
pub enum ArffError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Type mismatch: {0}")]
    TypeMismatch(#[from] TypeMismatchError),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Schema structure and declaration errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Class attribute is already registered")]
    ClassAlreadyRegistered,

    #[error("No class attribute is defined")]
    NoClassAttribute,

    #[error("Unknown attribute: {name}")]
    UnknownAttribute { name: String },

    #[error("Attribute index {index} out of range (total {total})")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("Malformed attribute declaration: {line}")]
    MalformedDeclaration { line: String },

    #[error("Duplicate attribute declaration: {line}")]
    DuplicateDeclaration { line: String },

    #[error("Malformed relation line: {line}")]
    MalformedRelation { line: String },
}

/// Value does not satisfy the attribute's type contract
#[derive(Error, Debug)]
#[error("{value} is not supported by {attribute}")]
pub struct TypeMismatchError {
    pub attribute: String,
    pub value: String,
}

/// Sparse data line errors
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Negative sparse index: {0}")]
    NegativeIndex(i64),

    #[error("Sparse index is already added: {0}")]
    DuplicateIndex(usize),

    #[error("Can't process line: {line}")]
    MalformedDataLine { line: String },
}

/// Invalid dataset state transitions
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Data is already normalized")]
    AlreadyNormalized,

    #[error("Can't add rows to a normalized dataset")]
    DatasetNormalized,

    #[error("{field} field can only be set on an empty dataset")]
    DatasetNotEmpty { field: &'static str },

    #[error("{field} field can not be disabled")]
    FieldCannotBeDisabled { field: &'static str },

    #[error("{field} field is not enabled on the dataset")]
    FieldNotEnabled { field: &'static str },
}

pub type Result<T> = std::result::Result<T, ArffError>;
