//! Attribute schema: headers, the ordered registry and class labels

pub mod header;
pub mod labels;
pub mod registry;

pub use header::{Header, HeaderKind, DATE_TAG, DEFAULT_DATE_FORMAT, NUMERIC_TAG, STRING_TAG};
pub use labels::ClassLabels;
pub use registry::{is_reserved, regular_name, Schema, CLASS_ATTRIBUTE, DATE_FIELD, ID_FIELD};
