//! Row-level data model: typed values, per-attribute records and the sparse
//! line writer used to render them.

pub mod record;
pub mod row;
pub mod sparse_line;

pub use record::{DataRecord, Value};
pub use row::DataRow;
pub use sparse_line::SparseLineWriter;
