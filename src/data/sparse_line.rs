//! Sparse data line builder
//!
//! A data line is the set of `(index, value)` pairs of one row, rendered as
//! `{i1 v1,i2 v2,...}` in strictly ascending index order. Empty values are
//! omitted; negative and duplicate indices are caller errors.

use std::collections::BTreeMap;

use crate::utils::FormatError;

/// Builder for one sparse data line
#[derive(Debug, Default)]
pub struct SparseLineWriter {
    entries: BTreeMap<usize, String>,
    /// High-water mark: one past the last positionally written index
    cursor: usize,
    generated: Option<String>,
}

impl SparseLineWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair at an explicit index. Empty values are silently skipped.
    pub fn add(&mut self, index: i64, value: &str) -> Result<(), FormatError> {
        if value.is_empty() {
            return Ok(());
        }
        if index < 0 {
            return Err(FormatError::NegativeIndex(index));
        }
        let index = index as usize;
        if self.entries.contains_key(&index) {
            return Err(FormatError::DuplicateIndex(index));
        }
        self.entries.insert(index, value.to_string());
        self.advance(index);
        Ok(())
    }

    /// Positional form: write at the running cursor and advance it
    pub fn push(&mut self, value: &str) -> Result<(), FormatError> {
        self.cursor += 1;
        self.add(self.cursor as i64 - 1, value)
    }

    /// Move the cursor forward to `index` if it is ahead
    pub fn advance(&mut self, index: usize) {
        if index > self.cursor {
            self.cursor = index;
        }
    }

    /// Current cursor position
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Render the line. The first call computes and caches the text;
    /// repeated calls return the same string.
    pub fn generate(&mut self) -> &str {
        if self.generated.is_none() {
            let body: Vec<String> = self
                .entries
                .iter()
                .map(|(index, value)| format!("{index} {value}"))
                .collect();
            self.generated = Some(format!("{{{}}}", body.join(",")));
        }
        self.generated.as_deref().unwrap_or_default()
    }
}
