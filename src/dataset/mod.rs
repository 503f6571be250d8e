//! The dataset: a named collection of rows over a shared schema, with ARFF
//! serialization in both directions.
//!
//! Rows are kept in an id-ordered map and shared as `Arc<DataRow>`; every
//! mutation goes through `&self` with interior mutability, so a dataset can
//! be used from multiple threads without external locking. Serialization
//! renders the header block (`@RELATION`, declarations, `@DATA`) followed by
//! one sparse line per row.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, warn};

use crate::data::DataRow;
use crate::normalization::Normalization;
use crate::schema::{ClassLabels, Schema, DATE_FIELD, ID_FIELD};
use crate::utils::{FormatError, Result, SchemaError, StateError};

/// Relation name used when none is given or parsed.
pub const DEFAULT_RELATION: &str = "DATA";

/// Synthetic row ids start above this offset so they never collide with
/// external document ids.
const ROW_ID_OFFSET: u64 = 100_000;

pub struct Dataset {
    name: String,
    schema: Arc<Schema>,
    rows: RwLock<BTreeMap<String, Arc<DataRow>>>,
    next_row_id: AtomicU64,
    normalization: RwLock<Option<Normalization>>,
}

impl Dataset {
    /// Open-schema dataset: unknown attribute names are registered as
    /// numeric on first use.
    pub fn simple(name: &str) -> Self {
        Self::over(Arc::new(Schema::new()), name)
    }

    /// Open-schema dataset with an enum-backed nominal class attribute.
    pub fn with_class_labels<L: ClassLabels>(name: &str) -> Result<Self> {
        let schema = Schema::new();
        schema.register_enum_class::<L>()?;
        Ok(Self::over(Arc::new(schema), name))
    }

    /// Dataset with a fixed set of numeric features and an enum-backed
    /// class attribute.
    pub fn with_features<L: ClassLabels>(name: &str, features: &[&str]) -> Result<Self> {
        let schema = Schema::new();
        for feature in features {
            schema.register_numeric(feature);
        }
        schema.register_enum_class::<L>()?;
        schema.set_create_on_demand(false);
        Ok(Self::over(Arc::new(schema), name))
    }

    /// Dataset over an existing schema. The schema is treated as fixed:
    /// on-demand attribute creation is switched off.
    pub fn with_schema(schema: Arc<Schema>, name: &str) -> Self {
        schema.set_create_on_demand(false);
        Self::over(schema, name)
    }

    fn over(schema: Arc<Schema>, name: &str) -> Self {
        Self {
            name: name.to_string(),
            schema,
            rows: RwLock::new(BTreeMap::new()),
            next_row_id: AtomicU64::new(ROW_ID_OFFSET),
            normalization: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn is_normalized(&self) -> bool {
        self.normalization.read().is_some()
    }

    /// Add a row under a fresh synthetic id.
    pub fn add_row(&self) -> Result<Arc<DataRow>> {
        let id = self.next_row_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.get_or_create_row(&id.to_string())
    }

    /// Row under the given id, created when absent.
    pub fn get_or_create_row(&self, id: &str) -> Result<Arc<DataRow>> {
        if self.is_normalized() {
            return Err(StateError::DatasetNormalized.into());
        }
        let mut rows = self.rows.write();
        if let Some(row) = rows.get(id) {
            return Ok(row.clone());
        }
        let row = Arc::new(DataRow::new(id, self.schema.clone())?);
        rows.insert(id.to_string(), row.clone());
        Ok(row)
    }

    pub fn row(&self, id: &str) -> Option<Arc<DataRow>> {
        self.rows.read().get(id).cloned()
    }

    /// Id-ordered snapshot of all rows.
    pub fn rows(&self) -> Vec<Arc<DataRow>> {
        self.rows.read().values().cloned().collect()
    }

    pub fn total_rows(&self) -> usize {
        self.rows.read().len()
    }

    /// Remove a row and its membership marks. Removing a missing id is a
    /// logged no-op.
    pub fn remove_row(&self, id: &str) {
        let removed = self.rows.write().remove(id);
        match removed {
            Some(row) => {
                for header in self.schema.headers() {
                    header.unregister_row(row.id());
                }
            }
            None => warn!(id, "row not found"),
        }
    }

    /// Drop all rows.
    pub fn clear(&self) {
        let mut rows = self.rows.write();
        for row in rows.values() {
            for header in self.schema.headers() {
                header.unregister_row(row.id());
            }
        }
        rows.clear();
    }

    /// Remove an attribute from the schema and from every row.
    pub fn remove_attribute(&self, name: &str) -> Result<()> {
        let header = self.schema.remove(name)?;
        debug!(attribute = header.name(), "removing attribute from rows");
        for row in self.rows() {
            row.remove_record(header.name());
        }
        Ok(())
    }

    /// Toggle occurrence-count rendering for numeric attributes.
    pub fn set_use_total(&self, enabled: bool) {
        self.schema.set_use_total(enabled);
    }

    /// Toggle sparse zero rendering for numeric attributes.
    pub fn set_sparse(&self, enabled: bool) {
        self.schema.set_sparse(enabled);
    }

    pub fn has_id(&self) -> bool {
        self.schema.lookup(ID_FIELD).is_some()
    }

    /// Enable the synthetic id attribute. Only possible while the dataset is
    /// empty; the field can not be disabled again.
    pub fn set_has_id(&self, enabled: bool) -> Result<()> {
        if !enabled {
            if self.has_id() {
                return Err(StateError::FieldCannotBeDisabled { field: "Id" }.into());
            }
            return Ok(());
        }
        if self.has_id() {
            return Ok(());
        }
        if self.total_rows() > 0 {
            return Err(StateError::DatasetNotEmpty { field: "Id" }.into());
        }
        self.schema.register_id_field();
        Ok(())
    }

    pub fn has_date(&self) -> bool {
        self.schema.lookup(DATE_FIELD).is_some()
    }

    /// Enable the synthetic date attribute. Same rules as [`set_has_id`].
    ///
    /// [`set_has_id`]: Dataset::set_has_id
    pub fn set_has_date(&self, enabled: bool) -> Result<()> {
        if !enabled {
            if self.has_date() {
                return Err(StateError::FieldCannotBeDisabled { field: "Date" }.into());
            }
            return Ok(());
        }
        if self.has_date() {
            return Ok(());
        }
        if self.total_rows() > 0 {
            return Err(StateError::DatasetNotEmpty { field: "Date" }.into());
        }
        self.schema.register_date_field();
        Ok(())
    }

    /// Scale every row's numeric values with the given strategy. A dataset
    /// can only be normalized once and accepts no new rows afterwards.
    pub fn normalize(&self, strategy: Normalization) -> Result<()> {
        {
            let mut state = self.normalization.write();
            if state.is_some() {
                return Err(StateError::AlreadyNormalized.into());
            }
            if matches!(strategy, Normalization::None) {
                return Ok(());
            }
            *state = Some(strategy);
        }
        for row in self.rows() {
            row.normalize(strategy)?;
        }
        Ok(())
    }

    /// Write the full ARFF document to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the header block and data lines in row-id order. Emission stops
    /// at the first row that renders empty.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<()> {
        write!(writer, "{self}")?;
        for row in self.rows() {
            let line = row.render()?;
            if line.is_empty() {
                break;
            }
            writeln!(writer, "{line}")?;
        }
        Ok(())
    }

    /// Load an ARFF document, reconstructing the schema from its
    /// declarations.
    pub fn load_simple(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_simple(BufReader::new(File::open(path)?))
    }

    pub fn read_simple(reader: impl BufRead) -> Result<Self> {
        Self::simple(DEFAULT_RELATION).read_into(reader)
    }

    /// Load an ARFF document whose class attribute is backed by the given
    /// label set. The file's class declaration is matched against it.
    pub fn load_with_labels<L: ClassLabels>(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_with_labels::<L>(BufReader::new(File::open(path)?))
    }

    pub fn read_with_labels<L: ClassLabels>(reader: impl BufRead) -> Result<Self> {
        Self::with_class_labels::<L>(DEFAULT_RELATION)?.read_into(reader)
    }

    fn read_into(mut self, reader: impl BufRead) -> Result<Self> {
        // the declaration block is the full schema; loading never invents
        // attributes
        self.schema.set_create_on_demand(false);
        let mut in_data = false;
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if in_data {
                self.parse_data_line(trimmed)?;
                continue;
            }
            let lowered = trimmed.to_lowercase();
            if lowered.starts_with("@relation") {
                self.name = relation_name(trimmed)?;
            } else if lowered.starts_with("@attribute") {
                self.schema.parse_declaration(trimmed)?;
            } else if lowered.starts_with("@data") {
                in_data = true;
            }
        }
        Ok(self)
    }

    /// Replay one sparse data line into a fresh row.
    fn parse_data_line(&self, line: &str) -> Result<()> {
        let body = line
            .trim_start_matches('{')
            .trim_end_matches('}')
            .trim();
        if body.is_empty() {
            return Ok(());
        }
        let row = self.add_row()?;
        for item in body.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let mut tokens = item.splitn(2, char::is_whitespace);
            let (index, value) = match (tokens.next(), tokens.next()) {
                (Some(index), Some(value)) => (index, value.trim()),
                _ => {
                    error!(line, "data tuple must hold an index and a value");
                    return Err(FormatError::MalformedDataLine {
                        line: line.to_string(),
                    }
                    .into());
                }
            };
            let index: usize = index.parse().map_err(|_| FormatError::MalformedDataLine {
                line: line.to_string(),
            })?;
            let header = self.schema.by_index(index)?;
            row.touch(&header);
            if let Some(parsed) = header.parse_value(value) {
                row.assign(&header, parsed)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@RELATION {}", self.name)?;
        for declaration in self.schema.declarations() {
            writeln!(f, "{declaration}")?;
        }
        writeln!(f, "@DATA")
    }
}

fn relation_name(line: &str) -> std::result::Result<String, SchemaError> {
    let mut parts = line.split_whitespace();
    parts.next();
    parts
        .next()
        .map(|name| name.to_string())
        .ok_or_else(|| SchemaError::MalformedRelation {
            line: line.to_string(),
        })
}
