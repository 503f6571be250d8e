//! A single row of the dataset.
//!
//! A row keeps one [`DataRecord`] per attribute it has touched, keyed by the
//! attribute name. Records are created lazily through [`DataRow::add_record`]
//! and rendered in schema order as a sparse line. The class record lives in
//! its own slot so it can always be emitted as the final field.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;

use crate::normalization::Normalization;
use crate::schema::{regular_name, Header, Schema, DATE_FIELD, ID_FIELD};
use crate::utils::{ArffError, Result, SchemaError, StateError};

use super::record::{DataRecord, Value};
use super::sparse_line::SparseLineWriter;

pub struct DataRow {
    id: String,
    schema: Arc<Schema>,
    records: RwLock<HashMap<String, DataRecord>>,
    class: RwLock<Option<DataRecord>>,
}

impl DataRow {
    pub(crate) fn new(id: &str, schema: Arc<Schema>) -> Result<Self> {
        let class = schema.class().map(DataRecord::new);
        let row = Self {
            id: id.to_string(),
            schema,
            records: RwLock::new(HashMap::new()),
            class: RwLock::new(class),
        };
        if let Some(id_header) = row.schema.lookup(ID_FIELD) {
            row.touch(&id_header);
            row.assign(&id_header, Value::Text(row.id.clone()))?;
        }
        Ok(row)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Register an occurrence of the named attribute on this row.
    ///
    /// Reserved names are remapped the way registration remaps them. Unknown
    /// names are auto-registered as numeric when the schema allows it.
    pub fn add_record(&self, name: &str) -> Result<()> {
        self.resolve_name(name).map(|_| ())
    }

    /// Register an occurrence and assign the record value in one step.
    pub fn set_value(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let header = self.resolve_name(name)?;
        self.assign(&header, value.into())
    }

    /// Register an occurrence of an attribute described by a header from
    /// another schema. The header is matched by name against this row's
    /// schema.
    pub fn resolve(&self, header: &Header) -> Result<()> {
        let resolved = self
            .schema
            .lookup(header.name())
            .ok_or_else(|| SchemaError::UnknownAttribute {
                name: header.name().to_string(),
            })?;
        self.touch(&resolved);
        Ok(())
    }

    /// Copy a record from another row, registering its attribute on this
    /// row's schema when it is not known yet. The occurrence count is copied
    /// verbatim rather than incremented.
    pub fn import_record(&self, record: &DataRecord) -> Result<()> {
        let header = match self.schema.lookup(record.header().name()) {
            Some(header) => header,
            None => self.schema.register_like(record.header()),
        };
        if self.is_class(&header) {
            let mut guard = self.class.write();
            let target = guard.get_or_insert_with(|| DataRecord::new(header.clone()));
            target.set_total(record.total());
            if let Some(value) = record.value() {
                target.set_value(value.clone())?;
            }
            return Ok(());
        }
        let mut records = self.records.write();
        let target = records
            .entry(record_key(header.name()))
            .or_insert_with(|| DataRecord::new(header.clone()));
        target.set_total(record.total());
        if let Some(value) = record.value() {
            target.set_value(value.clone())?;
        }
        Ok(())
    }

    /// Value held for the attribute, if any.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.records
            .read()
            .get(&record_key(name))
            .and_then(|record| record.value().cloned())
    }

    /// Snapshot of the record held for the attribute.
    pub fn record(&self, name: &str) -> Option<DataRecord> {
        self.records.read().get(&record_key(name)).cloned()
    }

    /// Snapshot of every non-class record on this row.
    pub fn records(&self) -> Vec<DataRecord> {
        self.records.read().values().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.read().contains_key(&record_key(name))
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Drop the record held for the attribute, if any.
    pub fn remove_record(&self, name: &str) {
        self.records.write().remove(&record_key(name));
    }

    pub fn set_class(&self, value: impl Into<Value>) -> Result<()> {
        let mut guard = self.class.write();
        match guard.as_mut() {
            Some(record) => record.set_value(value.into()).map_err(ArffError::from),
            None => Err(SchemaError::NoClassAttribute.into()),
        }
    }

    pub fn class_value(&self) -> Option<Value> {
        self.class
            .read()
            .as_ref()
            .and_then(|record| record.value().cloned())
    }

    pub fn class_record(&self) -> Option<DataRecord> {
        self.class.read().clone()
    }

    /// Assign the row date. Fails unless the dataset carries the date field.
    pub fn set_date(&self, date: NaiveDate) -> Result<()> {
        let header = self
            .schema
            .lookup(DATE_FIELD)
            .ok_or(StateError::FieldNotEnabled { field: "Date" })?;
        self.touch(&header);
        self.assign(&header, Value::Date(date))
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self.value(DATE_FIELD) {
            Some(Value::Date(date)) => Some(date),
            _ => None,
        }
    }

    /// Render the row as a sparse data line. Rows without records render
    /// empty; the class value, when present, is emitted as the final field.
    pub fn render(&self) -> Result<String> {
        let records = self.records.read();
        if records.is_empty() {
            return Ok(String::new());
        }
        let mut fields: Vec<(usize, String)> = records
            .values()
            .filter_map(|record| {
                self.schema
                    .index_of(record.header())
                    .map(|index| (index, record.render()))
            })
            .collect();
        fields.sort_by_key(|(index, _)| *index);

        let mut line = SparseLineWriter::new();
        for (index, value) in fields {
            line.add(index as i64, &value)?;
        }
        let class = self.class.read();
        if let (Some(class_header), Some(record)) = (self.schema.class(), class.as_ref()) {
            if record.header().name().eq_ignore_ascii_case(class_header.name()) {
                line.add(self.schema.len() as i64 - 1, &record.render())?;
            }
        }
        Ok(line.generate().to_string())
    }

    /// Scale the numeric values of this row in place. Unset numeric records
    /// are treated as zero and overwritten with their scaled value.
    pub(crate) fn normalize(&self, strategy: Normalization) -> Result<()> {
        let mut records = self.records.write();
        let keys: Vec<String> = records
            .iter()
            .filter(|(_, record)| record.header().is_numeric())
            .map(|(key, _)| key.clone())
            .collect();
        let values: Vec<f64> = keys
            .iter()
            .map(|key| {
                records
                    .get(key)
                    .and_then(|record| record.value())
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0)
            })
            .collect();
        let scaled = strategy.apply(&values);
        for (key, value) in keys.iter().zip(scaled) {
            if let Some(record) = records.get_mut(key) {
                record.set_value(value)?;
            }
        }
        Ok(())
    }

    /// Register an occurrence of an already resolved header without any name
    /// remapping. Used by the loader, which resolves headers by index.
    pub(crate) fn touch(&self, header: &Arc<Header>) {
        if self.is_class(header) {
            let mut guard = self.class.write();
            guard.get_or_insert_with(|| DataRecord::new(header.clone()));
        } else {
            let mut records = self.records.write();
            let record = records
                .entry(record_key(header.name()))
                .or_insert_with(|| DataRecord::new(header.clone()));
            record.increment();
        }
        header.register_row(&self.id);
    }

    /// Assign a value to the record of an already resolved header.
    pub(crate) fn assign(&self, header: &Arc<Header>, value: Value) -> Result<()> {
        if self.is_class(header) {
            let mut guard = self.class.write();
            let record = guard.get_or_insert_with(|| DataRecord::new(header.clone()));
            record.set_value(value)?;
            return Ok(());
        }
        let mut records = self.records.write();
        let record = records
            .entry(record_key(header.name()))
            .or_insert_with(|| DataRecord::new(header.clone()));
        record.set_value(value)?;
        Ok(())
    }

    fn resolve_name(&self, name: &str) -> Result<Arc<Header>> {
        let name = regular_name(name);
        let header = match self.schema.lookup(&name) {
            Some(header) => header,
            None if self.schema.create_on_demand() => self.schema.register_numeric(&name),
            None => {
                return Err(SchemaError::UnknownAttribute { name }.into());
            }
        };
        self.touch(&header);
        Ok(header)
    }

    fn is_class(&self, header: &Arc<Header>) -> bool {
        self.schema
            .class()
            .map(|class| Arc::ptr_eq(&class, header))
            .unwrap_or(false)
    }
}

fn record_key(name: &str) -> String {
    name.to_lowercase()
}
