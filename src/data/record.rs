//! Cell values and data records

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::schema::Header;
use crate::utils::TypeMismatchError;

/// A dynamically typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Numeric(f64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    /// Numeric view of the value, used by normalization
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(number) => Some(*number),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(number) => write!(f, "{number}"),
            Value::Text(text) => write!(f, "{text}"),
            Value::Date(date) => write!(f, "{date}"),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Numeric(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Numeric(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Numeric(f64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Numeric(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

/// One (row, attribute) cell: an optional type-checked value plus an
/// occurrence counter
#[derive(Debug, Clone)]
pub struct DataRecord {
    header: Arc<Header>,
    value: Option<Value>,
    total: u32,
}

impl DataRecord {
    pub fn new(header: Arc<Header>) -> Self {
        Self {
            header,
            value: None,
            total: 0,
        }
    }

    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Assign a value after checking the attribute's type contract.
    /// A failed check leaves the previous value untouched.
    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<(), TypeMismatchError> {
        let value = value.into();
        self.header.check_support(&value)?;
        self.value = Some(value);
        Ok(())
    }

    pub fn clear_value(&mut self) {
        self.value = None;
    }

    /// Occurrence count for frequency-style rendering
    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn set_total(&mut self, total: u32) {
        self.total = total;
    }

    pub fn increment(&mut self) {
        self.total += 1;
    }

    /// Text form of this cell for a sparse data line
    pub fn render(&self) -> String {
        self.header.render(self.value.as_ref(), self.total)
    }

    /// Class id of this cell's value (see [`Header::class_id`])
    pub fn class_id(&self) -> i64 {
        self.header.class_id(self.value.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_value_checks_contract() {
        let header = Arc::new(Header::numeric("Test"));
        let mut record = DataRecord::new(header);
        assert!(record.set_value(1.0).is_ok());
        assert!(record.set_value("text").is_err());
        // failed assignment keeps the previous value
        assert_eq!(record.value(), Some(&Value::Numeric(1.0)));
    }

    #[test]
    fn test_increment() {
        let header = Arc::new(Header::numeric("Test"));
        let mut record = DataRecord::new(header);
        record.increment();
        record.increment();
        assert_eq!(record.total(), 2);
    }

    #[test]
    fn test_string_record_rejects_numeric() {
        let header = Arc::new(Header::string("Test"));
        let mut record = DataRecord::new(header);
        assert!(record.set_value(1.0).is_err());
    }

    #[test]
    fn test_nominal_record_rejects_non_member() {
        let header = Arc::new(Header::nominal(
            "Test",
            vec!["1".to_string(), "2".to_string()],
        ));
        let mut record = DataRecord::new(header);
        assert!(record.set_value("1").is_ok());
        assert!(record.set_value("3").is_err());
    }

    #[test]
    fn test_numeric_display_is_shortest() {
        assert_eq!(Value::Numeric(1.0).to_string(), "1");
        assert_eq!(Value::Numeric(0.4472135955).to_string(), "0.4472135955");
    }
}
