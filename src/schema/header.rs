//! Attribute headers
//!
//! A header is a named, typed column definition. Each kind carries its own
//! declaration text, value parser, render rule and type contract, dispatched
//! through the closed [`HeaderKind`] variant set. Headers also track which
//! rows currently hold a record for them.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use parking_lot::RwLock;

use super::labels::ClassLabels;
use crate::data::Value;
use crate::utils::TypeMismatchError;

/// Declaration tag for numeric attributes
pub const NUMERIC_TAG: &str = "NUMERIC";

/// Declaration tag for string attributes
pub const STRING_TAG: &str = "STRING";

/// Declaration tag for date attributes
pub const DATE_TAG: &str = "DATE";

/// Default date pattern (chrono syntax)
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Rendering flags for numeric attributes
///
/// `use_count` switches rendering from the stored value to the occurrence
/// counter; `is_sparse` controls whether a zero renders as empty or "0".
/// Both are toggled dataset-wide after creation, hence atomics.
#[derive(Debug)]
pub struct NumericFlags {
    use_count: AtomicBool,
    is_sparse: AtomicBool,
}

impl Default for NumericFlags {
    fn default() -> Self {
        Self {
            use_count: AtomicBool::new(false),
            is_sparse: AtomicBool::new(true),
        }
    }
}

/// Fixed label set backing an enum nominal attribute
#[derive(Debug, Clone)]
pub struct EnumValues {
    /// Labels in declaration order (lexicographic)
    labels: Vec<String>,
    /// Underlying ordinal of each label, parallel to `labels`
    ordinals: Vec<i64>,
    /// Rendering for an unset record (the ordinal-zero label)
    default_label: String,
}

impl EnumValues {
    /// Build the sorted label set from a [`ClassLabels`] implementation
    pub fn of<L: ClassLabels>() -> Self {
        let mut pairs: Vec<(&str, i64)> = L::LABELS.to_vec();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        let default_label = pairs
            .iter()
            .find(|(_, ordinal)| *ordinal == 0)
            .or_else(|| pairs.first())
            .map(|(label, _)| (*label).to_string())
            .unwrap_or_default();
        Self {
            labels: pairs.iter().map(|(label, _)| (*label).to_string()).collect(),
            ordinals: pairs.iter().map(|(_, ordinal)| *ordinal).collect(),
            default_label,
        }
    }

    /// Labels in declaration order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn ordinal_of(&self, label: &str) -> Option<i64> {
        self.labels
            .iter()
            .position(|item| item == label)
            .map(|position| self.ordinals[position])
    }

    fn label_of(&self, ordinal: i64) -> Option<&str> {
        self.ordinals
            .iter()
            .position(|item| *item == ordinal)
            .map(|position| self.labels[position].as_str())
    }
}

/// Attribute kind with its kind-specific payload
#[derive(Debug)]
pub enum HeaderKind {
    Numeric(NumericFlags),
    Nominal { values: Vec<String> },
    EnumNominal(EnumValues),
    Date { format: String },
    String,
}

/// A named, typed attribute definition
#[derive(Debug)]
pub struct Header {
    name: String,
    kind: HeaderKind,
    /// Ids of rows currently holding a record for this attribute
    members: RwLock<HashSet<String>>,
}

impl Header {
    fn new(name: &str, kind: HeaderKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            members: RwLock::new(HashSet::new()),
        }
    }

    pub fn numeric(name: &str) -> Self {
        Self::new(name, HeaderKind::Numeric(NumericFlags::default()))
    }

    pub fn nominal(name: &str, values: Vec<String>) -> Self {
        Self::new(name, HeaderKind::Nominal { values })
    }

    pub fn enum_nominal<L: ClassLabels>(name: &str) -> Self {
        Self::new(name, HeaderKind::EnumNominal(EnumValues::of::<L>()))
    }

    pub fn date(name: &str, format: &str) -> Self {
        Self::new(
            name,
            HeaderKind::Date {
                format: format.to_string(),
            },
        )
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, HeaderKind::String)
    }

    /// Attribute name (case-preserving; identity is case-insensitive)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &HeaderKind {
        &self.kind
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, HeaderKind::Numeric(_))
    }

    pub fn is_date(&self) -> bool {
        matches!(self.kind, HeaderKind::Date { .. })
    }

    /// Check a value against this attribute's type contract.
    ///
    /// An unset value always passes; set values must match the kind (and,
    /// for nominal kinds, be a member of the declared value set).
    pub fn check_support(&self, value: &Value) -> Result<(), TypeMismatchError> {
        let supported = match (&self.kind, value) {
            (HeaderKind::Numeric(_), Value::Numeric(_)) => true,
            (HeaderKind::Nominal { values }, Value::Text(text)) => values.iter().any(|v| v == text),
            (HeaderKind::EnumNominal(values), Value::Text(text)) => {
                values.labels.iter().any(|v| v == text)
            }
            (HeaderKind::Date { .. }, Value::Date(_)) => true,
            (HeaderKind::String, Value::Text(_)) => true,
            _ => false,
        };
        if supported {
            Ok(())
        } else {
            Err(TypeMismatchError {
                attribute: self.name.clone(),
                value: value.to_string(),
            })
        }
    }

    /// Parse a textual value from a data line.
    ///
    /// Returns `None` when the text does not parse for this kind; the record
    /// is then left unset rather than failing the whole load.
    pub fn parse_value(&self, text: &str) -> Option<Value> {
        match &self.kind {
            HeaderKind::Numeric(_) => text.parse::<f64>().ok().map(Value::Numeric),
            HeaderKind::Nominal { .. } | HeaderKind::String => Some(Value::Text(text.to_string())),
            HeaderKind::EnumNominal(values) => {
                if text.trim().is_empty() {
                    return values.labels.first().cloned().map(Value::Text);
                }
                values
                    .labels
                    .iter()
                    .find(|label| *label == text)
                    .cloned()
                    .map(Value::Text)
            }
            HeaderKind::Date { format } => NaiveDate::parse_from_str(text, format)
                .ok()
                .map(Value::Date),
        }
    }

    /// Render a record's value for a sparse data line.
    ///
    /// `total` is the record's occurrence count, used by numeric attributes
    /// in count mode. An empty result means the pair is omitted from the
    /// line (or rendered as an explicit zero in dense mode).
    pub fn render(&self, value: Option<&Value>, total: u32) -> String {
        match &self.kind {
            HeaderKind::Numeric(flags) => self.render_numeric(flags, value, total),
            HeaderKind::Nominal { .. } => match value {
                Some(Value::Text(text)) => text.clone(),
                _ => String::new(),
            },
            HeaderKind::EnumNominal(values) => match value {
                Some(Value::Text(text)) => text.clone(),
                _ => values.default_label.clone(),
            },
            HeaderKind::Date { format } => match value {
                Some(Value::Date(date)) => date.format(format).to_string(),
                _ => String::new(),
            },
            HeaderKind::String => match value {
                Some(Value::Text(text)) => text.clone(),
                _ => "NULL".to_string(),
            },
        }
    }

    fn render_numeric(&self, flags: &NumericFlags, value: Option<&Value>, total: u32) -> String {
        let sparse = flags.is_sparse.load(Ordering::Relaxed);
        if flags.use_count.load(Ordering::Relaxed) && value.is_none() {
            if total == 0 {
                return if sparse { String::new() } else { "0".to_string() };
            }
            return total.to_string();
        }

        match value {
            None => String::new(),
            Some(Value::Numeric(number)) if *number == 0.0 => {
                if sparse {
                    String::new()
                } else {
                    "0".to_string()
                }
            }
            Some(Value::Numeric(number)) => number.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Class id of a value: nominal position (or -1 when absent), enum
    /// ordinal, or the numeric value itself.
    pub fn class_id(&self, value: Option<&Value>) -> i64 {
        match (&self.kind, value) {
            (HeaderKind::Numeric(_), Some(Value::Numeric(number))) => *number as i64,
            (HeaderKind::Nominal { values }, Some(Value::Text(text))) => values
                .iter()
                .position(|item| item == text)
                .map(|position| position as i64)
                .unwrap_or(-1),
            (HeaderKind::EnumNominal(values), Some(Value::Text(text))) => {
                values.ordinal_of(text).unwrap_or(-1)
            }
            _ => -1,
        }
    }

    /// Inverse of [`Header::class_id`] for class-capable kinds
    pub fn value_for_class_id(&self, class_id: i64) -> Option<Value> {
        match &self.kind {
            HeaderKind::Numeric(_) => Some(Value::Numeric(class_id as f64)),
            HeaderKind::Nominal { values } => {
                usize::try_from(class_id)
                    .ok()
                    .and_then(|position| values.get(position))
                    .map(|text| Value::Text(text.clone()))
            }
            HeaderKind::EnumNominal(values) => values
                .label_of(class_id)
                .map(|label| Value::Text(label.to_string())),
            _ => None,
        }
    }

    /// The full `@ATTRIBUTE` declaration line.
    ///
    /// Names containing a space, apostrophe or comma are double-quoted.
    pub fn declaration(&self) -> String {
        let needs_quotes =
            self.name.contains(' ') || self.name.contains('\'') || self.name.contains(',');
        if needs_quotes {
            format!("@ATTRIBUTE \"{}\" {}", self.name, self.type_suffix())
        } else {
            format!("@ATTRIBUTE {} {}", self.name, self.type_suffix())
        }
    }

    /// Type portion of the declaration line
    pub fn type_suffix(&self) -> String {
        match &self.kind {
            HeaderKind::Numeric(_) => NUMERIC_TAG.to_string(),
            HeaderKind::Nominal { values } => format!("{{{}}}", values.join(", ")),
            HeaderKind::EnumNominal(values) => format!("{{{}}}", values.labels.join(", ")),
            HeaderKind::Date { format } => format!("{DATE_TAG} {format}"),
            HeaderKind::String => STRING_TAG.to_string(),
        }
    }

    /// Independent copy with identical configuration and empty membership
    pub fn clone_definition(&self) -> Header {
        self.cloned_as(&self.name)
    }

    /// Copy of this definition under a different name (reserved-name
    /// suffixing during re-registration)
    pub(crate) fn cloned_as(&self, name: &str) -> Header {
        let kind = match &self.kind {
            HeaderKind::Numeric(_) => HeaderKind::Numeric(NumericFlags::default()),
            HeaderKind::Nominal { values } => HeaderKind::Nominal {
                values: values.clone(),
            },
            HeaderKind::EnumNominal(values) => HeaderKind::EnumNominal(values.clone()),
            HeaderKind::Date { format } => HeaderKind::Date {
                format: format.clone(),
            },
            HeaderKind::String => HeaderKind::String,
        };
        Header::new(name, kind)
    }

    /// Switch numeric rendering to the occurrence counter
    pub fn set_use_count(&self, enabled: bool) {
        if let HeaderKind::Numeric(flags) = &self.kind {
            flags.use_count.store(enabled, Ordering::Relaxed);
        }
    }

    /// Switch numeric zero rendering between empty (sparse) and "0" (dense)
    pub fn set_sparse(&self, enabled: bool) {
        if let HeaderKind::Numeric(flags) = &self.kind {
            flags.is_sparse.store(enabled, Ordering::Relaxed);
        }
    }

    pub fn register_row(&self, row_id: &str) {
        self.members.write().insert(row_id.to_string());
    }

    pub fn unregister_row(&self, row_id: &str) {
        self.members.write().remove(row_id);
    }

    pub fn contains_row(&self, row_id: &str) -> bool {
        self.members.read().contains(row_id)
    }

    /// Number of rows currently holding a record for this attribute
    pub fn row_count(&self) -> usize {
        self.members.read().len()
    }
}
