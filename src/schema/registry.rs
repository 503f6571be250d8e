//! Attribute schema registry
//!
//! Ordered collection of headers with case-insensitive name lookup, the
//! single optional class attribute, and reserved-name handling. Lookups take
//! a shared read lock; structural mutations take the exclusive write lock,
//! so readers never observe a half-mutated ordered list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::header::{Header, HeaderKind, DATE_TAG, DEFAULT_DATE_FORMAT, NUMERIC_TAG, STRING_TAG};
use super::labels::ClassLabels;
use crate::utils::SchemaError;

/// Reserved name of the class attribute
pub const CLASS_ATTRIBUTE: &str = "class";

/// Reserved name of the synthetic row-id attribute
pub const ID_FIELD: &str = "DOCUMENT_ID_FIELD";

/// Reserved name of the synthetic date attribute
pub const DATE_FIELD: &str = "DATE";

/// True for the reserved synthetic attribute names (case-insensitive)
pub fn is_reserved(name: &str) -> bool {
    name.eq_ignore_ascii_case(CLASS_ATTRIBUTE)
        || name.eq_ignore_ascii_case(ID_FIELD)
        || name.eq_ignore_ascii_case(DATE_FIELD)
}

/// Suffix reserved names so ordinary attributes never collide with the
/// synthetic ones
pub fn regular_name(name: &str) -> String {
    if is_reserved(name) {
        format!("{name}_word")
    } else {
        name.to_string()
    }
}

#[derive(Default)]
struct Inner {
    /// Emission order; defines index -> header
    ordered: Vec<Arc<Header>>,
    /// Lowercased name -> header
    table: HashMap<String, Arc<Header>>,
    class: Option<Arc<Header>>,
}

/// Ordered, thread-safe attribute registry
pub struct Schema {
    inner: RwLock<Inner>,
    /// Auto-register unknown attribute names as numeric
    create_on_demand: AtomicBool,
    /// When false, register calls create headers without inserting them
    register_enabled: AtomicBool,
    /// Rendering flags inherited by newly created numeric headers
    use_total: AtomicBool,
    is_sparse: AtomicBool,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            create_on_demand: AtomicBool::new(true),
            register_enabled: AtomicBool::new(true),
            use_total: AtomicBool::new(false),
            is_sparse: AtomicBool::new(true),
        }
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_on_demand(&self) -> bool {
        self.create_on_demand.load(Ordering::Relaxed)
    }

    pub fn set_create_on_demand(&self, enabled: bool) {
        self.create_on_demand.store(enabled, Ordering::Relaxed);
    }

    pub fn register_enabled(&self) -> bool {
        self.register_enabled.load(Ordering::Relaxed)
    }

    pub fn set_register_enabled(&self, enabled: bool) {
        self.register_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn use_total(&self) -> bool {
        self.use_total.load(Ordering::Relaxed)
    }

    /// Toggle occurrence-count rendering on every current and future
    /// numeric attribute
    pub fn set_use_total(&self, enabled: bool) {
        self.use_total.store(enabled, Ordering::Relaxed);
        for header in self.inner.read().ordered.iter() {
            header.set_use_count(enabled);
        }
    }

    pub fn is_sparse(&self) -> bool {
        self.is_sparse.load(Ordering::Relaxed)
    }

    /// Toggle sparse zero rendering on every current and future numeric
    /// attribute
    pub fn set_sparse(&self, enabled: bool) {
        self.is_sparse.store(enabled, Ordering::Relaxed);
        for header in self.inner.read().ordered.iter() {
            header.set_sparse(enabled);
        }
    }

    /// Number of registered attributes
    pub fn len(&self) -> usize {
        self.inner.read().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Case-insensitive name lookup
    pub fn lookup(&self, name: &str) -> Option<Arc<Header>> {
        self.inner.read().table.get(&name.to_lowercase()).cloned()
    }

    /// Header at an ordered-list position
    pub fn by_index(&self, index: usize) -> Result<Arc<Header>, SchemaError> {
        let inner = self.inner.read();
        inner
            .ordered
            .get(index)
            .cloned()
            .ok_or(SchemaError::IndexOutOfRange {
                index,
                total: inner.ordered.len(),
            })
    }

    /// Live ordered-list position of a header, matched by name
    pub fn index_of(&self, header: &Header) -> Option<usize> {
        self.index_of_name(header.name())
    }

    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.inner
            .read()
            .ordered
            .iter()
            .position(|item| item.name().eq_ignore_ascii_case(name))
    }

    /// The class attribute, when one is registered
    pub fn class(&self) -> Option<Arc<Header>> {
        self.inner.read().class.clone()
    }

    /// Snapshot of all headers in emission order
    pub fn headers(&self) -> Vec<Arc<Header>> {
        self.inner.read().ordered.clone()
    }

    /// Declaration lines in emission order
    pub fn declarations(&self) -> Vec<String> {
        self.inner
            .read()
            .ordered
            .iter()
            .map(|header| header.declaration())
            .collect()
    }

    pub fn register_numeric(&self, name: &str) -> Arc<Header> {
        self.register_with(name, true, Header::numeric)
    }

    pub fn register_nominal(&self, name: &str, values: &[&str]) -> Arc<Header> {
        self.register_with(name, true, |name| {
            Header::nominal(name, values.iter().map(|v| v.to_string()).collect())
        })
    }

    pub fn register_string(&self, name: &str) -> Arc<Header> {
        self.register_with(name, true, Header::string)
    }

    pub fn register_date(&self, name: &str, format: &str) -> Arc<Header> {
        self.register_with(name, true, |name| Header::date(name, format))
    }

    pub fn register_enum<L: ClassLabels>(&self, name: &str) -> Arc<Header> {
        self.register_with(name, true, Header::enum_nominal::<L>)
    }

    pub fn register_numeric_class(&self) -> Result<Arc<Header>, SchemaError> {
        let header = self.register_with(CLASS_ATTRIBUTE, false, Header::numeric);
        self.register_class(&header)?;
        Ok(header)
    }

    pub fn register_nominal_class(&self, values: &[&str]) -> Result<Arc<Header>, SchemaError> {
        let header = self.register_with(CLASS_ATTRIBUTE, false, |name| {
            Header::nominal(name, values.iter().map(|v| v.to_string()).collect())
        });
        self.register_class(&header)?;
        Ok(header)
    }

    pub fn register_enum_class<L: ClassLabels>(&self) -> Result<Arc<Header>, SchemaError> {
        let header = self.register_with(CLASS_ATTRIBUTE, false, Header::enum_nominal::<L>);
        self.register_class(&header)?;
        Ok(header)
    }

    /// Register the synthetic row-id attribute
    pub fn register_id_field(&self) -> Arc<Header> {
        self.register_with(ID_FIELD, false, Header::string)
    }

    /// Register the synthetic date attribute
    pub fn register_date_field(&self) -> Arc<Header> {
        self.register_with(DATE_FIELD, false, |name| {
            Header::date(name, DEFAULT_DATE_FORMAT)
        })
    }

    /// Register an equivalent of a header that belongs to a foreign schema.
    ///
    /// The passed header is only a template: a fresh definition is created
    /// (or the existing one under that name returned), never the instance
    /// itself.
    pub fn register_like(&self, header: &Header) -> Arc<Header> {
        let system = match header.kind() {
            HeaderKind::Date { .. } => header.name().eq_ignore_ascii_case(DATE_FIELD),
            HeaderKind::String => header.name().eq_ignore_ascii_case(ID_FIELD),
            _ => false,
        };
        self.register_with(header.name(), !system, |name| header.cloned_as(name))
    }

    /// Install a header as the class attribute and relocate it to the final
    /// position. Fails when a different class is already registered.
    pub fn register_class(&self, header: &Arc<Header>) -> Result<(), SchemaError> {
        let mut inner = self.inner.write();
        Self::set_class(&mut inner, header.clone())
    }

    /// Remove a header by name, detaching it from the name table, the
    /// ordered list and the class slot. Row records are not touched; the
    /// owning dataset cascades the drop.
    pub fn remove(&self, name: &str) -> Result<Arc<Header>, SchemaError> {
        let mut inner = self.inner.write();
        let header = inner
            .table
            .remove(&name.to_lowercase())
            .ok_or_else(|| SchemaError::UnknownAttribute {
                name: name.to_string(),
            })?;
        inner
            .ordered
            .retain(|item| !Arc::ptr_eq(item, &header));
        if inner
            .class
            .as_ref()
            .is_some_and(|class| Arc::ptr_eq(class, &header))
        {
            inner.class = None;
        }
        Ok(header)
    }

    /// Parse one `@ATTRIBUTE` declaration line into the matching header
    /// kind. Keywords are case-insensitive; names may be quoted.
    pub fn parse_declaration(&self, line: &str) -> Result<Arc<Header>, SchemaError> {
        if !line.to_ascii_lowercase().contains("@attribute") {
            return Err(SchemaError::MalformedDeclaration {
                line: line.to_string(),
            });
        }

        let (name, type_tokens) = Self::split_declaration(line)?;

        if let Some(existing) = self.lookup(&name) {
            let is_class = self
                .class()
                .is_some_and(|class| Arc::ptr_eq(&class, &existing));
            if is_class {
                return Ok(existing);
            }
            return Err(SchemaError::DuplicateDeclaration {
                line: line.to_string(),
            });
        }

        // Nominal: the value list between braces
        if let Some(open) = line.find('{') {
            let close = line[open..]
                .find('}')
                .map(|offset| open + offset)
                .ok_or_else(|| SchemaError::MalformedDeclaration {
                    line: line.to_string(),
                })?;
            let values: Vec<&str> = line[open + 1..close].split(',').map(str::trim).collect();
            if name.eq_ignore_ascii_case(CLASS_ATTRIBUTE) {
                return self.register_nominal_class(&values);
            }
            return Ok(self.register_nominal(&name, &values));
        }

        if name.eq_ignore_ascii_case(CLASS_ATTRIBUTE) {
            return self.register_numeric_class();
        }

        match type_tokens.first() {
            Some(tag) if tag.eq_ignore_ascii_case(NUMERIC_TAG) => {
                Ok(self.register_numeric(&name))
            }
            Some(tag) if tag.eq_ignore_ascii_case(DATE_TAG) && type_tokens.len() == 2 => {
                let check = !name.eq_ignore_ascii_case(DATE_FIELD);
                let format = type_tokens[1].clone();
                Ok(self.register_with(&name, check, |name| Header::date(name, &format)))
            }
            Some(tag) if tag.eq_ignore_ascii_case(STRING_TAG) => {
                if name.eq_ignore_ascii_case(ID_FIELD) {
                    Ok(self.register_id_field())
                } else {
                    Ok(self.register_string(&name))
                }
            }
            _ => Err(SchemaError::MalformedDeclaration {
                line: line.to_string(),
            }),
        }
    }

    /// Deep copy into an independent schema with fresh membership tracking.
    ///
    /// System attributes keep their fixed positions and the class stays
    /// last; ordinary attributes follow, optionally sorted by name.
    pub fn clone_schema(&self, sorted: bool) -> Schema {
        let source = self.inner.read();
        let schema = Schema::new();
        {
            let mut target = schema.inner.write();
            for header in source.ordered.iter().filter(|h| is_reserved(h.name())) {
                let cloned = Arc::new(header.clone_definition());
                Self::insert_header(&mut target, cloned.clone());
                let is_class = source
                    .class
                    .as_ref()
                    .is_some_and(|class| Arc::ptr_eq(class, header));
                if is_class {
                    // target class slot is empty here, set_class can't fail
                    let _ = Self::set_class(&mut target, cloned);
                }
            }

            let mut ordinary: Vec<&Arc<Header>> = source
                .ordered
                .iter()
                .filter(|h| !is_reserved(h.name()))
                .collect();
            if sorted {
                ordinary.sort_by_key(|h| h.name().to_lowercase());
            }
            for header in ordinary {
                Self::insert_header(&mut target, Arc::new(header.clone_definition()));
            }
        }
        schema
    }

    /// Split a declaration into the attribute name and the type tokens
    /// after it, handling quoted names
    fn split_declaration(line: &str) -> Result<(String, Vec<String>), SchemaError> {
        for quote in ['\'', '"'] {
            if let (Some(first), Some(last)) = (line.find(quote), line.rfind(quote)) {
                if first != last {
                    let name = line[first + 1..last].to_string();
                    let rest = line[last + 1..]
                        .split_whitespace()
                        .map(str::to_string)
                        .collect();
                    return Ok((name, rest));
                }
            }
        }

        let items: Vec<&str> = line.split_whitespace().collect();
        if items.len() < 3 {
            return Err(SchemaError::MalformedDeclaration {
                line: line.to_string(),
            });
        }
        Ok((
            items[1].trim().to_string(),
            items[2..].iter().map(|item| item.to_string()).collect(),
        ))
    }

    /// Shared registration path: reserved-name suffixing, duplicate
    /// short-circuit, flag inheritance, ordered insertion
    fn register_with<F>(&self, name: &str, suffix_reserved: bool, create: F) -> Arc<Header>
    where
        F: FnOnce(&str) -> Header,
    {
        let name = if suffix_reserved {
            regular_name(name)
        } else {
            name.to_string()
        };

        if !self.register_enabled() {
            return Arc::new(create(&name));
        }

        let mut inner = self.inner.write();
        if let Some(existing) = inner.table.get(&name.to_lowercase()) {
            return existing.clone();
        }

        let header = Arc::new(create(&name));
        if header.is_numeric() {
            header.set_use_count(self.use_total.load(Ordering::Relaxed));
            header.set_sparse(self.is_sparse.load(Ordering::Relaxed));
        }
        Self::insert_header(&mut inner, header.clone());
        header
    }

    fn insert_header(inner: &mut Inner, header: Arc<Header>) {
        inner
            .table
            .insert(header.name().to_lowercase(), header.clone());
        // Date attributes keep an early fixed position; everything else goes
        // directly before the class attribute so the class stays last.
        let position = if header.is_date() {
            0
        } else {
            inner.ordered.len() - usize::from(inner.class.is_some())
        };
        inner.ordered.insert(position, header);
    }

    fn set_class(inner: &mut Inner, header: Arc<Header>) -> Result<(), SchemaError> {
        if let Some(current) = &inner.class {
            if Arc::ptr_eq(current, &header) {
                return Ok(());
            }
            return Err(SchemaError::ClassAlreadyRegistered);
        }
        // the header may come straight from the caller rather than a
        // register call; keep the name table in step with the ordered list
        inner
            .table
            .insert(header.name().to_lowercase(), header.clone());
        inner.ordered.retain(|item| !Arc::ptr_eq(item, &header));
        inner.ordered.push(header.clone());
        inner.class = Some(header);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    enum Verdict {}

    impl ClassLabels for Verdict {
        const LABELS: &'static [(&'static str, i64)] =
            &[("Negative", -1), ("Neutral", 0), ("Positive", 1)];
    }

    #[test]
    fn test_register_numeric() {
        let schema = Schema::new();
        let header = schema.register_numeric("1 2 3 Lie's");
        assert_eq!(header.name(), "1 2 3 Lie's");
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_register_disabled_creates_without_inserting() {
        let schema = Schema::new();
        schema.set_register_enabled(false);
        let header = schema.register_numeric("1");
        assert_eq!(header.name(), "1");
        assert_eq!(schema.len(), 0);
    }

    #[test]
    fn test_duplicate_registration_returns_existing() {
        let schema = Schema::new();
        let first = schema.register_numeric("1");
        let second = schema.register_numeric("1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let schema = Schema::new();
        schema.register_numeric("Attr");
        assert!(schema.lookup("attr").is_some());
        assert!(schema.lookup("ATTR").is_some());
        assert!(schema.lookup("other").is_none());
    }

    #[test]
    fn test_register_numeric_class() {
        let schema = Schema::new();
        let class = schema.register_numeric_class().unwrap();
        assert_eq!(class.name(), "class");
        assert!(schema.class().is_some());
    }

    #[test]
    fn test_register_nominal_class() {
        let schema = Schema::new();
        let class = schema.register_nominal_class(&["1", "2"]).unwrap();
        assert_eq!(class.name(), "class");
        match class.kind() {
            HeaderKind::Nominal { values } => assert_eq!(values.len(), 2),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_register_class_with_external_header() {
        let schema = Schema::new();
        schema.register_numeric("a");
        let label = Arc::new(Header::nominal(
            "label",
            vec!["yes".to_string(), "no".to_string()],
        ));
        schema.register_class(&label).unwrap();
        assert_eq!(schema.len(), 2);
        assert!(schema.lookup("label").is_some());
        assert_eq!(schema.index_of_name("label"), Some(1));
    }

    #[test]
    fn test_second_class_is_fatal() {
        let schema = Schema::new();
        schema.register_numeric_class().unwrap();
        let other = Arc::new(Header::numeric("other"));
        assert!(matches!(
            schema.register_class(&other),
            Err(SchemaError::ClassAlreadyRegistered)
        ));
    }

    #[test]
    fn test_class_stays_last() {
        let schema = Schema::new();
        schema.register_enum_class::<Verdict>().unwrap();
        schema.register_numeric("a");
        schema.register_numeric("b");
        let names: Vec<String> = schema
            .headers()
            .iter()
            .map(|h| h.name().to_string())
            .collect();
        assert_eq!(names, ["a", "b", "class"]);
    }

    #[test]
    fn test_date_inserted_first() {
        let schema = Schema::new();
        schema.register_enum_class::<Verdict>().unwrap();
        schema.register_numeric("a");
        schema.register_date("When", DEFAULT_DATE_FORMAT);
        let names: Vec<String> = schema
            .headers()
            .iter()
            .map(|h| h.name().to_string())
            .collect();
        assert_eq!(names, ["When", "a", "class"]);
        assert_eq!(schema.index_of_name("a"), Some(1));
    }

    #[test]
    fn test_reserved_name_suffixed() {
        let schema = Schema::new();
        schema.register_enum_class::<Verdict>().unwrap();
        let header = schema.register_numeric("class");
        assert_eq!(header.name(), "class_word");
        assert_eq!(schema.class().unwrap().name(), "class");
    }

    #[test]
    fn test_remove_unknown_fails() {
        let schema = Schema::new();
        assert!(matches!(
            schema.remove("missing"),
            Err(SchemaError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_remove_clears_class_slot() {
        let schema = Schema::new();
        schema.register_numeric_class().unwrap();
        schema.remove("class").unwrap();
        assert!(schema.class().is_none());
        assert_eq!(schema.len(), 0);
    }

    #[test]
    fn test_parse_numeric_declaration() {
        let schema = Schema::new();
        let header = schema.parse_declaration("@ATTRIBUTE price NUMERIC").unwrap();
        assert_eq!(header.name(), "price");
        assert!(header.is_numeric());
    }

    #[test]
    fn test_parse_quoted_name() {
        let schema = Schema::new();
        let header = schema
            .parse_declaration("@ATTRIBUTE 'b and c' NUMERIC")
            .unwrap();
        assert_eq!(header.name(), "b and c");
    }

    #[test]
    fn test_parse_nominal_declaration() {
        let schema = Schema::new();
        let header = schema
            .parse_declaration("@ATTRIBUTE outlook {sunny, rainy}")
            .unwrap();
        match header.kind() {
            HeaderKind::Nominal { values } => {
                assert_eq!(values, &["sunny".to_string(), "rainy".to_string()]);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_parse_class_declaration_registers_class() {
        let schema = Schema::new();
        schema
            .parse_declaration("@ATTRIBUTE class {Negative, Positive}")
            .unwrap();
        assert_eq!(schema.class().unwrap().name(), "class");
    }

    #[test]
    fn test_parse_class_declaration_matches_existing() {
        let schema = Schema::new();
        let class = schema.register_enum_class::<Verdict>().unwrap();
        let parsed = schema
            .parse_declaration("@ATTRIBUTE class {Negative, Neutral, Positive}")
            .unwrap();
        assert!(Arc::ptr_eq(&class, &parsed));
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_parse_duplicate_declaration_fails() {
        let schema = Schema::new();
        schema.parse_declaration("@ATTRIBUTE a NUMERIC").unwrap();
        assert!(matches!(
            schema.parse_declaration("@ATTRIBUTE a NUMERIC"),
            Err(SchemaError::DuplicateDeclaration { .. })
        ));
    }

    #[test]
    fn test_parse_date_declaration() {
        let schema = Schema::new();
        let header = schema
            .parse_declaration("@ATTRIBUTE when DATE %Y-%m-%d")
            .unwrap();
        assert!(header.is_date());
        assert_eq!(header.type_suffix(), "DATE %Y-%m-%d");
    }

    #[test]
    fn test_parse_malformed_declaration() {
        let schema = Schema::new();
        assert!(schema.parse_declaration("no marker here").is_err());
        assert!(schema.parse_declaration("@ATTRIBUTE onlyname").is_err());
        assert!(schema.parse_declaration("@ATTRIBUTE a BOGUS").is_err());
    }

    #[test]
    fn test_clone_schema() {
        let schema = Schema::new();
        schema.register_numeric_class().unwrap();
        schema.register_nominal("Another", &["One", "Two"]);
        let copy = schema.clone_schema(false);
        assert_eq!(copy.len(), 2);
        let copied_class = copy.class().unwrap();
        assert!(copied_class.is_numeric());
        assert!(!Arc::ptr_eq(&schema.class().unwrap(), &copied_class));
    }

    #[test]
    fn test_clone_schema_sorted() {
        let schema = Schema::new();
        schema.register_numeric("b");
        schema.register_numeric("a");
        schema.register_numeric("c");
        let copy = schema.clone_schema(true);
        let names: Vec<String> = copy
            .headers()
            .iter()
            .map(|h| h.name().to_string())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_new_numeric_inherits_flags() {
        let schema = Schema::new();
        schema.set_use_total(true);
        let header = schema.register_numeric("a");
        assert_eq!(header.render(None, 2), "2");
    }
}
