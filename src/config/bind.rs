//! Binding sections onto typed options.
//!
//! The caller describes the target with an [`OptionsShape`]: each field has a
//! name, a [`FieldKind`] and an optional default. Binding reads one snapshot,
//! converts every present string to the field's kind and hands the result to
//! `serde` for the final typed value. The result never changes afterwards.

use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use super::merge::Snapshot;
use super::path::KeyPath;
use super::section::Section;
use super::ConfigError;

/// The semantic type of one options field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Integer,
    Float,
    Boolean,
    String,
    /// A nested section bound with its own shape.
    Object(OptionsShape),
    /// Children `0..n` of the field's section, each bound as the inner kind.
    List(Box<FieldKind>),
}

impl FieldKind {
    pub fn list(inner: FieldKind) -> Self {
        FieldKind::List(Box::new(inner))
    }

    fn describe(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Boolean => "boolean",
            FieldKind::String => "string",
            FieldKind::Object(_) => "object",
            FieldKind::List(_) => "list",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// Used when the section has no value for the field.
    pub default: Option<Value>,
}

/// An ordered description of an options type's fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsShape {
    fields: Vec<FieldDescriptor>,
}

impl OptionsShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            kind,
            default: None,
        });
        self
    }

    pub fn field_or(
        mut self,
        name: impl Into<String>,
        kind: FieldKind,
        default: impl Into<Value>,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            kind,
            default: Some(default.into()),
        });
        self
    }

    pub fn integer(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Integer)
    }

    pub fn float(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Float)
    }

    pub fn boolean(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Boolean)
    }

    pub fn string(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::String)
    }

    pub fn object(self, name: impl Into<String>, shape: OptionsShape) -> Self {
        self.field(name, FieldKind::Object(shape))
    }

    pub fn list(self, name: impl Into<String>, inner: FieldKind) -> Self {
        self.field(name, FieldKind::list(inner))
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

/// An options type that knows its shape and where it lives.
pub trait Options: DeserializeOwned {
    /// Section the options are bound from, e.g. `"Local"`.
    const SECTION: &'static str;

    fn shape() -> OptionsShape;
}

/// Typed options bound from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundOptions<T> {
    options: T,
    version: u64,
}

impl<T> BoundOptions<T> {
    /// Version of the snapshot the options were read from.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn into_inner(self) -> T {
        self.options
    }
}

impl<T> Deref for BoundOptions<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.options
    }
}

impl Section {
    /// Binds this section against `shape`, producing a JSON object keyed by
    /// field name. Absent fields take their default or are left out.
    pub fn bind(&self, shape: &OptionsShape) -> Result<Map<String, Value>, ConfigError> {
        let snapshot = self.snapshot();
        bind_object(&snapshot, self.path(), &KeyPath::root(), shape)
    }

    /// Binds this section and deserializes the result into `T`.
    pub fn bind_as<T: DeserializeOwned>(&self, shape: &OptionsShape) -> Result<T, ConfigError> {
        Ok(self.bind_versioned::<T>(shape)?.into_inner())
    }

    pub fn bind_versioned<T: DeserializeOwned>(
        &self,
        shape: &OptionsShape,
    ) -> Result<BoundOptions<T>, ConfigError> {
        let snapshot = self.snapshot();
        let map = bind_object(&snapshot, self.path(), &KeyPath::root(), shape)?;
        let options = serde_json::from_value(Value::Object(map))?;
        Ok(BoundOptions {
            options,
            version: snapshot.version(),
        })
    }

    /// Binds `T` using its own shape, ignoring [`Options::SECTION`].
    pub fn bind_options<T: Options>(&self) -> Result<BoundOptions<T>, ConfigError> {
        self.bind_versioned(&T::shape())
    }
}

impl super::store::ConfigurationStore {
    /// Binds `T` from its [`Options::SECTION`].
    pub fn options<T: Options>(&self) -> Result<BoundOptions<T>, ConfigError> {
        self.get_section(T::SECTION).bind_options()
    }
}

fn bind_object(
    snapshot: &Snapshot,
    base: &KeyPath,
    relative: &KeyPath,
    shape: &OptionsShape,
) -> Result<Map<String, Value>, ConfigError> {
    let mut out = Map::new();
    for field in &shape.fields {
        let field_rel = relative.child(&field.name)?;
        let bound = bind_kind(snapshot, base, &field_rel, &field.kind)?;
        if let Some(value) = bound.or_else(|| field.default.clone()) {
            out.insert(field.name.clone(), value);
        }
    }
    Ok(out)
}

fn bind_kind(
    snapshot: &Snapshot,
    base: &KeyPath,
    relative: &KeyPath,
    kind: &FieldKind,
) -> Result<Option<Value>, ConfigError> {
    let full = base.join(relative);
    match kind {
        FieldKind::Object(shape) => {
            if snapshot.descendants(&full).next().is_none() {
                return Ok(None);
            }
            bind_object(snapshot, base, relative, shape).map(|map| Some(Value::Object(map)))
        }
        FieldKind::List(inner) => {
            let indices = list_indices(snapshot, &full);
            if indices.is_empty() {
                return Ok(None);
            }
            let mut items = Vec::with_capacity(indices.len());
            for index in indices {
                if let Some(item) = bind_kind(snapshot, base, &relative.index(index), inner)? {
                    items.push(item);
                }
            }
            Ok(Some(Value::Array(items)))
        }
        scalar => match snapshot.get(&full) {
            None => Ok(None),
            Some(raw) => convert(raw, scalar, relative),
        },
    }
}

/// Index child segments directly below `path`, ascending.
///
/// Only canonical spellings count: `"01"` or `"+1"` are not indices.
fn list_indices(snapshot: &Snapshot, path: &KeyPath) -> Vec<usize> {
    let depth = path.len();
    let mut indices: Vec<usize> = snapshot
        .descendants(path)
        .filter_map(|entry| {
            let segment = entry.path.segments().get(depth)?;
            let index: usize = segment.parse().ok()?;
            (*segment == index.to_string()).then_some(index)
        })
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

fn convert(raw: &str, kind: &FieldKind, field: &KeyPath) -> Result<Option<Value>, ConfigError> {
    let fail = || ConfigError::BindConversion {
        field: field.to_string(),
        value: raw.to_string(),
        expected: kind.describe(),
    };

    if let FieldKind::String = kind {
        return Ok(Some(Value::String(raw.to_string())));
    }
    let trimmed = raw.trim();

    let value = match kind {
        FieldKind::Integer => Value::Number(trimmed.parse::<i64>().map_err(|_| fail())?.into()),
        FieldKind::Float => {
            let parsed = trimmed.parse::<f64>().map_err(|_| fail())?;
            Value::Number(Number::from_f64(parsed).ok_or_else(fail)?)
        }
        FieldKind::Boolean => {
            if trimmed.eq_ignore_ascii_case("true") {
                Value::Bool(true)
            } else if trimmed.eq_ignore_ascii_case("false") {
                Value::Bool(false)
            } else {
                return Err(fail());
            }
        }
        _ => return Err(fail()),
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::memory::MemorySource;
    use crate::config::source::ConfigSource;
    use crate::config::store::ConfigurationStore;
    use serde::Deserialize;
    use std::sync::Arc;

    fn store(pairs: &[(&str, &str)]) -> ConfigurationStore {
        let source: Arc<dyn ConfigSource> = Arc::new(MemorySource::new(pairs.iter().copied()));
        let store = ConfigurationStore::new([source]);
        store.load().unwrap();
        store
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Wheels {
        count: i64,
        brand: String,
    }

    fn wheels_shape() -> OptionsShape {
        OptionsShape::new().integer("count").string("brand")
    }

    #[test]
    fn test_bind_converts_fields() {
        let store = store(&[("wheels:count", "3"), ("wheels:brand", "Blazin")]);
        let wheels: Wheels = store.get_section("wheels").bind_as(&wheels_shape()).unwrap();
        assert_eq!(
            wheels,
            Wheels {
                count: 3,
                brand: "Blazin".into()
            }
        );
    }

    #[test]
    fn test_bind_conversion_error_names_field_and_value() {
        let store = store(&[("wheels:count", "abc")]);
        let result = store.get_section("wheels").bind(&wheels_shape());
        match result {
            Err(ConfigError::BindConversion { field, value, expected }) => {
                assert_eq!(field, "count");
                assert_eq!(value, "abc");
                assert_eq!(expected, "integer");
            }
            other => panic!("expected BindConversion, got {other:?}"),
        }
    }

    #[test]
    fn test_absent_fields_use_defaults() {
        #[derive(Debug, Deserialize)]
        struct Flags {
            #[serde(default)]
            verbose: bool,
            retries: i64,
        }

        let store = store(&[("other", "x")]);
        let shape = OptionsShape::new()
            .boolean("verbose")
            .field_or("retries", FieldKind::Integer, 5);
        let flags: Flags = store.get_section("flags").bind_as(&shape).unwrap();
        assert!(!flags.verbose);
        assert_eq!(flags.retries, 5);
    }

    #[test]
    fn test_nested_objects_and_lists() {
        #[derive(Debug, Deserialize)]
        struct Car {
            wheels: Wheels,
            tags: Vec<String>,
            ratios: Vec<f64>,
        }

        let store = store(&[
            ("car:wheels:count", "4"),
            ("car:wheels:brand", "Blazin"),
            ("car:tags:1", "fast"),
            ("car:tags:0", "red"),
            ("car:tags:10", "last"),
            ("car:ratios:0", "2.5"),
        ]);
        let shape = OptionsShape::new()
            .object("wheels", wheels_shape())
            .list("tags", FieldKind::String)
            .list("ratios", FieldKind::Float);
        let car: Car = store.get_section("car").bind_as(&shape).unwrap();

        assert_eq!(car.wheels.count, 4);
        assert_eq!(car.tags, vec!["red", "fast", "last"]);
        assert_eq!(car.ratios, vec![2.5]);
    }

    #[test]
    fn test_nested_conversion_error_uses_full_field_path() {
        let store = store(&[("car:wheels:count", "many")]);
        let shape = OptionsShape::new().object("wheels", wheels_shape());
        match store.get_section("car").bind(&shape) {
            Err(ConfigError::BindConversion { field, .. }) => assert_eq!(field, "wheels:count"),
            other => panic!("expected BindConversion, got {other:?}"),
        }
    }

    #[test]
    fn test_booleans_ignore_case() {
        let store = store(&[("f:a", "TRUE"), ("f:b", "False")]);
        let shape = OptionsShape::new().boolean("a").boolean("b");
        let map = store.get_section("f").bind(&shape).unwrap();
        assert_eq!(map["a"], Value::Bool(true));
        assert_eq!(map["b"], Value::Bool(false));
    }

    #[test]
    fn test_empty_value_is_not_unset() {
        let store = store(&[("wheels:count", ""), ("wheels:brand", "")]);
        assert_eq!(store.get("wheels:count").as_deref(), Some(""));

        let shape = OptionsShape::new()
            .field_or("count", FieldKind::Integer, 4)
            .string("brand");
        match store.get_section("wheels").bind(&shape) {
            Err(ConfigError::BindConversion { field, value, expected }) => {
                assert_eq!(field, "count");
                assert_eq!(value, "");
                assert_eq!(expected, "integer");
            }
            other => panic!("expected BindConversion, got {other:?}"),
        }

        let brand = store
            .get_section("wheels")
            .bind(&OptionsShape::new().string("brand"))
            .unwrap();
        assert_eq!(brand["brand"], Value::String(String::new()));
    }

    #[test]
    fn test_list_ignores_non_canonical_indices() {
        let store = store(&[
            ("car:tags:0", "red"),
            ("car:tags:01", "padded"),
            ("car:tags:+1", "signed"),
            ("car:tags:1", "fast"),
        ]);
        let map = store
            .get_section("car")
            .bind(&OptionsShape::new().list("tags", FieldKind::String))
            .unwrap();
        assert_eq!(map["tags"], serde_json::json!(["red", "fast"]));
    }

    #[test]
    fn test_field_lookup_ignores_case() {
        let store = store(&[("Wheels:Count", "3"), ("Wheels:BRAND", "x")]);
        let wheels: Wheels = store.get_section("wheels").bind_as(&wheels_shape()).unwrap();
        assert_eq!(wheels.count, 3);
    }

    #[test]
    fn test_missing_required_field_fails_deserialize() {
        let store = store(&[("wheels:brand", "x")]);
        let result: Result<Wheels, _> = store.get_section("wheels").bind_as(&wheels_shape());
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn test_options_trait_binds_from_its_section() {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Local {
            authority: String,
            client_id: String,
        }

        impl Options for Local {
            const SECTION: &'static str = "Local";

            fn shape() -> OptionsShape {
                OptionsShape::new().string("Authority").string("ClientId")
            }
        }

        let store = store(&[
            ("Local:Authority", "https://login.example"),
            ("Local:ClientId", "abc"),
        ]);
        let local = store.options::<Local>().unwrap();
        assert_eq!(local.authority, "https://login.example");
        assert_eq!(local.client_id, "abc");
        assert_eq!(local.version(), 1);
    }

    #[test]
    fn test_bound_options_are_a_snapshot() {
        let store = store(&[("wheels:count", "3"), ("wheels:brand", "a")]);
        let before: Wheels = store.get_section("wheels").bind_as(&wheels_shape()).unwrap();
        store
            .push_source(Arc::new(MemorySource::new([("wheels:count", "9")])))
            .unwrap();
        assert_eq!(before.count, 3);
    }
}
