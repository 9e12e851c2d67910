//! In-memory model of an evaluated configuration module.
//!
//! The variant set is closed: every value an evaluator hands back is one of
//! [`Value::Null`], [`Value::Scalar`], [`Value::Composite`], [`Value::Mapping`]
//! or [`Value::Sequence`].

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

/// An atomic configuration value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Boolean(bool),
    Integer(i64),
    Float(f64),
    /// Any other printable atom (durations, data sizes, datetimes), kept in textual form.
    Other(String),
}

/// Canonical textual form, used both for property values and for mapping keys
/// in property paths.
///
/// Integers are decimal, booleans are `true`/`false`, integral floats keep a
/// trailing `.0`, and non-finite floats print as `NaN`, `Infinity` or `-Infinity`.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) | Scalar::Other(s) => f.write_str(s),
            Scalar::Boolean(b) => write!(f, "{b}"),
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Float(x) => format_float(*x, f),
        }
    }
}

fn format_float(x: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if x.is_nan() {
        f.write_str("NaN")
    } else if x.is_infinite() {
        f.write_str(if x > 0.0 { "Infinity" } else { "-Infinity" })
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        write!(f, "{x:.1}")
    } else {
        write!(f, "{x}")
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Boolean(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Integer(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Integer(i64::from(i))
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Scalar::Float(x)
    }
}

/// Whether a sequence carries list or set semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    List,
    Set,
}

/// A named record with properties in declaration order.
///
/// Produced for modules and for typed or dynamic objects.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composite {
    class_name: String,
    properties: IndexMap<String, Value>,
}

impl Composite {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            properties: IndexMap::new(),
        }
    }

    /// Adds a property, keeping declaration order.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Reinterprets an evaluated root value as a module.
    ///
    /// Mappings are accepted since TOML tables arrive as mappings; keys take
    /// their canonical textual form. Returns `None` for any other variant.
    pub fn from_value(class_name: impl Into<String>, value: Value) -> Option<Self> {
        match value {
            Value::Composite(composite) => Some(composite),
            Value::Mapping(entries) => Some(Self {
                class_name: class_name.into(),
                properties: entries
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), value))
                    .collect(),
            }),
            _ => None,
        }
    }
}

/// A fully evaluated configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit absence, distinct from a property that is not declared.
    Null,
    Scalar(Scalar),
    Composite(Composite),
    /// Key/value container in its own iteration order.
    Mapping(Vec<(Scalar, Value)>),
    Sequence(SequenceKind, Vec<Value>),
}

impl Value {
    pub fn list<I, V>(elements: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Sequence(
            SequenceKind::List,
            elements.into_iter().map(Into::into).collect(),
        )
    }

    /// Builds a set. Elements are expected to be unique already.
    pub fn set<I, V>(elements: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Sequence(
            SequenceKind::Set,
            elements.into_iter().map(Into::into).collect(),
        )
    }

    pub fn mapping<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Scalar>,
        V: Into<Value>,
    {
        Value::Mapping(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

macro_rules! value_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Scalar(Scalar::from(v))
                }
            }
        )*
    };
}

value_from_scalar!(&str, String, bool, i64, i32, f64);

impl From<Composite> for Value {
    fn from(composite: Composite) -> Self {
        Value::Composite(composite)
    }
}

impl From<toml::Value> for Value {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => Value::Scalar(Scalar::String(s)),
            toml::Value::Integer(i) => Value::Scalar(Scalar::Integer(i)),
            toml::Value::Float(x) => Value::Scalar(Scalar::Float(x)),
            toml::Value::Boolean(b) => Value::Scalar(Scalar::Boolean(b)),
            toml::Value::Datetime(dt) => Value::Scalar(Scalar::Other(dt.to_string())),
            toml::Value::Array(elements) => Value::list(elements),
            toml::Value::Table(table) => Value::Mapping(
                table
                    .into_iter()
                    .map(|(key, value)| (Scalar::String(key), Value::from(value)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_canonical_text() {
        assert_eq!(Scalar::Integer(-42).to_string(), "-42");
        assert_eq!(Scalar::Boolean(true).to_string(), "true");
        assert_eq!(Scalar::Float(1.23).to_string(), "1.23");
        assert_eq!(Scalar::Float(3.0).to_string(), "3.0");
        assert_eq!(Scalar::Float(f64::NAN).to_string(), "NaN");
        assert_eq!(Scalar::Float(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Scalar::Other("3.h".into()).to_string(), "3.h");
    }

    #[test]
    fn test_composite_from_mapping() {
        let value = Value::mapping([("host", Value::from("localhost")), ("port", 8080.into())]);
        let module = Composite::from_value("app", value).unwrap();

        assert_eq!(module.class_name(), "app");
        assert_eq!(module.get("port"), Some(&Value::from(8080)));
        let names: Vec<&str> = module.properties().keys().map(String::as_str).collect();
        assert_eq!(names, ["host", "port"]);
    }

    #[test]
    fn test_composite_from_non_object() {
        assert!(Composite::from_value("app", Value::list([1, 2])).is_none());
        assert!(Composite::from_value("app", Value::Null).is_none());
    }

    #[test]
    fn test_from_toml_value() {
        let table: toml::Table = toml::from_str(
            r#"
            when = 1979-05-27T07:32:00Z
            ports = [80, 443]

            [server]
            host = "example.com"
            "#,
        )
        .unwrap();
        let value = Value::from(toml::Value::Table(table));

        let module = Composite::from_value("defaults", value).unwrap();
        assert_eq!(
            module.get("when"),
            Some(&Value::Scalar(Scalar::Other("1979-05-27T07:32:00Z".into())))
        );
        assert_eq!(module.get("ports"), Some(&Value::list([80, 443])));
        assert_eq!(
            module.get("server"),
            Some(&Value::mapping([("host", "example.com")]))
        );
    }
}
