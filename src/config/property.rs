//! Flattened properties and the named sources that hold them.

use std::fmt;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::value::{Scalar, SequenceKind};

/// Kind of container recorded at a path that held an empty container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmptyContainer {
    Mapping,
    List,
    Set,
}

impl From<SequenceKind> for EmptyContainer {
    fn from(kind: SequenceKind) -> Self {
        match kind {
            SequenceKind::List => EmptyContainer::List,
            SequenceKind::Set => EmptyContainer::Set,
        }
    }
}

impl fmt::Display for EmptyContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EmptyContainer::Mapping => "mapping",
            EmptyContainer::List => "list",
            EmptyContainer::Set => "set",
        })
    }
}

/// Value stored at a flattened path.
///
/// A path that is not present at all is represented by the lookup returning
/// `None`, so null, empty containers and absence stay distinguishable.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Scalar(Scalar),
    Null,
    Empty(EmptyContainer),
}

impl PropertyValue {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            PropertyValue::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropertyValue::Scalar(scalar) => scalar.serialize(serializer),
            PropertyValue::Null => serializer.serialize_none(),
            PropertyValue::Empty(EmptyContainer::Mapping) => {
                serializer.serialize_map(Some(0))?.end()
            }
            PropertyValue::Empty(EmptyContainer::List | EmptyContainer::Set) => {
                serializer.serialize_seq(Some(0))?.end()
            }
        }
    }
}

/// A named, insertion-ordered layer of flattened properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySource {
    name: String,
    properties: IndexMap<String, PropertyValue>,
}

impl PropertySource {
    pub fn new(name: impl Into<String>, properties: IndexMap<String, PropertyValue>) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a path. `Some(&PropertyValue::Null)` means the path holds null.
    pub fn get(&self, path: &str) -> Option<&PropertyValue> {
        self.properties.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.properties.contains_key(path)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(path, value)| (path.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
