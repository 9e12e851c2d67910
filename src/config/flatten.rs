//! Projection of an evaluated value tree onto flat property paths.
//!
//! Paths use `.` for object and mapping descent and `[n]` for sequence
//! descent, e.g. `servers[2].endpoints.health`. Composite values never add a
//! segment of their own: their properties land directly under the parent path.

use std::fmt;

use indexmap::IndexMap;

use super::property::{EmptyContainer, PropertyValue};
use super::value::{Composite, Value};

/// Flattened properties in traversal order.
pub type Properties = IndexMap<String, PropertyValue>;

/// Flattens the top-level properties of an evaluated module.
pub fn flatten_module(module: &Composite) -> Properties {
    let mut result = Properties::new();
    for (name, value) in module.properties() {
        flatten(name.clone(), value, &mut result);
    }
    result
}

/// Lowers `value` into `result` under `path`.
///
/// Scalars and nulls produce one entry each. Empty mappings and empty
/// sequences produce one marker entry; non-empty containers only contribute
/// their children.
pub fn flatten(path: String, value: &Value, result: &mut Properties) {
    match value {
        Value::Composite(composite) => flatten_entries(path, composite.properties().iter(), result),
        Value::Mapping(entries) => {
            flatten_entries(path, entries.iter().map(|(key, value)| (key, value)), result)
        }
        Value::Sequence(kind, elements) => {
            if elements.is_empty() {
                result.insert(path, PropertyValue::Empty(EmptyContainer::from(*kind)));
                return;
            }
            for (index, element) in elements.iter().enumerate() {
                flatten(format!("{path}[{index}]"), element, result);
            }
        }
        Value::Scalar(scalar) => {
            result.insert(path, PropertyValue::Scalar(scalar.clone()));
        }
        Value::Null => {
            result.insert(path, PropertyValue::Null);
        }
    }
}

fn flatten_entries<'a, K>(
    path: String,
    entries: impl ExactSizeIterator<Item = (&'a K, &'a Value)>,
    result: &mut Properties,
) where
    K: fmt::Display + 'a,
{
    if entries.len() == 0 {
        result.insert(path, PropertyValue::Empty(EmptyContainer::Mapping));
        return;
    }
    for (key, value) in entries {
        flatten(format!("{path}.{key}"), value, result);
    }
}
