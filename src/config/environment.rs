//! Layered property lookup.
//!
//! Sources are consulted from the most recently added to the first added, so
//! a later source overrides an earlier one path by path.
//!
//! String values can reference other properties using `${path.to.field}`
//! syntax; `$$` produces a literal `$`.

use serde::de::DeserializeOwned;

use super::convert::{from_elements, from_property};
use super::property::{PropertySource, PropertyValue};
use super::value::Scalar;
use super::ConfigError;

const MAX_REFERENCE_DEPTH: usize = 32;

/// The property sources of an application, in precedence order.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    sources: Vec<PropertySource>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source that takes precedence over every source added before it.
    pub fn add_source(&mut self, source: PropertySource) {
        self.sources.push(source);
    }

    /// Sources from highest to lowest precedence.
    pub fn sources(&self) -> impl Iterator<Item = &PropertySource> {
        self.sources.iter().rev()
    }

    pub fn source(&self, name: &str) -> Option<&PropertySource> {
        self.sources().find(|source| source.name() == name)
    }

    /// Raw value at `path` from the highest-precedence source declaring it.
    pub fn find(&self, path: &str) -> Option<&PropertyValue> {
        self.sources().find_map(|source| source.get(path))
    }

    /// Whether any source declares `path`, including as null.
    pub fn contains_property(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    /// String form of a property. Null and absent properties read as `None`.
    pub fn get_property(&self, path: &str) -> Result<Option<String>, ConfigError> {
        match self.find(path) {
            Some(value) => self.convert(path, value),
            None => Ok(None),
        }
    }

    pub fn get_required_property(&self, path: &str) -> Result<String, ConfigError> {
        self.get_property(path)?
            .ok_or_else(|| ConfigError::MissingProperty(path.to_string()))
    }

    /// Typed form of a property, deserialized through [`PropertyDeserializer`].
    ///
    /// Null only satisfies `Option` targets, so `Option<T>` yields `Some(None)`
    /// where other targets yield `None`. A path that is not declared itself
    /// but has indexed elements `path[0]`, `path[1]`, ... binds those elements
    /// as a sequence.
    ///
    /// [`PropertyDeserializer`]: super::PropertyDeserializer
    pub fn get_property_as<T>(&self, path: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.find(path) {
            Some(value) => self.convert(path, value),
            None => self.convert_elements(path),
        }
    }

    pub fn get_required_property_as<T>(&self, path: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        self.get_property_as(path)?
            .ok_or_else(|| ConfigError::MissingProperty(path.to_string()))
    }

    /// Resolves `${...}` references in `text` against this environment.
    pub fn resolve_placeholders(&self, text: &str) -> Result<String, ConfigError> {
        self.resolve_string(text, 0)
    }

    fn convert<T: DeserializeOwned>(
        &self,
        path: &str,
        value: &PropertyValue,
    ) -> Result<Option<T>, ConfigError> {
        match value {
            PropertyValue::Null => Ok(from_property(path, PropertyValue::Null).ok()),
            value => from_property(path, self.resolve_value(value)?).map(Some),
        }
    }

    fn convert_elements<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ConfigError> {
        let mut elements = Vec::new();
        while let Some(value) = self.find(&format!("{path}[{}]", elements.len())) {
            elements.push(self.resolve_value(value)?);
        }
        if elements.is_empty() {
            return Ok(None);
        }
        from_elements(path, elements).map(Some)
    }

    fn resolve_value(&self, value: &PropertyValue) -> Result<PropertyValue, ConfigError> {
        match value {
            PropertyValue::Scalar(Scalar::String(s)) if s.contains('$') => {
                Ok(PropertyValue::Scalar(Scalar::String(self.resolve_string(s, 0)?)))
            }
            value => Ok(value.clone()),
        }
    }

    fn resolve_string(&self, s: &str, depth: usize) -> Result<String, ConfigError> {
        if depth > MAX_REFERENCE_DEPTH {
            return Err(ConfigError::CircularReference);
        }

        let mut result = String::with_capacity(s.len());
        let mut chars = s.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != '$' {
                result.push(ch);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let path =
                        consume_until(&mut chars, '}').ok_or(ConfigError::UnclosedReference)?;
                    result.push_str(&self.lookup_reference(path.trim(), depth)?);
                }
                _ => result.push('$'),
            }
        }

        Ok(result)
    }

    fn lookup_reference(&self, path: &str, depth: usize) -> Result<String, ConfigError> {
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(ConfigError::InvalidReferencePath(path.to_string()));
        }
        match self.find(path) {
            Some(PropertyValue::Scalar(Scalar::String(s))) => self.resolve_string(s, depth + 1),
            Some(PropertyValue::Scalar(scalar)) => Ok(scalar.to_string()),
            Some(PropertyValue::Empty(_)) => {
                Err(ConfigError::NonScalarReference(path.to_string()))
            }
            Some(PropertyValue::Null) | None => {
                Err(ConfigError::ReferenceNotFound(path.to_string()))
            }
        }
    }
}

/// Consumes characters until the delimiter, returning the collected string.
fn consume_until(chars: &mut std::iter::Peekable<std::str::Chars>, delim: char) -> Option<String> {
    let mut result = String::new();
    for ch in chars.by_ref() {
        if ch == delim {
            return Some(result);
        }
        result.push(ch);
    }
    None
}
