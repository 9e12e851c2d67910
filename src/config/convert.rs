//! Typed conversion of flattened property values through `serde`.
//!
//! A scalar deserializes as itself, with strings parsed on demand for numeric
//! and boolean targets, split on commas for sequence targets and matched
//! against unit variants for enum targets. Null only satisfies `Option`. The
//! list and set markers read as an empty sequence (or an empty string), and
//! the mapping marker reads as an empty map.

use serde::de::value::{Error, MapDeserializer, SeqDeserializer, StringDeserializer};
use serde::de::{self, DeserializeOwned, IntoDeserializer, Unexpected, Visitor};
use serde::{forward_to_deserialize_any, Deserializer};

use super::property::{EmptyContainer, PropertyValue};
use super::value::Scalar;
use super::ConfigError;

/// Deserializes `value`, read at `path`, into `T`.
pub(crate) fn from_property<T: DeserializeOwned>(
    path: &str,
    value: PropertyValue,
) -> Result<T, ConfigError> {
    T::deserialize(PropertyDeserializer::new(value)).map_err(|e| conversion_error::<T>(path, e))
}

/// Deserializes the indexed elements `path[0]`, `path[1]`, ... into `T`.
pub(crate) fn from_elements<T: DeserializeOwned>(
    path: &str,
    elements: Vec<PropertyValue>,
) -> Result<T, ConfigError> {
    T::deserialize(SeqDeserializer::<_, Error>::new(elements.into_iter()))
        .map_err(|e| conversion_error::<T>(path, e))
}

fn conversion_error<T>(path: &str, reason: Error) -> ConfigError {
    ConfigError::Conversion {
        path: path.to_string(),
        target: std::any::type_name::<T>(),
        reason: reason.to_string(),
    }
}

/// A [`Deserializer`] over one flattened property value.
///
/// ```
/// use pkl_props::config::{PropertyDeserializer, PropertyValue, Scalar};
/// use serde::Deserialize;
///
/// let value = PropertyValue::Scalar(Scalar::from("80, 443"));
/// let ports = Vec::<u16>::deserialize(PropertyDeserializer::new(value)).unwrap();
/// assert_eq!(ports, [80, 443]);
/// ```
#[derive(Debug, Clone)]
pub struct PropertyDeserializer {
    value: PropertyValue,
}

impl PropertyDeserializer {
    pub fn new(value: PropertyValue) -> Self {
        Self { value }
    }
}

impl<'de> IntoDeserializer<'de, Error> for PropertyValue {
    type Deserializer = PropertyDeserializer;

    fn into_deserializer(self) -> PropertyDeserializer {
        PropertyDeserializer::new(self)
    }
}

fn empty_seq<'de, V: Visitor<'de>>(visitor: V) -> Result<V::Value, Error> {
    SeqDeserializer::<_, Error>::new(std::iter::empty::<PropertyValue>()).deserialize_any(visitor)
}

fn empty_map<'de, V: Visitor<'de>>(visitor: V) -> Result<V::Value, Error> {
    MapDeserializer::<_, Error>::new(std::iter::empty::<(String, PropertyValue)>())
        .deserialize_any(visitor)
}

macro_rules! forward_to_scalar {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                match self.value {
                    PropertyValue::Scalar(scalar) => ScalarDeserializer(scalar).$method(visitor),
                    _ => self.deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for PropertyDeserializer {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            PropertyValue::Scalar(scalar) => ScalarDeserializer(scalar).deserialize_any(visitor),
            PropertyValue::Null => visitor.visit_unit(),
            PropertyValue::Empty(EmptyContainer::Mapping) => empty_map(visitor),
            PropertyValue::Empty(EmptyContainer::List | EmptyContainer::Set) => empty_seq(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            PropertyValue::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            PropertyValue::Scalar(scalar) => visitor.visit_string(scalar.to_string()),
            PropertyValue::Empty(EmptyContainer::List | EmptyContainer::Set) => {
                visitor.visit_str("")
            }
            PropertyValue::Empty(EmptyContainer::Mapping) => {
                Err(de::Error::invalid_type(Unexpected::Map, &visitor))
            }
            PropertyValue::Null => Err(de::Error::invalid_type(Unexpected::Unit, &visitor)),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            PropertyValue::Scalar(scalar) => ScalarDeserializer(scalar).deserialize_seq(visitor),
            PropertyValue::Empty(EmptyContainer::List | EmptyContainer::Set) => empty_seq(visitor),
            PropertyValue::Empty(EmptyContainer::Mapping) => {
                Err(de::Error::invalid_type(Unexpected::Map, &visitor))
            }
            PropertyValue::Null => Err(de::Error::invalid_type(Unexpected::Unit, &visitor)),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            PropertyValue::Empty(EmptyContainer::Mapping) => empty_map(visitor),
            PropertyValue::Empty(EmptyContainer::List | EmptyContainer::Set) => {
                Err(de::Error::invalid_type(Unexpected::Seq, &visitor))
            }
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.value {
            PropertyValue::Scalar(scalar) => {
                ScalarDeserializer(scalar).deserialize_enum(name, variants, visitor)
            }
            _ => self.deserialize_any(visitor),
        }
    }

    forward_to_scalar! {
        deserialize_bool deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_f32 deserialize_f64 deserialize_char
    }

    forward_to_deserialize_any! {
        i128 u128 bytes byte_buf unit unit_struct tuple_struct struct identifier ignored_any
    }
}

/// A [`Deserializer`] over one scalar.
struct ScalarDeserializer(Scalar);

impl ScalarDeserializer {
    fn deserialize_integer<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            Scalar::Integer(i) => visitor.visit_i64(i),
            Scalar::String(s) => {
                let text = s.trim();
                if let Ok(i) = text.parse::<i64>() {
                    visitor.visit_i64(i)
                } else if let Ok(u) = text.parse::<u64>() {
                    visitor.visit_u64(u)
                } else {
                    Err(de::Error::invalid_value(Unexpected::Str(&s), &visitor))
                }
            }
            other => ScalarDeserializer(other).deserialize_any(visitor),
        }
    }
}

macro_rules! forward_to_integer {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                self.deserialize_integer(visitor)
            }
        )*
    };
}

impl<'de> Deserializer<'de> for ScalarDeserializer {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            Scalar::String(s) | Scalar::Other(s) => visitor.visit_string(s),
            Scalar::Boolean(b) => visitor.visit_bool(b),
            Scalar::Integer(i) => visitor.visit_i64(i),
            Scalar::Float(x) => visitor.visit_f64(x),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match &self.0 {
            Scalar::String(s) if s.trim().eq_ignore_ascii_case("true") => visitor.visit_bool(true),
            Scalar::String(s) if s.trim().eq_ignore_ascii_case("false") => {
                visitor.visit_bool(false)
            }
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            Scalar::String(s) => match s.trim().parse::<f64>() {
                Ok(x) => visitor.visit_f64(x),
                Err(_) => Err(de::Error::invalid_value(Unexpected::Str(&s), &visitor)),
            },
            other => ScalarDeserializer(other).deserialize_any(visitor),
        }
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_string(self.0.to_string())
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_some(self)
    }

    /// Comma-separated strings split into elements; other scalars are a
    /// single element.
    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let elements: Vec<Scalar> = match self.0 {
            Scalar::String(s) if s.trim().is_empty() => Vec::new(),
            Scalar::String(s) => s
                .split(',')
                .map(|part| Scalar::String(part.trim().to_string()))
                .collect(),
            other => vec![other],
        };
        SeqDeserializer::<_, Error>::new(elements.into_iter().map(ScalarDeserializer))
            .deserialize_any(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.0 {
            Scalar::String(s) | Scalar::Other(s) => {
                let variant: StringDeserializer<Error> = s.trim().to_string().into_deserializer();
                visitor.visit_enum(variant)
            }
            other => ScalarDeserializer(other).deserialize_any(visitor),
        }
    }

    forward_to_integer! {
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
    }

    forward_to_deserialize_any! {
        i128 u128 bytes byte_buf unit unit_struct tuple_struct map struct identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, Error> for ScalarDeserializer {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}
