//! Messages exchanged with `pkl server` and the binary value encoding carried
//! in evaluation results.
//!
//! Every message is a MessagePack array `[code, body]` where `body` is a map
//! with camel-cased keys. Evaluation results are themselves MessagePack: a
//! primitive, `nil`, or an array tagged with a type code.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Serialize;

use super::value::{Composite, Scalar, SequenceKind, Value};

pub(crate) const CREATE_EVALUATOR_REQUEST: u8 = 0x20;
pub(crate) const CREATE_EVALUATOR_RESPONSE: u8 = 0x21;
pub(crate) const CLOSE_EVALUATOR: u8 = 0x22;
pub(crate) const EVALUATE_REQUEST: u8 = 0x23;
pub(crate) const EVALUATE_RESPONSE: u8 = 0x24;
pub(crate) const LOG_MESSAGE: u8 = 0x25;

const OBJECT: u8 = 0x01;
const MAP: u8 = 0x02;
const MAPPING: u8 = 0x03;
const LIST: u8 = 0x04;
const LISTING: u8 = 0x05;
const SET: u8 = 0x06;
const DURATION: u8 = 0x07;
const DATA_SIZE: u8 = 0x08;
const PAIR: u8 = 0x09;
const INT_SEQ: u8 = 0x0A;
const REGEX: u8 = 0x0B;

const PROPERTY: u8 = 0x10;
const ENTRY: u8 = 0x11;
const ELEMENT: u8 = 0x12;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateEvaluatorRequest {
    pub request_id: i64,
    pub allowed_modules: Vec<String>,
    pub allowed_resources: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub module_paths: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EvaluateRequest<'a> {
    pub request_id: i64,
    pub evaluator_id: i64,
    pub module_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_text: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CloseEvaluator {
    pub evaluator_id: i64,
}

/// Body of any message sent by the server. Fields a message kind does not
/// carry stay `None`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ServerMessage {
    pub request_id: Option<i64>,
    pub evaluator_id: Option<i64>,
    pub result: Option<ResultBytes>,
    pub error: Option<String>,
    pub level: Option<i64>,
    pub message: Option<String>,
    pub frame_uri: Option<String>,
}

/// The `bin` payload of an evaluate response.
#[derive(Debug, Default)]
pub(crate) struct ResultBytes(pub Vec<u8>);

impl<'de> Deserialize<'de> for ResultBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BytesVisitor;

        impl<'de> Visitor<'de> for BytesVisitor {
            type Value = ResultBytes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a byte array")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<ResultBytes, E> {
                Ok(ResultBytes(v.to_vec()))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<ResultBytes, E> {
                Ok(ResultBytes(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ResultBytes, A::Error> {
                let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(byte) = seq.next_element()? {
                    bytes.push(byte);
                }
                Ok(ResultBytes(bytes))
            }
        }

        deserializer.deserialize_bytes(BytesVisitor)
    }
}

/// Decodes an evaluation result into a value tree.
///
/// Typed and dynamic objects become composites, except that a dynamic object
/// holding only elements is a list and one holding only entries is a
/// mapping. Maps and mappings become mappings; lists and listings become
/// lists; sets keep their kind. Durations and data sizes become atoms in
/// their literal form (`3.h`, `1.23.gb`), a regex becomes its pattern, and a
/// pair becomes a two-element list.
pub(crate) fn decode_value(bytes: &[u8]) -> Result<Value, rmp_serde::decode::Error> {
    rmp_serde::from_slice::<Decoded>(bytes).map(|decoded| decoded.0)
}

struct Decoded(Value);

impl<'de> Deserialize<'de> for Decoded {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor).map(Decoded)
    }
}

fn next<'de, T, A>(seq: &mut A, what: &str) -> Result<T, A::Error>
where
    T: Deserialize<'de>,
    A: SeqAccess<'de>,
{
    seq.next_element()?
        .ok_or_else(|| de::Error::custom(format_args!("missing {what}")))
}

fn drain<'de, A: SeqAccess<'de>>(seq: &mut A) -> Result<(), A::Error> {
    while seq.next_element::<IgnoredAny>()?.is_some() {}
    Ok(())
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a pkl value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Scalar(Scalar::Boolean(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Scalar(Scalar::Integer(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Scalar(match i64::try_from(v) {
            Ok(i) => Scalar::Integer(i),
            Err(_) => Scalar::Other(v.to_string()),
        }))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Scalar(Scalar::Float(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Scalar(Scalar::String(v.to_string())))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::Scalar(Scalar::String(v)))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let code: u8 = next(&mut seq, "type code")?;
        let value = match code {
            OBJECT => {
                let class_name: String = next(&mut seq, "class name")?;
                let _module_uri: IgnoredAny = next(&mut seq, "module uri")?;
                let members: Vec<Member> = next(&mut seq, "object members")?;
                object(class_name, members).map_err(de::Error::custom)?
            }
            MAP | MAPPING => {
                let entries: Entries = next(&mut seq, "entries")?;
                Value::Mapping(entries.0)
            }
            LIST | LISTING | SET => {
                let elements: Vec<Decoded> = next(&mut seq, "elements")?;
                let kind = if code == SET {
                    SequenceKind::Set
                } else {
                    SequenceKind::List
                };
                Value::Sequence(kind, elements.into_iter().map(|e| e.0).collect())
            }
            DURATION | DATA_SIZE => {
                let amount: f64 = next(&mut seq, "amount")?;
                let unit: String = next(&mut seq, "unit")?;
                Value::Scalar(Scalar::Other(quantity(amount, &unit)))
            }
            PAIR => {
                let first: Decoded = next(&mut seq, "first pair element")?;
                let second: Decoded = next(&mut seq, "second pair element")?;
                Value::list([first.0, second.0])
            }
            INT_SEQ => {
                let start: i64 = next(&mut seq, "start")?;
                let end: i64 = next(&mut seq, "end")?;
                let step: i64 = next(&mut seq, "step")?;
                Value::Scalar(Scalar::Other(format!("IntSeq({start}, {end}, {step})")))
            }
            REGEX => {
                let pattern: String = next(&mut seq, "pattern")?;
                Value::Scalar(Scalar::Other(pattern))
            }
            other => {
                return Err(de::Error::custom(format_args!(
                    "unsupported value type {other:#04x}"
                )))
            }
        };
        drain(&mut seq)?;
        Ok(value)
    }
}

/// `3.0` and `"h"` print as `3.h`; `1.23` and `"gb"` as `1.23.gb`.
fn quantity(amount: f64, unit: &str) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e16 {
        format!("{}.{unit}", amount as i64)
    } else {
        format!("{amount}.{unit}")
    }
}

fn scalar_key(key: Value) -> Result<Scalar, String> {
    match key {
        Value::Scalar(scalar) => Ok(scalar),
        _ => Err("map keys must be primitive values".to_string()),
    }
}

struct Entries(Vec<(Scalar, Value)>);

impl<'de> Deserialize<'de> for Entries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = Entries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of pkl values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Entries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(Decoded(key)) = map.next_key()? {
                    let key = scalar_key(key).map_err(de::Error::custom)?;
                    let Decoded(value) = map.next_value()?;
                    entries.push((key, value));
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

enum Member {
    Property(String, Value),
    Entry(Value, Value),
    Element(Value),
}

impl<'de> Deserialize<'de> for Member {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MemberVisitor;

        impl<'de> Visitor<'de> for MemberVisitor {
            type Value = Member;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object member")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Member, A::Error> {
                let code: u8 = next(&mut seq, "member code")?;
                let member = match code {
                    PROPERTY => {
                        let name: String = next(&mut seq, "property name")?;
                        let Decoded(value) = next(&mut seq, "property value")?;
                        Member::Property(name, value)
                    }
                    ENTRY => {
                        let Decoded(key) = next(&mut seq, "entry key")?;
                        let Decoded(value) = next(&mut seq, "entry value")?;
                        Member::Entry(key, value)
                    }
                    ELEMENT => {
                        let _index: IgnoredAny = next(&mut seq, "element index")?;
                        let Decoded(value) = next(&mut seq, "element value")?;
                        Member::Element(value)
                    }
                    other => {
                        return Err(de::Error::custom(format_args!(
                            "unsupported object member {other:#04x}"
                        )))
                    }
                };
                drain(&mut seq)?;
                Ok(member)
            }
        }

        deserializer.deserialize_seq(MemberVisitor)
    }
}

fn object(class_name: String, members: Vec<Member>) -> Result<Value, String> {
    let mut properties = Vec::new();
    let mut entries = Vec::new();
    let mut elements = Vec::new();
    for member in members {
        match member {
            Member::Property(name, value) => properties.push((name, value)),
            Member::Entry(key, value) => entries.push((scalar_key(key)?, value)),
            Member::Element(value) => elements.push(value),
        }
    }

    if properties.is_empty() && entries.is_empty() && !elements.is_empty() {
        return Ok(Value::Sequence(SequenceKind::List, elements));
    }
    if properties.is_empty() && elements.is_empty() && !entries.is_empty() {
        return Ok(Value::Mapping(entries));
    }

    let mut composite = Composite::new(class_name);
    for (name, value) in properties {
        composite.insert(name, value);
    }
    for (key, value) in entries {
        composite.insert(key.to_string(), value);
    }
    for (index, value) in elements.into_iter().enumerate() {
        composite.insert(index.to_string(), value);
    }
    Ok(Value::Composite(composite))
}
