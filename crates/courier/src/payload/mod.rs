//! Canonical tree form for structured net command payloads.
//!
//! Inbound `data` objects are normalised depth-first into [`NormalizedValue`]
//! trees made of mappings, ordered sequences and scalars. Normalisation works
//! from a decoded [`serde_json::Value`] via [`normalize`], or directly from any
//! `serde` data format through the [`Deserialize`] implementation. Mapping keys
//! that are not plain strings are dropped without failing the conversion.
//!
//! Inputs are assumed to be finite trees; wire payloads cannot express cycles.

mod de;

use std::collections::BTreeMap;

use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// Mapping from field name to normalised value.
pub type Mapping = BTreeMap<String, NormalizedValue>;

/// Leaf value of a normalised tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Explicit null.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer representable as `i64`.
    Integer(i64),
    /// Integer above `i64::MAX`.
    Unsigned(u64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
}

/// Normalised structured value.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedValue {
    /// Leaf value.
    Scalar(Scalar),
    /// Ordered sequence.
    Sequence(Vec<NormalizedValue>),
    /// String-keyed mapping.
    Mapping(Mapping),
}

/// Normalises a decoded JSON value.
pub fn normalize(value: &Value) -> NormalizedValue {
    match value {
        Value::Null => NormalizedValue::Scalar(Scalar::Null),
        Value::Bool(flag) => NormalizedValue::Scalar(Scalar::Bool(*flag)),
        Value::Number(number) => NormalizedValue::Scalar(number_scalar(number)),
        Value::String(text) => NormalizedValue::Scalar(Scalar::Text(text.clone())),
        Value::Array(items) => NormalizedValue::Sequence(items.iter().map(normalize).collect()),
        Value::Object(object) => NormalizedValue::Mapping(normalize_object(object)),
    }
}

/// Normalises a decoded JSON object into a mapping.
pub fn normalize_object(object: &Map<String, Value>) -> Mapping {
    object
        .iter()
        .map(|(key, value)| (key.clone(), normalize(value)))
        .collect()
}

fn number_scalar(number: &Number) -> Scalar {
    if let Some(value) = number.as_i64() {
        Scalar::Integer(value)
    } else if let Some(value) = number.as_u64() {
        Scalar::Unsigned(value)
    } else {
        // serde_json numbers are always one of i64, u64 or f64.
        Scalar::Float(number.as_f64().unwrap_or(f64::NAN))
    }
}

impl NormalizedValue {
    /// Shorthand for a null scalar.
    pub const NULL: Self = Self::Scalar(Scalar::Null);

    /// Returns the mapping when this value is one.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    /// Returns the sequence when this value is one.
    pub fn as_sequence(&self) -> Option<&[NormalizedValue]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the scalar when this value is one.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Returns the text of a text scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self.as_scalar()? {
            Scalar::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns an integer scalar as `i64` when it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self.as_scalar()? {
            Scalar::Integer(value) => Some(*value),
            Scalar::Unsigned(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// Returns any numeric scalar as `f64`.
    ///
    /// Integers beyond 2^53 in magnitude round to the nearest `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self.as_scalar()? {
            Scalar::Integer(value) => Some(*value as f64),
            Scalar::Unsigned(value) => Some(*value as f64),
            Scalar::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the flag of a boolean scalar.
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_scalar()? {
            Scalar::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns `true` for the null scalar.
    pub fn is_null(&self) -> bool {
        matches!(self.as_scalar(), Some(Scalar::Null))
    }

    /// Looks up a field when this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&NormalizedValue> {
        self.as_mapping().and_then(|mapping| mapping.get(key))
    }
}

impl From<Scalar> for NormalizedValue {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<&str> for NormalizedValue {
    fn from(text: &str) -> Self {
        Self::Scalar(Scalar::Text(text.to_owned()))
    }
}

impl From<String> for NormalizedValue {
    fn from(text: String) -> Self {
        Self::Scalar(Scalar::Text(text))
    }
}

impl From<bool> for NormalizedValue {
    fn from(flag: bool) -> Self {
        Self::Scalar(Scalar::Bool(flag))
    }
}

impl From<i64> for NormalizedValue {
    fn from(value: i64) -> Self {
        Self::Scalar(Scalar::Integer(value))
    }
}

impl From<i32> for NormalizedValue {
    fn from(value: i32) -> Self {
        Self::Scalar(Scalar::Integer(i64::from(value)))
    }
}

impl From<u64> for NormalizedValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Scalar(Scalar::Unsigned(value)), |signed| {
            Self::Scalar(Scalar::Integer(signed))
        })
    }
}

impl From<f64> for NormalizedValue {
    fn from(value: f64) -> Self {
        Self::Scalar(Scalar::Float(value))
    }
}

impl From<Vec<NormalizedValue>> for NormalizedValue {
    fn from(items: Vec<NormalizedValue>) -> Self {
        Self::Sequence(items)
    }
}

impl From<Mapping> for NormalizedValue {
    fn from(mapping: Mapping) -> Self {
        Self::Mapping(mapping)
    }
}

impl From<&Value> for NormalizedValue {
    fn from(value: &Value) -> Self {
        normalize(value)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(flag) => serializer.serialize_bool(*flag),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Unsigned(value) => serializer.serialize_u64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Text(text) => serializer.serialize_str(text),
        }
    }
}

impl Serialize for NormalizedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(scalar) => scalar.serialize(serializer),
            Self::Sequence(items) => serializer.collect_seq(items),
            Self::Mapping(mapping) => serializer.collect_map(mapping),
        }
    }
}

#[cfg(test)]
mod tests;
