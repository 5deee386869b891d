//! Format-agnostic normalisation through `serde`.

use std::fmt;

use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

use super::{Mapping, NormalizedValue};

impl<'de> Deserialize<'de> for NormalizedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = NormalizedValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a structured value")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(NormalizedValue::NULL)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(NormalizedValue::NULL)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        NormalizedValue::deserialize(deserializer)
    }

    fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
        Ok(NormalizedValue::from(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
        Ok(NormalizedValue::from(value))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
        Ok(NormalizedValue::from(value))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
        Ok(NormalizedValue::from(value))
    }

    fn visit_char<E>(self, value: char) -> Result<Self::Value, E> {
        Ok(NormalizedValue::from(value.to_string()))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
        Ok(NormalizedValue::from(value))
    }

    fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
        Ok(NormalizedValue::from(value))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<NormalizedValue>()? {
            items.push(item);
        }
        Ok(NormalizedValue::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut mapping = Mapping::new();
        while let Some(key) = map.next_key::<MapKey>()? {
            match key {
                MapKey::Text(key) => {
                    let value = map.next_value::<NormalizedValue>()?;
                    mapping.insert(key, value);
                }
                MapKey::Unrepresentable => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(NormalizedValue::Mapping(mapping))
    }
}

/// Mapping key as decoded from the source format.
enum MapKey {
    Text(String),
    Unrepresentable,
}

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(KeyVisitor)
    }
}

struct KeyVisitor;

impl<'de> Visitor<'de> for KeyVisitor {
    type Value = MapKey;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a mapping key")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
        Ok(MapKey::Text(value.to_owned()))
    }

    fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
        Ok(MapKey::Text(value))
    }

    fn visit_char<E>(self, value: char) -> Result<Self::Value, E> {
        Ok(MapKey::Text(value.to_string()))
    }

    fn visit_bool<E>(self, _value: bool) -> Result<Self::Value, E> {
        Ok(MapKey::Unrepresentable)
    }

    fn visit_i64<E>(self, _value: i64) -> Result<Self::Value, E> {
        Ok(MapKey::Unrepresentable)
    }

    fn visit_u64<E>(self, _value: u64) -> Result<Self::Value, E> {
        Ok(MapKey::Unrepresentable)
    }

    fn visit_f64<E>(self, _value: f64) -> Result<Self::Value, E> {
        Ok(MapKey::Unrepresentable)
    }

    fn visit_bytes<E>(self, _value: &[u8]) -> Result<Self::Value, E> {
        Ok(MapKey::Unrepresentable)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(MapKey::Unrepresentable)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E> {
        Ok(MapKey::Unrepresentable)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        IgnoredAny::deserialize(deserializer).map(|_| MapKey::Unrepresentable)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
        IgnoredAny.visit_seq(seq).map(|_| MapKey::Unrepresentable)
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        IgnoredAny.visit_map(map).map(|_| MapKey::Unrepresentable)
    }
}
