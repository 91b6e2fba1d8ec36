//! A dynamically typed value, usable both as an element and as a map key.

use std::{fmt, sync::Arc};

use serde::de;

use crate::{
    hash::{hash_f64, hash_long, integral_f64, Equiv},
    map::Map,
    vector::Vector,
};

/// A dynamically typed value.
///
/// Numbers compare by numeric value across variants: `Int(1)` and
/// `Float(1.0)` are the same key in a [`Map`], and hash alike. Equality
/// (`==`) is that same equivalence, so it is reflexive even for NaN.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Vector(Vector<Value>),
    Map(Map<Value, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::Vector(_) => "Vector",
            Value::Map(_) => "Map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(&**s),
            _ => None,
        }
    }
}

impl Equiv for Value {
    fn hash_code(&self) -> u32 {
        match self {
            Value::Nil => 0,
            Value::Bool(b) => b.hash_code(),
            Value::Int(i) => hash_long(*i),
            Value::Float(f) => hash_f64(*f),
            Value::Str(s) => s.hash_code(),
            Value::Vector(v) => v.hash_code(),
            Value::Map(m) => m.hash_code(),
        }
    }

    fn equiv(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.equiv(b),
            (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => {
                integral_f64(*f) == Some(*i)
            }
            (Value::Str(a), Value::Str(b)) => a.equiv(b),
            (Value::Vector(a), Value::Vector(b)) => a.equiv(b),
            (Value::Map(a), Value::Map(b)) => a.equiv(b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equiv(other)
    }
}

impl Eq for Value {}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Vector<Value>> for Value {
    fn from(v: Vector<Value>) -> Self {
        Value::Vector(v)
    }
}

impl From<Map<Value, Value>> for Value {
    fn from(m: Map<Value, Value>) -> Self {
        Value::Map(m)
    }
}

impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Vector(v) => serde::Serialize::serialize(v, serializer),
            Value::Map(m) => serde::Serialize::serialize(m, serializer),
        }
    }
}

struct ValueVisitor;

impl<'de> de::Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a nil, boolean, number, string, sequence or map")
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Nil)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Nil)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serde::Deserialize::deserialize(deserializer)
    }

    fn visit_bool<E>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E>(self, i: i64) -> Result<Value, E> {
        Ok(Value::Int(i))
    }

    fn visit_u64<E>(self, u: u64) -> Result<Value, E> {
        Ok(i64::try_from(u).map_or(Value::Float(u as f64), Value::Int))
    }

    fn visit_f64<E>(self, f: f64) -> Result<Value, E> {
        Ok(Value::Float(f))
    }

    fn visit_str<E>(self, s: &str) -> Result<Value, E> {
        Ok(Value::from(s))
    }

    fn visit_string<E>(self, s: String) -> Result<Value, E> {
        Ok(Value::from(s))
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut transient = Vector::new().transient();
        while let Some(elt) = access.next_element()? {
            transient.conj(elt).map_err(<A::Error as de::Error>::custom)?;
        }
        transient
            .finalize()
            .map(Value::Vector)
            .map_err(<A::Error as de::Error>::custom)
    }

    fn visit_map<A>(self, mut access: A) -> Result<Value, A::Error>
    where
        A: de::MapAccess<'de>,
    {
        let mut transient = Map::new().transient();
        while let Some((k, v)) = access.next_entry()? {
            transient.assoc(k, v).map_err(<A::Error as de::Error>::custom)?;
        }
        transient
            .finalize()
            .map(Value::Map)
            .map_err(<A::Error as de::Error>::custom)
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_cross_equivalent() {
        let one = Value::Int(1);
        assert_eq!(one, Value::Float(1.0));
        assert_eq!(one.hash_code(), Value::Float(1.0).hash_code());
        assert_ne!(one, Value::Float(1.5));
        assert_ne!(one, Value::from("1"));
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(Value::Float(-0.0), Value::Int(0));
    }

    #[test]
    fn numeric_keys_are_interchangeable() {
        let map = Map::new().assoc(Value::Int(1), Value::from("one"));
        assert_eq!(map.get(&Value::Float(1.0)), Some(&Value::from("one")));
        assert_eq!(map.get(&Value::from(1i64)), Some(&Value::from("one")));
        assert_eq!(map.get(&Value::from("1")), None);

        // Rebinding through the other representation replaces the entry.
        let map = map.assoc(Value::Float(1.0), Value::from("uno"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&Value::Int(1)), Some(&Value::from("uno")));
    }

    #[test]
    fn nested_collections_compare_structurally() {
        let a = Value::Vector([Value::Int(1), Value::Float(2.0)].into_iter().collect());
        let b = Value::Vector([Value::Float(1.0), Value::Int(2)].into_iter().collect());
        assert_eq!(a, b);
        assert_eq!(a.hash_code(), b.hash_code());

        let m1: Map<Value, Value> = [(Value::Int(1), a.clone())].into_iter().collect();
        let m2: Map<Value, Value> = [(Value::Float(1.0), b)].into_iter().collect();
        assert_eq!(Value::Map(m1.clone()), Value::Map(m2));
        assert_eq!(m1.get(&Value::Int(1)), Some(&a));
    }

    #[test]
    fn json_round_trip() {
        let json = r#"{"name":"trie","sizes":[1,2.5,null,true],"nested":{"k":"v"}}"#;
        let value: Value = serde_json::from_str(json).unwrap();
        let Value::Map(map) = &value else {
            panic!("expected a map, got {}", value.type_name());
        };
        assert_eq!(map.len(), 3);
        assert_eq!(
            map.get(&Value::from("name")).and_then(Value::as_str),
            Some("trie")
        );
        let Some(Value::Vector(sizes)) = map.get(&Value::from("sizes")) else {
            panic!("expected a vector");
        };
        assert_eq!(sizes.len(), 4);
        assert_eq!(sizes[0], Value::Int(1));
        assert_eq!(sizes[1], Value::Float(2.5));
        assert_eq!(sizes[2], Value::Nil);

        let back: Value = serde_json::from_str(&serde_json::to_string(&value).unwrap()).unwrap();
        assert_eq!(back, value);
    }
}
