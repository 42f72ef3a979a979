use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Error;

/// A single attribute value.
///
/// Attribute records are small key-value maps rather than reflected object
/// fields, so the value side is a closed set of variants. Vertex coordinates
/// are deliberately *not* stored through this type; the structures keep them
/// as first class [`DVec3`] fields and only expose them through the attribute
/// API under the reserved names `"x"`, `"y"` and `"z"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Vec3([f64; 3]),
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// Read the value as a float, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(x) => Some(*x),
            AttrValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<DVec3> {
        match self {
            AttrValue::Vec3(v) => Some(DVec3::from_array(*v)),
            _ => None,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<f64> for AttrValue {
    fn from(x: f64) -> Self {
        AttrValue::Float(x)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<[f64; 3]> for AttrValue {
    fn from(v: [f64; 3]) -> Self {
        AttrValue::Vec3(v)
    }
}

impl From<DVec3> for AttrValue {
    fn from(v: DVec3) -> Self {
        AttrValue::Vec3(v.to_array())
    }
}

/// The per-entity attribute record.
///
/// A record stores only the values explicitly written for its entity; names
/// that were never overridden fall through to the defaults of the owning
/// structure's [`AttributeSchema`] at lookup time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    values: BTreeMap<String, AttrValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Attributes {
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Remove an override, falling back to the default from now on.
    pub fn unset(&mut self, name: &str) -> Option<AttrValue> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn extend(&mut self, other: Attributes) {
        self.values.extend(other.values);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>, V: Into<AttrValue>> FromIterator<(S, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (S, V)>>(iter: T) -> Self {
        Attributes {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The default-attribute template for one entity kind.
///
/// Schemas are instance-owned state: each structure carries one schema per
/// entity kind (vertex, edge, face, cell) and mutates it through its
/// `update_default_*_attributes` methods. Lookups resolve overrides first,
/// then the *current* defaults, so updating a default is visible to every
/// entity of that kind that has not overridden the name. Already overridden
/// values are never rewritten.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSchema {
    defaults: BTreeMap<String, AttrValue>,
}

impl AttributeSchema {
    pub fn new() -> Self {
        AttributeSchema {
            defaults: BTreeMap::new(),
        }
    }

    /// Replace or extend the default mapping.
    pub fn update(&mut self, defaults: Attributes) {
        self.defaults.extend(defaults.values);
    }

    pub fn default_value(&self, name: &str) -> Option<&AttrValue> {
        self.defaults.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defaults.keys().map(|k| k.as_str())
    }

    /// Resolve `name` against a record: override first, else default, else
    /// [`Error::AttributeNotFound`].
    pub fn resolve<'a>(&'a self, record: &'a Attributes, name: &str) -> Result<&'a AttrValue, Error> {
        record
            .get(name)
            .or_else(|| self.defaults.get(name))
            .ok_or_else(|| Error::AttributeNotFound(name.to_string()))
    }
}

/// A read-only view of one entity's attributes with defaults applied.
///
/// This is what attribute filters receive, so a predicate can test names the
/// entity never overrode.
#[derive(Copy, Clone)]
pub struct AttrView<'a> {
    record: &'a Attributes,
    schema: &'a AttributeSchema,
}

impl<'a> AttrView<'a> {
    pub(crate) fn new(record: &'a Attributes, schema: &'a AttributeSchema) -> Self {
        AttrView { record, schema }
    }

    pub fn get(&self, name: &str) -> Option<&'a AttrValue> {
        self.record
            .get(name)
            .or_else(|| self.schema.default_value(name))
    }

    pub fn record(&self) -> &'a Attributes {
        self.record
    }
}
