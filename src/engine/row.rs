//! Decoded rows and their shared header set

use std::fmt;
use std::sync::Arc;

use ahash::RandomState;
use hashbrown::HashMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::value::Value;

/// Frozen, ordered header names with O(1) name lookup
///
/// One `Headers` is shared by every row of a document.
#[derive(Clone)]
pub struct Headers {
    names: Vec<String>,
    index: HashMap<String, usize, RandomState>,
}

impl Headers {
    /// Freeze a list of unique names
    ///
    /// When a name repeats, lookups resolve to its first position.
    pub fn new(names: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity_and_hasher(names.len(), RandomState::new());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self { names, index }
    }

    /// Synthetic `column_<i>` names for `count` columns
    pub fn synthetic(count: usize) -> Self {
        Self::new((0..count).map(synthetic_name).collect())
    }

    /// Number of columns
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether there are no columns
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in declaration order
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of a header name
    #[inline]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Name at a position
    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }
}

impl PartialEq for Headers {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.names).finish()
    }
}

/// Name used for a blank or missing header cell
pub fn synthetic_name(index: usize) -> String {
    format!("column_{}", index)
}

/// A decoded row: header name → value, in header order
#[derive(Clone, PartialEq)]
pub struct Row {
    headers: Arc<Headers>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row; `values` is padded with nulls or truncated to the header count
    pub fn new(headers: Arc<Headers>, mut values: Vec<Value>) -> Self {
        values.resize(headers.len(), Value::Null);
        Self { headers, values }
    }

    /// The shared header set
    #[inline]
    pub fn headers(&self) -> &Arc<Headers> {
        &self.headers
    }

    /// Value by header name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.headers.position(name).map(|i| &self.values[i])
    }

    /// Mutable value by header name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self.headers.position(name) {
            Some(i) => Some(&mut self.values[i]),
            None => None,
        }
    }

    /// Value by position
    #[inline]
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Replace the value of an existing column; returns false for unknown names
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Values in header order
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume into the value list
    #[inline]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Number of columns
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(name, value)` pairs in header order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.headers
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Convert to a JSON object (keys in header order are not guaranteed by `serde_json::Map`)
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
