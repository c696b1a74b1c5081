//! The root value store.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValuesError};
use crate::value::{Mapping, Value};

/// A root mapping of values, addressable by dotted path.
///
/// `Values` owns its tree. Rendering takes a store by value, so a caller that
/// wants to keep using a store while a render is in flight clones it first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(Mapping);

impl Values {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a YAML document into a store.
    ///
    /// Empty documents (including comment-only files and an explicit `null`)
    /// decode to an empty store. Any other non-mapping document is an error.
    pub fn from_yaml(data: impl AsRef<[u8]>) -> Result<Self> {
        let doc: serde_yaml::Value = serde_yaml::from_slice(data.as_ref())?;
        match Value::from(doc) {
            Value::Null => Ok(Self::new()),
            Value::Map(map) => Ok(Self(map)),
            other => Err(ValuesError::NotAMapping {
                found: other.type_name(),
            }),
        }
    }

    /// Reads and decodes a YAML values file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| ValuesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(data)
    }

    /// Builds a store by decoding each document and merging them in order.
    ///
    /// Later documents override earlier ones via [`override_with`](Self::override_with).
    pub fn merge_documents<I, B>(documents: I) -> Result<Self>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut merged = Self::new();
        for doc in documents {
            merged.override_with(&Self::from_yaml(doc)?);
        }
        Ok(merged)
    }

    /// Encodes the store as YAML into `writer`.
    pub fn encode<W: Write>(&self, writer: W) -> Result<()> {
        serde_yaml::to_writer(writer, &self.0)?;
        Ok(())
    }

    /// Encodes the store as a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Returns the sub-table at a dotted path.
    ///
    /// Each segment must name a mapping. The first segment that is missing or
    /// not a mapping is reported in [`ValuesError::NoTable`].
    pub fn table(&self, path: &str) -> Result<Values> {
        self.table_ref(path).map(|table| Values(table.clone()))
    }

    fn table_ref(&self, path: &str) -> Result<&Mapping> {
        let mut table = &self.0;
        for segment in parse_path(path) {
            table = match table.get(segment) {
                Some(Value::Map(inner)) => inner,
                _ => return Err(ValuesError::no_table(segment)),
            };
        }
        Ok(table)
    }

    /// Returns the leaf value at a dotted path.
    ///
    /// All segments but the last are resolved as tables. The last segment
    /// must name a value that is not itself a table.
    pub fn path_value(&self, path: &str) -> Result<&Value> {
        if path.is_empty() {
            return Err(ValuesError::EmptyPath);
        }

        let segments: Vec<&str> = parse_path(path).collect();
        let Some((key, parents)) = segments.split_last() else {
            return Err(ValuesError::EmptyPath);
        };

        let table = if parents.is_empty() {
            &self.0
        } else {
            self.table_ref(&join_path(parents))
                .map_err(|_| ValuesError::no_value(*key))?
        };

        match table.get(*key) {
            Some(value) if !value.is_map() => Ok(value),
            _ => Err(ValuesError::no_value(*key)),
        }
    }

    /// Deep-merges `other` into this store.
    ///
    /// Where both sides hold a mapping under the same key, the mappings are
    /// merged recursively. Otherwise the value from `other` replaces the
    /// existing one. Keys only present here are left untouched.
    pub fn override_with(&mut self, other: &Values) {
        merge_mapping(&mut self.0, &other.0);
    }

    /// Sets a value at a dotted path, creating intermediate tables.
    ///
    /// An intermediate segment holding a non-mapping value is replaced by a
    /// new table.
    pub fn set_path(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = parse_path(path).collect();
        let Some((key, parents)) = segments.split_last() else {
            return;
        };

        let mut table = &mut self.0;
        for segment in parents {
            let slot = table
                .entry(segment.to_string())
                .or_insert_with(|| Value::Map(Mapping::new()));
            if !slot.is_map() {
                *slot = Value::Map(Mapping::new());
            }
            let Value::Map(inner) = slot else {
                return;
            };
            table = inner;
        }
        table.insert(key.to_string(), value);
    }

    /// Inserts a top-level key, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns a top-level value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a top-level value mutably.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Returns `true` if the top-level key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the store has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates top-level entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Borrows the root mapping.
    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    /// Converts the store into a mapping [`Value`].
    pub fn into_value(self) -> Value {
        Value::Map(self.0)
    }
}

impl From<Mapping> for Values {
    fn from(map: Mapping) -> Self {
        Self(map)
    }
}

impl From<Values> for Value {
    fn from(values: Values) -> Self {
        values.into_value()
    }
}

impl FromIterator<(String, Value)> for Values {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn merge_mapping(dst: &mut Mapping, src: &Mapping) {
    for (key, src_value) in src {
        if let (Some(Value::Map(dst_inner)), Value::Map(src_inner)) = (dst.get_mut(key), src_value)
        {
            merge_mapping(dst_inner, src_inner);
            continue;
        }
        dst.insert(key.clone(), src_value.clone());
    }
}

fn parse_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('.')
}

fn join_path(segments: &[&str]) -> String {
    segments.join(".")
}
