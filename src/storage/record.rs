//! Entity records as seen by the revision core
//!
//! A record is a typed key plus an ordered map of named field values. Link
//! fields hold the id of the entity they point at.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of one entity: its type name and its id within that type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    /// Registered type name
    pub entity_type: String,
    /// Id, unique within the type
    pub id: String,
}

impl EntityKey {
    /// Create a key
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

/// Current state of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    key: EntityKey,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create a record with no fields
    pub fn new(key: EntityKey) -> Self {
        Self {
            key,
            fields: BTreeMap::new(),
        }
    }

    /// Create a record from existing fields
    pub fn with_fields(key: EntityKey, fields: BTreeMap<String, Value>) -> Self {
        Self { key, fields }
    }

    /// Builder-style field assignment
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// The record's key
    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    /// The record's type name
    pub fn entity_type(&self) -> &str {
        &self.key.entity_type
    }

    /// The record's id
    pub fn id(&self) -> &str {
        &self.key.id
    }

    /// All fields in name order
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// One field value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a field value, returning the previous one
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// A field read as an entity id.
    ///
    /// Strings are used as-is and integers are formatted; null, missing and
    /// any other JSON shape mean "no link".
    pub fn link_id(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// A field read as a display string, used for snapshot labels.
    pub fn display_field(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
