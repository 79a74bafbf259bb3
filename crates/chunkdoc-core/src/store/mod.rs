//! Abstractions over the host's raw property storage.
//!
//! A host exposes one flat property namespace per owner (the world, or a
//! single entity). Documents only need three operations on it, captured by
//! `PropertyStore`. `PropertyHost` resolves an `Owner` to its store.
//!
//! `memory` provides in-process implementations for tests and tooling.

pub mod memory;

pub use memory::{MemoryHost, MemoryStore};

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default per-property value limit of the host store, in chars.
pub const DEFAULT_MAX_PROPERTY_SIZE: usize = 32767;

/// Stable identifier of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Owner of a property namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    World,
    Entity(EntityId),
}

impl Owner {
    pub fn entity(id: impl Into<EntityId>) -> Self {
        Owner::Entity(id.into())
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Owner::World => f.write_str("world"),
            Owner::Entity(id) => write!(f, "entity:{}", id),
        }
    }
}

/// Raw value held by a host property.
///
/// Documents only write `String`; the other kinds exist because hosts allow
/// them and a foreign writer may have put one under a chunk name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Bool(bool),
    Vector3 { x: f64, y: f64, z: f64 },
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the value kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::String(_) => "string",
            PropertyValue::Number(_) => "number",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Vector3 { .. } => "vector3",
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

/// Flat property namespace of one owner.
///
/// Methods take `&self`: the host owns the storage and callers only hold
/// handles to it.
///
/// Hosts cap the length of one string value. The cap is counted in some
/// `SizeUnit` (chars, UTF-8 bytes or UTF-16 code units, depending on the
/// host); documents over a store must be configured with the same unit via
/// `DocumentConfig::with_unit`, or multibyte text can produce chunks the
/// store rejects.
pub trait PropertyStore: Send + Sync {
    /// Returns the value of a property, if set.
    fn get_property(&self, name: &str) -> Option<PropertyValue>;

    /// Sets a property. `None` deletes it.
    ///
    /// Fails with `StoreError::TooLarge` if a string value exceeds the
    /// store's limit; nothing is written in that case.
    fn set_property(&self, name: &str, value: Option<PropertyValue>) -> Result<(), StoreError>;

    /// Names of all properties currently set, in the store's enumeration order.
    fn property_names(&self) -> Vec<String>;
}

/// Resolves owners to their property stores.
pub trait PropertyHost: Send + Sync {
    type Store: PropertyStore;

    fn world_store(&self) -> Arc<Self::Store>;

    /// Returns `None` if the entity does not exist (or no longer exists).
    fn entity_store(&self, id: &EntityId) -> Option<Arc<Self::Store>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_value_untagged_json() {
        let values: Vec<PropertyValue> =
            serde_json::from_str(r#"["abc", 1.5, true, {"x": 1, "y": 2, "z": 3}]"#).unwrap();
        assert_eq!(
            values,
            vec![
                PropertyValue::String("abc".into()),
                PropertyValue::Number(1.5),
                PropertyValue::Bool(true),
                PropertyValue::Vector3 {
                    x: 1.0,
                    y: 2.0,
                    z: 3.0
                },
            ]
        );
        assert_eq!(values[1].kind(), "number");
        assert_eq!(values[0].as_str(), Some("abc"));
        assert_eq!(values[2].as_str(), None);
    }

    #[test]
    fn test_owner_display() {
        assert_eq!(Owner::World.to_string(), "world");
        assert_eq!(Owner::entity("e1").to_string(), "entity:e1");
    }
}
