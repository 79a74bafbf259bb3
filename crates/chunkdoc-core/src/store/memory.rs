//! In-memory property stores for testing and offline tooling.

use crate::chunk::SizeUnit;
use crate::error::StoreError;
use crate::events::EntityEvents;
use crate::store::{EntityId, PropertyHost, PropertyStore, PropertyValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Property store backed by an ordered map; enumerates names in sorted order.
///
/// Unlimited by default. `with_limit` makes it reject string values longer
/// than a host limit, measured in the given unit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    properties: RwLock<BTreeMap<String, PropertyValue>>,
    limit: Option<(usize, SizeUnit)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects string values longer than `max` units.
    pub fn with_limit(max: usize, unit: SizeUnit) -> Self {
        Self {
            limit: Some((max, unit)),
            ..Self::default()
        }
    }

    /// Builds a store pre-populated with raw properties.
    pub fn from_properties(
        properties: impl IntoIterator<Item = (String, PropertyValue)>,
    ) -> Self {
        Self {
            properties: RwLock::new(properties.into_iter().collect()),
            limit: None,
        }
    }

    pub fn limit(&self) -> Option<(usize, SizeUnit)> {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PropertyStore for MemoryStore {
    fn get_property(&self, name: &str) -> Option<PropertyValue> {
        self.properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn set_property(&self, name: &str, value: Option<PropertyValue>) -> Result<(), StoreError> {
        if let (Some((max, unit)), Some(PropertyValue::String(s))) = (self.limit, &value) {
            let len = unit.measure(s);
            if len > max {
                return Err(StoreError::TooLarge {
                    property: name.to_string(),
                    len,
                    max,
                });
            }
        }

        let mut properties = self
            .properties
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match value {
            Some(v) => {
                properties.insert(name.to_string(), v);
            }
            None => {
                properties.remove(name);
            }
        }
        Ok(())
    }

    fn property_names(&self) -> Vec<String> {
        self.properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

/// Host with one world store and a set of live entities.
///
/// Removing an entity drops its store and, when a feed is attached, emits a
/// removal event the way a real host would.
#[derive(Default)]
pub struct MemoryHost {
    world: Arc<MemoryStore>,
    entities: Mutex<HashMap<EntityId, Arc<MemoryStore>>>,
    events: Option<Arc<EntityEvents>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a host that reports entity removals on `events`.
    pub fn with_events(events: Arc<EntityEvents>) -> Self {
        Self {
            events: Some(events),
            ..Self::default()
        }
    }

    pub fn world(&self) -> &Arc<MemoryStore> {
        &self.world
    }

    /// Adds an entity (or returns the existing one's store).
    pub fn spawn_entity(&self, id: impl Into<EntityId>) -> Arc<MemoryStore> {
        let mut entities = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entities.entry(id.into()).or_default())
    }

    /// Inserts an entity with an existing store.
    pub fn insert_entity(&self, id: impl Into<EntityId>, store: Arc<MemoryStore>) {
        self.entities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), store);
    }

    /// Removes an entity. Returns false if it did not exist.
    pub fn remove_entity(&self, id: &EntityId) -> bool {
        let removed = self
            .entities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        // Emit outside the entity lock: listeners may call back into the host.
        if removed && let Some(events) = &self.events {
            events.emit_removed(id);
        }
        removed
    }

    /// Ids of all live entities, sorted.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .entities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl PropertyHost for MemoryHost {
    type Store = MemoryStore;

    fn world_store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.world)
    }

    fn entity_store(&self, id: &EntityId) -> Option<Arc<MemoryStore>> {
        self.entities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_delete() {
        let store = MemoryStore::new();
        store.set_property("b", Some("2".into())).unwrap();
        store.set_property("a", Some(PropertyValue::Number(1.0))).unwrap();
        assert_eq!(store.property_names(), vec!["a", "b"]);
        assert_eq!(store.get_property("b"), Some("2".into()));

        store.set_property("b", None).unwrap();
        assert_eq!(store.get_property("b"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_memory_host_entities() {
        let host = MemoryHost::new();
        let e1 = EntityId::new("e1");
        assert!(host.entity_store(&e1).is_none());

        let store = host.spawn_entity("e1");
        store.set_property("x", Some("y".into())).unwrap();
        let again = host.entity_store(&e1).unwrap();
        assert!(Arc::ptr_eq(&store, &again));

        assert!(host.remove_entity(&e1));
        assert!(!host.remove_entity(&e1));
        assert!(host.entity_store(&e1).is_none());
    }

    #[test]
    fn test_memory_host_emits_removal() {
        use crate::events::{Delivery, EntityRemovalSource};

        let events = Arc::new(EntityEvents::new());
        let removed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&removed);
        events.on_entity_removed(Arc::new(move |id: &EntityId| {
            sink.lock().unwrap().push(id.clone());
            Delivery::Keep
        }));

        let host = MemoryHost::with_events(Arc::clone(&events));
        host.spawn_entity("e1");
        host.remove_entity(&EntityId::new("e1"));
        host.remove_entity(&EntityId::new("missing"));

        assert_eq!(*removed.lock().unwrap(), vec![EntityId::new("e1")]);
    }

    #[test]
    fn test_memory_store_limit_in_bytes() {
        let store = MemoryStore::with_limit(4, SizeUnit::Utf8Bytes);
        store.set_property("ok", Some("éé".into())).unwrap();

        let err = store.set_property("big", Some("ééé".into())).unwrap_err();
        assert!(matches!(
            err,
            StoreError::TooLarge { ref property, len: 6, max: 4 } if property == "big"
        ));
        assert_eq!(store.get_property("big"), None);
        // non-string values and deletes are not measured
        store
            .set_property("n", Some(PropertyValue::Number(12345678.0)))
            .unwrap();
        store.set_property("ok", None).unwrap();
        assert_eq!(store.property_names(), vec!["n"]);
    }

    #[test]
    fn test_listener_can_remove_another_entity() {
        use crate::events::{Delivery, EntityRemovalSource};
        use std::sync::Weak;

        let events = Arc::new(EntityEvents::new());
        let host = Arc::new(MemoryHost::with_events(Arc::clone(&events)));
        host.spawn_entity("horse");
        host.spawn_entity("rider");

        let removed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&removed);
        let weak: Weak<MemoryHost> = Arc::downgrade(&host);
        events.on_entity_removed(Arc::new(move |id: &EntityId| {
            sink.lock().unwrap().push(id.clone());
            if id.as_str() == "horse"
                && let Some(host) = weak.upgrade()
            {
                host.remove_entity(&EntityId::new("rider"));
            }
            Delivery::Keep
        }));

        assert!(host.remove_entity(&EntityId::new("horse")));
        assert!(host.entity_ids().is_empty());
        assert_eq!(
            *removed.lock().unwrap(),
            vec![EntityId::new("horse"), EntityId::new("rider")]
        );
    }
}
