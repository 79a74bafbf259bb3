//! One document per owner.
//!
//! `DocumentRegistry` hands out shared `Document` handles: the world document
//! is created on first use and lives as long as the registry, entity
//! documents are cached by id and evicted when the host reports the entity
//! removed. Build one registry at startup and pass it around by `Arc`.

use crate::document::{Document, DocumentConfig};
use crate::error::{DocumentError, Result};
use crate::events::{Delivery, EntityRemovalSource};
use crate::store::{EntityId, Owner, PropertyHost};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::debug;

pub struct DocumentRegistry<H: PropertyHost> {
    host: Arc<H>,
    config: DocumentConfig,
    world: OnceLock<Arc<Document<H::Store>>>,
    entities: Mutex<HashMap<EntityId, Arc<Document<H::Store>>>>,
}

impl<H: PropertyHost> DocumentRegistry<H> {
    pub fn new(host: Arc<H>, config: DocumentConfig) -> Self {
        Self {
            host,
            config,
            world: OnceLock::new(),
            entities: Mutex::new(HashMap::new()),
        }
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Returns the document for `owner`, creating it on first request.
    ///
    /// Repeated calls for the same owner return the same instance until the
    /// entity is evicted.
    pub fn document(&self, owner: &Owner) -> Result<Arc<Document<H::Store>>> {
        match owner {
            Owner::World => Ok(Arc::clone(self.world_document())),
            Owner::Entity(id) => self.entity_document(id),
        }
    }

    pub fn world_document(&self) -> &Arc<Document<H::Store>> {
        self.world.get_or_init(|| {
            debug!("world document created");
            Arc::new(Document::new(
                Owner::World,
                self.host.world_store(),
                self.config,
            ))
        })
    }

    fn entity_document(&self, id: &EntityId) -> Result<Arc<Document<H::Store>>> {
        let mut entities = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(doc) = entities.get(id) {
            return Ok(Arc::clone(doc));
        }

        let store = self
            .host
            .entity_store(id)
            .ok_or_else(|| DocumentError::UnknownEntity(id.clone()))?;
        let doc = Arc::new(Document::new(
            Owner::Entity(id.clone()),
            store,
            self.config,
        ));
        entities.insert(id.clone(), Arc::clone(&doc));
        debug!(entity = %id, cached = entities.len(), "entity document created");
        Ok(doc)
    }

    /// Drops the cached document of an entity. Returns false if none was cached.
    pub fn evict(&self, id: &EntityId) -> bool {
        let mut entities = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
        let evicted = entities.remove(id).is_some();
        if evicted {
            debug!(entity = %id, cached = entities.len(), "entity document evicted");
        }
        evicted
    }

    /// Number of cached entity documents.
    pub fn cached_entities(&self) -> usize {
        self.entities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<H: PropertyHost + 'static> DocumentRegistry<H> {
    /// Evicts entity documents whenever `source` reports a removal.
    ///
    /// The listener only holds a weak reference. The first event after the
    /// registry is dropped unsubscribes it from `source`.
    pub fn subscribe(self: &Arc<Self>, source: &impl EntityRemovalSource) {
        let registry = Arc::downgrade(self);
        source.on_entity_removed(Arc::new(move |id: &EntityId| {
            match registry.upgrade() {
                Some(registry) => {
                    registry.evict(id);
                    Delivery::Keep
                }
                None => Delivery::Unsubscribe,
            }
        }));
    }
}
