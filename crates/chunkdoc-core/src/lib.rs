//! chunkdoc-core — chunked key/value documents over size-limited property stores.
//!
//! Provides:
//! - `chunk` — splitting encoded values into bounded chunks and naming them
//! - `codec` — value codecs (JSON by default, raw strings, closures)
//! - `document` — per-owner document: get/set/delete/has/keys/values/entries
//! - `registry` — one cached document per owner, evicted on entity removal
//! - `store` — property store and host abstractions, in-memory implementations
//! - `events` — entity-removal feed
//!
//! ```
//! use std::sync::Arc;
//! use chunkdoc_core::{DocumentConfig, DocumentRegistry, EntityEvents, MemoryHost, Owner};
//!
//! let events = Arc::new(EntityEvents::new());
//! let host = Arc::new(MemoryHost::with_events(Arc::clone(&events)));
//! let registry = Arc::new(DocumentRegistry::new(Arc::clone(&host), DocumentConfig::new(16)));
//! registry.subscribe(events.as_ref());
//!
//! let world = registry.document(&Owner::World).unwrap();
//! world.set("spawn", &vec![12, 64, -40]).unwrap();
//! assert_eq!(world.get::<Vec<i32>>("spawn").unwrap(), Some(vec![12, 64, -40]));
//! ```

pub mod chunk;
pub mod codec;
pub mod document;
pub mod error;
pub mod events;
pub mod registry;
pub mod store;

pub use chunk::SizeUnit;
pub use codec::{Codec, FnCodec, Json, Raw};
pub use document::{Document, DocumentConfig, Entries, Keys, Values};
pub use error::{DecodeError, DocumentError, EncodeError, StoreError};
pub use events::{Delivery, EntityEvents, EntityRemovalSource};
pub use registry::DocumentRegistry;
pub use store::{EntityId, MemoryHost, MemoryStore, Owner, PropertyHost, PropertyStore, PropertyValue};
