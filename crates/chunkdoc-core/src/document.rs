//! Per-owner key/value documents over a size-limited property store.
//!
//! Each logical key is stored as chunk properties `key_0..key_{N-1}` holding
//! consecutive slices of the encoded value. A key owns exactly the properties
//! whose name, with the trailing `_<digits>` removed, equals the key. Writes
//! always delete the old chunks first so a shorter value never inherits
//! trailing chunks of a longer one.

use crate::chunk::{SizeUnit, chunk_name, join, logical_key, parse_chunk_name, split_by};
use crate::codec::{Codec, Json};
use crate::error::{DecodeError, DocumentError, Result};
use crate::store::{DEFAULT_MAX_PROPERTY_SIZE, Owner, PropertyStore, PropertyValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// Storage limits for documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Maximum length of one property value, in `size_unit`. Default: 32767.
    /// Zero is treated as one.
    pub max_property_size: usize,
    /// Unit the store counts its limit in. Default: chars.
    pub size_unit: SizeUnit,
    /// Split values over several properties. When off, a value longer than
    /// `max_property_size` is rejected with `DocumentError::Size`.
    pub chunking: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_property_size: DEFAULT_MAX_PROPERTY_SIZE,
            size_unit: SizeUnit::Chars,
            chunking: true,
        }
    }
}

impl DocumentConfig {
    /// Chunked storage with a custom property limit.
    pub fn new(max_property_size: usize) -> Self {
        Self {
            max_property_size,
            ..Self::default()
        }
    }

    /// Single-property storage: values must fit one property.
    pub fn unchunked(max_property_size: usize) -> Self {
        Self {
            max_property_size,
            chunking: false,
            ..Self::default()
        }
    }

    /// Measures the limit in `unit` instead of chars.
    pub fn with_unit(mut self, unit: SizeUnit) -> Self {
        self.size_unit = unit;
        self
    }
}

/// Key/value view over one owner's properties.
pub struct Document<S: PropertyStore> {
    owner: Owner,
    store: Arc<S>,
    config: DocumentConfig,
    /// Held for writing across a whole set/delete so readers never see a key
    /// with some chunks replaced and others not.
    lock: RwLock<()>,
}

impl<S: PropertyStore> std::fmt::Debug for Document<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("owner", &self.owner)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: PropertyStore> Document<S> {
    pub fn new(owner: Owner, store: Arc<S>, config: DocumentConfig) -> Self {
        Self {
            owner,
            store,
            config,
            lock: RwLock::new(()),
        }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Reads a JSON value.
    pub fn get<T: Serialize + DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get_with(key, &Json)
    }

    /// Reads a value with a custom codec. Returns `Ok(None)` if the key has
    /// no chunks.
    pub fn get_with<T, C: Codec<T>>(&self, key: &str, codec: &C) -> Result<Option<T>> {
        let _guard = self.read();
        self.get_locked(key, codec)
    }

    /// Writes a JSON value.
    pub fn set<T: Serialize + DeserializeOwned>(&self, key: &str, value: &T) -> Result<()> {
        self.set_with(key, value, &Json)
    }

    /// Writes a value with a custom codec, replacing all chunks of `key`.
    ///
    /// Encoding and size checks happen before anything is written. A value
    /// that encodes to the empty string is stored as zero chunks and reads
    /// back as absent. If the store rejects a chunk, the chunks already
    /// written are removed again and the key is left absent.
    pub fn set_with<T, C: Codec<T>>(&self, key: &str, value: &T, codec: &C) -> Result<()> {
        let encoded = codec.encode(value)?;
        let max = self.config.max_property_size.max(1);
        let unit = self.config.size_unit;

        if !self.config.chunking {
            let len = unit.measure(&encoded);
            if len > max {
                return Err(DocumentError::Size {
                    key: key.to_string(),
                    len,
                    max,
                });
            }
        }

        let _guard = self.write();
        let replaced = self.delete_locked(key)?;
        let chunks = split_by(&encoded, max, unit);
        for (index, chunk) in chunks.iter().enumerate() {
            let written = self.store.set_property(
                &chunk_name(key, index),
                Some(PropertyValue::String(chunk.to_string())),
            );
            if let Err(e) = written {
                warn!(
                    owner = %self.owner,
                    key,
                    chunk = index,
                    error = %e,
                    "chunk write rejected"
                );
                self.delete_locked(key)?;
                return Err(e.into());
            }
        }

        debug!(
            owner = %self.owner,
            key,
            chunks = chunks.len(),
            replaced,
            "document value written"
        );
        Ok(())
    }

    /// True if `key` holds a JSON value that decodes. Errors count as absent.
    pub fn has(&self, key: &str) -> bool {
        self.has_with::<serde_json::Value, _>(key, &Json)
    }

    pub fn has_with<T, C: Codec<T>>(&self, key: &str, codec: &C) -> bool {
        matches!(self.get_with(key, codec), Ok(Some(_)))
    }

    /// Removes every chunk of `key`. Returns the number of properties removed.
    pub fn delete(&self, key: &str) -> Result<usize> {
        let _guard = self.write();
        let removed = self.delete_locked(key)?;
        if removed > 0 {
            debug!(owner = %self.owner, key, chunks = removed, "document value deleted");
        }
        Ok(removed)
    }

    /// Raw property names holding `key`, in chunk order.
    pub fn chunk_names(&self, key: &str) -> Vec<String> {
        let _guard = self.read();
        self.chunk_names_locked(key)
    }

    /// Distinct logical keys, in the store's enumeration order.
    ///
    /// The property listing is taken when this is called; each call sees the
    /// current state.
    pub fn keys(&self) -> Keys {
        let names = {
            let _guard = self.read();
            self.store.property_names()
        };
        Keys {
            names: names.into_iter(),
            seen: HashSet::new(),
        }
    }

    /// JSON values for each key. Each value is read when the iterator
    /// reaches it.
    pub fn values<T: Serialize + DeserializeOwned>(&self) -> Values<'_, S, T, Json> {
        self.values_with(&Json)
    }

    pub fn values_with<'a, T, C: Codec<T>>(&'a self, codec: &'a C) -> Values<'a, S, T, C> {
        Values {
            doc: self,
            keys: self.keys(),
            codec,
            _value: PhantomData,
        }
    }

    /// `(key, value)` pairs, read lazily like `values`.
    pub fn entries<T: Serialize + DeserializeOwned>(&self) -> Entries<'_, S, T, Json> {
        self.entries_with(&Json)
    }

    pub fn entries_with<'a, T, C: Codec<T>>(&'a self, codec: &'a C) -> Entries<'a, S, T, C> {
        Entries {
            doc: self,
            keys: self.keys(),
            codec,
            _value: PhantomData,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_locked<T, C: Codec<T>>(&self, key: &str, codec: &C) -> Result<Option<T>> {
        let names = self.chunk_names_locked(key);
        if names.is_empty() {
            return Ok(None);
        }

        let mut chunks = Vec::with_capacity(names.len());
        for name in names {
            match self.store.get_property(&name) {
                Some(PropertyValue::String(s)) => chunks.push(s),
                Some(other) => {
                    warn!(
                        owner = %self.owner,
                        property = %name,
                        kind = other.kind(),
                        "chunk property holds a non-string value"
                    );
                    return Err(DecodeError::NotAString { property: name }.into());
                }
                None => return Err(DecodeError::Missing { property: name }.into()),
            }
        }

        let joined = join(&chunks);
        Ok(Some(codec.decode(&joined)?))
    }

    /// Chunk names of `key` sorted by numeric index (`key_10` after `key_9`).
    fn chunk_names_locked(&self, key: &str) -> Vec<String> {
        let mut chunks: Vec<(usize, String)> = self
            .store
            .property_names()
            .into_iter()
            .filter_map(|name| {
                let index = match parse_chunk_name(&name) {
                    Some((k, index)) if k == key => index,
                    _ => return None,
                };
                Some((index, name))
            })
            .collect();
        chunks.sort_unstable_by_key(|(index, _)| *index);
        chunks.into_iter().map(|(_, name)| name).collect()
    }

    fn delete_locked(&self, key: &str) -> Result<usize> {
        let names = self.chunk_names_locked(key);
        for name in &names {
            self.store.set_property(name, None)?;
        }
        Ok(names.len())
    }
}

/// Iterator over the distinct logical keys of a document.
pub struct Keys {
    names: std::vec::IntoIter<String>,
    seen: HashSet<String>,
}

impl Iterator for Keys {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for name in self.names.by_ref() {
            let key = logical_key(&name);
            if !self.seen.contains(key) {
                let key = key.to_string();
                self.seen.insert(key.clone());
                return Some(key);
            }
        }
        None
    }
}

/// Lazy iterator over document values.
pub struct Values<'a, S: PropertyStore, T, C> {
    doc: &'a Document<S>,
    keys: Keys,
    codec: &'a C,
    _value: PhantomData<fn() -> T>,
}

impl<S: PropertyStore, T, C: Codec<T>> Iterator for Values<'_, S, T, C> {
    type Item = Result<Option<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.keys.next()?;
        Some(self.doc.get_with(&key, self.codec))
    }
}

/// Lazy iterator over `(key, value)` pairs.
pub struct Entries<'a, S: PropertyStore, T, C> {
    doc: &'a Document<S>,
    keys: Keys,
    codec: &'a C,
    _value: PhantomData<fn() -> T>,
}

impl<S: PropertyStore, T, C: Codec<T>> Iterator for Entries<'_, S, T, C> {
    type Item = (String, Result<Option<T>>);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.keys.next()?;
        let value = self.doc.get_with(&key, self.codec);
        Some((key, value))
    }
}
