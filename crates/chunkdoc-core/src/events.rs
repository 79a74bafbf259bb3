//! Entity-removal notifications.
//!
//! The registry caches one document per entity and must drop it once the
//! entity is gone. Hosts deliver removals through `EntityRemovalSource`;
//! `EntityEvents` is a plain in-process implementation.

use crate::store::EntityId;
use std::sync::{Arc, Mutex, PoisonError};

/// What a listener wants after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Keep,
    /// Drop this listener; it will not be called again.
    Unsubscribe,
}

pub type RemovalListener = Arc<dyn Fn(&EntityId) -> Delivery + Send + Sync>;

/// Something that reports entities being removed from the world.
pub trait EntityRemovalSource {
    fn on_entity_removed(&self, listener: RemovalListener);
}

/// In-process removal feed. Listeners run synchronously, in registration
/// order, on the thread that calls `emit_removed`.
///
/// Listeners are called without the feed's lock held, so they may remove
/// further entities or register new listeners. A listener registered during
/// delivery first sees the next event.
#[derive(Default)]
pub struct EntityEvents {
    listeners: Mutex<Vec<RemovalListener>>,
}

impl EntityEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit_removed(&self, id: &EntityId) {
        let snapshot: Vec<RemovalListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut finished = Vec::new();
        for listener in snapshot {
            if (*listener)(id) == Delivery::Unsubscribe {
                finished.push(listener);
            }
        }
        if finished.is_empty() {
            return;
        }

        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|l| !finished.iter().any(|f| Arc::ptr_eq(l, f)));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl EntityRemovalSource for EntityEvents {
    fn on_entity_removed(&self, listener: RemovalListener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_all_listeners_in_order() {
        let events = EntityEvents::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            events.on_entity_removed(Arc::new(move |id: &EntityId| {
                seen.lock().unwrap().push(format!("{}:{}", tag, id));
                Delivery::Keep
            }));
        }
        assert_eq!(events.listener_count(), 2);

        events.emit_removed(&EntityId::new("e7"));
        assert_eq!(*seen.lock().unwrap(), vec!["first:e7", "second:e7"]);
    }

    #[test]
    fn test_unsubscribe_drops_only_that_listener() {
        let events = EntityEvents::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let once = Arc::clone(&calls);
        events.on_entity_removed(Arc::new(move |id: &EntityId| {
            once.lock().unwrap().push(format!("once:{}", id));
            Delivery::Unsubscribe
        }));
        let always = Arc::clone(&calls);
        events.on_entity_removed(Arc::new(move |id: &EntityId| {
            always.lock().unwrap().push(format!("always:{}", id));
            Delivery::Keep
        }));

        events.emit_removed(&EntityId::new("a"));
        events.emit_removed(&EntityId::new("b"));
        assert_eq!(events.listener_count(), 1);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["once:a", "always:a", "always:b"]
        );
    }

    #[test]
    fn test_listener_can_subscribe_during_delivery() {
        let events = Arc::new(EntityEvents::new());
        let late_calls = Arc::new(Mutex::new(0));

        let feed = Arc::downgrade(&events);
        let counter = Arc::clone(&late_calls);
        events.on_entity_removed(Arc::new(move |_: &EntityId| {
            if let Some(feed) = feed.upgrade() {
                let counter = Arc::clone(&counter);
                feed.on_entity_removed(Arc::new(move |_: &EntityId| {
                    *counter.lock().unwrap() += 1;
                    Delivery::Keep
                }));
            }
            Delivery::Unsubscribe
        }));

        events.emit_removed(&EntityId::new("a"));
        assert_eq!(events.listener_count(), 1);
        assert_eq!(*late_calls.lock().unwrap(), 0);

        events.emit_removed(&EntityId::new("b"));
        assert_eq!(*late_calls.lock().unwrap(), 1);
    }
}
