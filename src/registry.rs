//! Event subscription registry.
//!
//! Maps a `(processor slot, event id)` key to the ordered list of
//! subscribed handlers. Delivery order within a key is subscription order
//! (FIFO) and is deterministic: the dispatcher walks the list front to
//! back.
//!
//! All mutation (`subscribe`, `unsubscribe`, slot teardown) happens from
//! normal context under the write half of a `spin::RwLock`; the dispatcher
//! iterates under the read half, so concurrent mutation for the same key is
//! serialized against in-flight delivery. Entries are owned by the
//! registry, keyed by `(slot, event)` and never by individual drivers, so a
//! driver's teardown removes them through
//! [`remove_slot_entries`](EventRegistry::remove_slot_entries) instead of
//! assuming the driver held them.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use spin::RwLock;

use crate::error::{NotifyError, NotifyResult};
use crate::handler::EventHandler;
use crate::table::ProcSlot;

/// Opaque per-processor event identifier.
///
/// The dispatcher treats it purely as a lookup key, never as structured
/// data; an event nobody subscribed to simply finds zero entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u32);

/// Token returned by [`subscribe`](EventRegistry::subscribe), consumed by
/// [`unsubscribe`](EventRegistry::unsubscribe).
///
/// Handles are allocated monotonically and never reused within a registry's
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryHandle(u64);

/// Slot-major key; the derived ordering keeps a slot's entries contiguous
/// so teardown can sweep them in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EventKey {
    slot: ProcSlot,
    event: EventId,
}

struct EntryRecord {
    handle: EntryHandle,
    handler: Arc<dyn EventHandler>,
    arg: usize,
}

#[derive(Default)]
struct RegistryInner {
    /// Ordered handler lists per key; push order is delivery order.
    entries: BTreeMap<EventKey, Vec<EntryRecord>>,
    /// Reverse index for O(log n) unsubscribe.
    index: BTreeMap<EntryHandle, EventKey>,
}

/// Ordered subscription registry for one [`Notify`](crate::Notify) context.
pub struct EventRegistry {
    inner: RwLock<RegistryInner>,
    next_handle: AtomicU64,
    max_slots: usize,
}

impl EventRegistry {
    /// Creates an empty registry accepting slots `< max_slots`.
    pub fn new(max_slots: usize) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            next_handle: AtomicU64::new(1),
            max_slots,
        }
    }

    /// Appends a handler to the ordered list for `(slot, event)`.
    ///
    /// Never fails for a valid slot; subscribing to a slot with no
    /// registered driver is legal (the driver may come and go while the
    /// subscription stands).
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if `slot` exceeds the configured bound.
    pub fn subscribe(
        &self,
        slot: ProcSlot,
        event: EventId,
        handler: Arc<dyn EventHandler>,
        arg: usize,
    ) -> NotifyResult<EntryHandle> {
        if slot.0 >= self.max_slots {
            return Err(NotifyError::OutOfRange {
                index: slot.0,
                max: self.max_slots,
            });
        }

        let handle = EntryHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let key = EventKey { slot, event };

        let mut inner = self.inner.write();
        inner.entries.entry(key).or_default().push(EntryRecord {
            handle,
            handler,
            arg,
        });
        inner.index.insert(handle, key);

        debug!(
            "subscribed {:?} to slot {} event {}",
            handle, slot.0, event.0
        );
        Ok(handle)
    }

    /// Removes the subscription named by `handle`.
    ///
    /// Removal is not idempotent: a second unsubscribe of the same handle
    /// is a caller error and fails with `NotFound`.
    pub fn unsubscribe(&self, handle: EntryHandle) -> NotifyResult {
        let mut inner = self.inner.write();

        let key = inner
            .index
            .remove(&handle)
            .ok_or(NotifyError::NotFound(handle))?;

        let list = inner
            .entries
            .get_mut(&key)
            .expect("index entry without handler list");
        let pos = list
            .iter()
            .position(|record| record.handle == handle)
            .expect("handler list out of sync with index");
        list.remove(pos);
        if list.is_empty() {
            inner.entries.remove(&key);
        }

        debug!("unsubscribed {:?}", handle);
        Ok(())
    }

    /// Invokes `visit` for each entry of `(slot, event)` in subscription
    /// order, under the read lock.
    ///
    /// Returns the number of entries visited. This is the dispatcher's view
    /// of the registry; `visit` must honor the restricted-context contract
    /// (see [`handler`](crate::handler)).
    pub(crate) fn for_each_entry<F>(&self, slot: ProcSlot, event: EventId, mut visit: F) -> usize
    where
        F: FnMut(&Arc<dyn EventHandler>, usize),
    {
        let inner = self.inner.read();
        let key = EventKey { slot, event };

        match inner.entries.get(&key) {
            Some(list) => {
                for record in list {
                    visit(&record.handler, record.arg);
                }
                list.len()
            }
            None => 0,
        }
    }

    /// Number of entries currently subscribed to `(slot, event)`.
    pub fn entry_count(&self, slot: ProcSlot, event: EventId) -> usize {
        self.inner
            .read()
            .entries
            .get(&EventKey { slot, event })
            .map_or(0, Vec::len)
    }

    /// Removes every entry owned by `slot`, returning how many were
    /// dropped. Used by driver teardown.
    pub fn remove_slot_entries(&self, slot: ProcSlot) -> usize {
        let mut inner = self.inner.write();
        let inner = &mut *inner;

        let keys: Vec<EventKey> = inner
            .entries
            .keys()
            .copied()
            .filter(|key| key.slot == slot)
            .collect();

        let mut removed = 0;
        for key in keys {
            if let Some(list) = inner.entries.remove(&key) {
                for record in &list {
                    inner.index.remove(&record.handle);
                }
                removed += list.len();
            }
        }

        if removed > 0 {
            debug!("removed {} subscription(s) for slot {}", removed, slot.0);
        }
        removed
    }

    /// Removes every entry in the registry, returning how many were
    /// dropped. Used at subsystem shutdown.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let removed = inner.index.len();
        inner.entries.clear();
        inner.index.clear();
        removed
    }

    /// Total number of live subscriptions.
    pub fn len(&self) -> usize {
        self.inner.read().index.len()
    }

    /// Whether the registry holds no subscriptions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl core::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("max_slots", &self.max_slots)
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerResult;
    use alloc::vec;

    fn noop() -> Arc<dyn EventHandler> {
        Arc::new(
            |_: ProcSlot, _: EventId, _: u32, _: usize| -> HandlerResult { Ok(()) },
        )
    }

    #[test]
    fn test_subscribe_out_of_range() {
        let registry = EventRegistry::new(2);
        let err = registry
            .subscribe(ProcSlot(2), EventId(0), noop(), 0)
            .unwrap_err();
        assert_eq!(err, NotifyError::OutOfRange { index: 2, max: 2 });
    }

    #[test]
    fn test_subscription_order_is_fifo() {
        let registry = EventRegistry::new(1);
        let slot = ProcSlot(0);
        let event = EventId(5);

        registry.subscribe(slot, event, noop(), 10).unwrap();
        registry.subscribe(slot, event, noop(), 20).unwrap();
        registry.subscribe(slot, event, noop(), 30).unwrap();

        let mut seen = vec![];
        let visited = registry.for_each_entry(slot, event, |_, arg| seen.push(arg));
        assert_eq!(visited, 3);
        assert_eq!(seen, vec![10, 20, 30]);
    }

    #[test]
    fn test_unsubscribe_preserves_order() {
        let registry = EventRegistry::new(1);
        let slot = ProcSlot(0);
        let event = EventId(5);

        let _first = registry.subscribe(slot, event, noop(), 10).unwrap();
        let second = registry.subscribe(slot, event, noop(), 20).unwrap();
        let _third = registry.subscribe(slot, event, noop(), 30).unwrap();

        registry.unsubscribe(second).unwrap();

        let mut seen = vec![];
        registry.for_each_entry(slot, event, |_, arg| seen.push(arg));
        assert_eq!(seen, vec![10, 30]);
    }

    #[test]
    fn test_double_unsubscribe_fails() {
        let registry = EventRegistry::new(1);
        let handle = registry
            .subscribe(ProcSlot(0), EventId(1), noop(), 0)
            .unwrap();

        registry.unsubscribe(handle).unwrap();
        let err = registry.unsubscribe(handle).unwrap_err();
        assert_eq!(err, NotifyError::NotFound(handle));
    }

    #[test]
    fn test_keys_are_independent() {
        let registry = EventRegistry::new(2);

        registry.subscribe(ProcSlot(0), EventId(1), noop(), 0).unwrap();
        registry.subscribe(ProcSlot(0), EventId(2), noop(), 0).unwrap();
        registry.subscribe(ProcSlot(1), EventId(1), noop(), 0).unwrap();

        assert_eq!(registry.entry_count(ProcSlot(0), EventId(1)), 1);
        assert_eq!(registry.entry_count(ProcSlot(0), EventId(2)), 1);
        assert_eq!(registry.entry_count(ProcSlot(1), EventId(1)), 1);
        assert_eq!(registry.entry_count(ProcSlot(1), EventId(2)), 0);
    }

    #[test]
    fn test_remove_slot_entries() {
        let registry = EventRegistry::new(2);

        let kept = registry.subscribe(ProcSlot(1), EventId(1), noop(), 0).unwrap();
        let gone = registry.subscribe(ProcSlot(0), EventId(1), noop(), 0).unwrap();
        registry.subscribe(ProcSlot(0), EventId(2), noop(), 0).unwrap();

        assert_eq!(registry.remove_slot_entries(ProcSlot(0)), 2);
        assert_eq!(registry.len(), 1);

        // Swept handles are dead, the other slot's handle still lives.
        assert_eq!(
            registry.unsubscribe(gone).unwrap_err(),
            NotifyError::NotFound(gone)
        );
        registry.unsubscribe(kept).unwrap();
    }

    #[test]
    fn test_clear() {
        let registry = EventRegistry::new(1);
        registry.subscribe(ProcSlot(0), EventId(1), noop(), 0).unwrap();
        registry.subscribe(ProcSlot(0), EventId(2), noop(), 0).unwrap();

        assert_eq!(registry.clear(), 2);
        assert!(registry.is_empty());
    }
}
