//! The `Notify` context object: the subsystem's single entry point.
//!
//! One `Notify` value is constructed at subsystem start and dropped at
//! subsystem stop; every operation goes through it (no ambient global, no
//! direct field access), so the locking discipline stays centralized in the
//! [`DriverTable`] and [`EventRegistry`] it owns.

use alloc::sync::Arc;

use crate::config::NotifyConfig;
use crate::dispatch::{self, DispatchOutcome};
use crate::driver::NotifyDriver;
use crate::error::{NotifyError, NotifyResult};
use crate::handler::EventHandler;
use crate::registry::{EntryHandle, EventId, EventRegistry};
use crate::slot::SlotStatsSnapshot;
use crate::table::{DriverTable, ProcSlot};

/// Inter-processor notification context.
///
/// Owns the driver table (one transport backend per processor slot, with
/// the parallel disable counters and statistics) and the event registry
/// (ordered subscriptions keyed by `(slot, event)`).
///
/// # Execution contexts
///
/// [`notify_event`](Self::notify_event) is the only operation callable from
/// restricted (interrupt-equivalent) context. Everything else (driver
/// registration, subscription, enable/disable, shutdown) runs from normal
/// context and synchronizes against in-flight dispatch through spin locks.
/// Driver registration and teardown are subsystem-lifecycle operations and
/// are expected to be issued by a single owner, not raced against each
/// other.
pub struct Notify {
    table: DriverTable,
    registry: EventRegistry,
}

impl Notify {
    /// Creates a context with `config.max_drivers` processor slots.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the configured bound is zero or exceeds
    /// [`MAX_DRIVERS`](crate::MAX_DRIVERS).
    pub fn new(config: NotifyConfig) -> NotifyResult<Self> {
        config.validate()?;
        debug!("notify context created, {} slot(s)", config.max_drivers);

        Ok(Self {
            table: DriverTable::new(config.max_drivers),
            registry: EventRegistry::new(config.max_drivers),
        })
    }

    /// The configured number of processor slots.
    #[inline]
    pub fn max_drivers(&self) -> usize {
        self.table.capacity()
    }

    /// Number of slots currently holding a driver.
    #[inline]
    pub fn driver_count(&self) -> usize {
        self.table.registered_count()
    }

    /// Registers a transport driver for `slot`.
    ///
    /// Resets the slot's disable counter (delivery active) and statistics.
    ///
    /// # Errors
    ///
    /// `OutOfRange` for an invalid slot, `SlotOccupied` if a driver is
    /// already registered there (existing state untouched).
    pub fn register_driver(&self, slot: ProcSlot, driver: Arc<dyn NotifyDriver>) -> NotifyResult {
        self.table.register(slot, driver)
    }

    /// Tears down the driver at `slot`.
    ///
    /// The slot's registry entries are removed first (entries are owned by
    /// the registry, keyed by `(slot, event)`; the driver never held
    /// them), then the slot is cleared. A dispatch already past its entry
    /// checks may still deliver to the old entries; the next one fails
    /// with `UnknownProcessor`.
    ///
    /// # Errors
    ///
    /// `OutOfRange` for an invalid slot, `NotRegistered` if it is empty
    /// (no entries are removed in either case).
    pub fn unregister_driver(&self, slot: ProcSlot) -> NotifyResult {
        self.table.ensure_registered(slot)?;
        self.registry.remove_slot_entries(slot);
        self.table.unregister(slot)?;
        Ok(())
    }

    /// Returns the driver registered at `slot`, if any. No side effects.
    pub fn lookup_driver(&self, slot: ProcSlot) -> Option<Arc<dyn NotifyDriver>> {
        self.table.lookup(slot)
    }

    /// Subscribes `handler` to `(slot, event)`.
    ///
    /// Handlers for the same key are invoked in subscription order. `arg`
    /// is passed back verbatim on every invocation. Subscribing does not
    /// require a driver at the slot.
    ///
    /// # Errors
    ///
    /// `OutOfRange` for an invalid slot.
    pub fn subscribe(
        &self,
        slot: ProcSlot,
        event: EventId,
        handler: Arc<dyn EventHandler>,
        arg: usize,
    ) -> NotifyResult<EntryHandle> {
        self.registry.subscribe(slot, event, handler, arg)
    }

    /// Removes the subscription named by `handle`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the handle was never issued or already removed
    /// (double-unsubscribe is a caller error, not an idempotent no-op).
    pub fn unsubscribe(&self, handle: EntryHandle) -> NotifyResult {
        self.registry.unsubscribe(handle)
    }

    /// Number of handlers currently subscribed to `(slot, event)`.
    pub fn subscription_count(&self, slot: ProcSlot, event: EventId) -> usize {
        self.registry.entry_count(slot, event)
    }

    /// Suppresses event delivery for `slot`, incrementing the nesting
    /// counter.
    ///
    /// Disable regions nest: delivery resumes only after a matching number
    /// of [`restore`](Self::restore) calls. On the outermost disable the
    /// driver's hardware mask hook runs. Returns the new depth.
    pub fn disable(&self, slot: ProcSlot) -> NotifyResult<u32> {
        self.table.disable(slot)
    }

    /// Reverts one [`disable`](Self::disable), decrementing the nesting
    /// counter.
    ///
    /// On the outermost restore the driver's hardware unmask hook runs.
    /// Returns the new depth.
    ///
    /// # Errors
    ///
    /// `RestoreUnderflow` if the counter is already zero; unbalanced
    /// enable/disable pairs fail loudly instead of clamping.
    pub fn restore(&self, slot: ProcSlot) -> NotifyResult<u32> {
        self.table.restore(slot)
    }

    /// Current disable nesting depth for `slot` (zero means delivery is
    /// active).
    pub fn disable_depth(&self, slot: ProcSlot) -> NotifyResult<u32> {
        self.table.disable_depth(slot)
    }

    /// Dispatches an incoming event to its subscribers.
    ///
    /// Called by a transport backend from restricted
    /// (interrupt-equivalent) context when it observes an event signal;
    /// this path never blocks or allocates. Handlers run synchronously, in
    /// subscription order, before this returns. A failing handler never
    /// blocks delivery to the handlers after it; failures are aggregated
    /// into [`DispatchOutcome::PartialFailure`].
    ///
    /// The disable counter is sampled once at entry: a `disable` that
    /// overlaps an in-flight dispatch lets that delivery finish rather
    /// than interrupting it mid-iteration. Suppressed dispatches are
    /// counted in the slot statistics and return
    /// [`DispatchOutcome::Suppressed`].
    ///
    /// # Errors
    ///
    /// `UnknownProcessor` if `slot` is out of range or holds no driver;
    /// registry state is untouched. The error is fatal to this dispatch
    /// only and is never retried by the core.
    pub fn notify_event(
        &self,
        slot: ProcSlot,
        event: EventId,
        payload: u32,
    ) -> NotifyResult<DispatchOutcome> {
        dispatch::dispatch(&self.table, &self.registry, slot, event, payload)
    }

    /// Raises `event` on the remote processor behind `slot`.
    ///
    /// The outbound counterpart of [`notify_event`](Self::notify_event):
    /// forwards to the slot driver's transport. The disable counter gates
    /// inbound delivery, not emission, so sending through a suppressed
    /// slot is permitted. Transport errors propagate unchanged and are
    /// never retried.
    ///
    /// # Errors
    ///
    /// `OutOfRange` / `NotRegistered` for a bad or empty slot, or whatever
    /// the driver reports.
    pub fn send_event(&self, slot: ProcSlot, event: EventId, payload: u32) -> NotifyResult {
        self.table.ensure_registered(slot)?;
        let driver = self
            .table
            .lookup(slot)
            .ok_or(NotifyError::NotRegistered(slot))?;

        driver.send_event(event, payload)?;
        self.table.stats_ref(slot).record_sent();
        trace!("sent event {} to slot {}", event.0, slot.0);
        Ok(())
    }

    /// Point-in-time copy of the slot's delivery statistics.
    pub fn stats(&self, slot: ProcSlot) -> NotifyResult<SlotStatsSnapshot> {
        self.table.stats(slot)
    }

    /// Shuts the subsystem down.
    ///
    /// Every driver must have been unregistered first; stray subscriptions
    /// to slots that never had a driver are dropped here.
    ///
    /// # Errors
    ///
    /// `DriversRemain(n)` while any slot still holds a driver.
    pub fn shutdown(&self) -> NotifyResult {
        let remaining = self.table.registered_count();
        if remaining > 0 {
            return Err(NotifyError::DriversRemain(remaining));
        }

        let stray = self.registry.clear();
        if stray > 0 {
            debug!("dropped {stray} stray subscription(s) at shutdown");
        }
        debug!("notify context shut down");
        Ok(())
    }
}

impl core::fmt::Debug for Notify {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Notify")
            .field("table", &self.table)
            .field("registry", &self.registry)
            .finish()
    }
}
