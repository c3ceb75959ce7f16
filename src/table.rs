//! Driver table: bounded processor-slot bookkeeping.
//!
//! The table owns one optional transport driver per processor slot plus two
//! parallel fixed-capacity sequences sharing the same indexing: the disable
//! nesting counters and the per-slot statistics. All three are sized to
//! `max_drivers` at construction and never grow, so the dispatch path can
//! index them without allocating.
//!
//! The slot sequence sits behind a `spin::RwLock`: registration and
//! teardown (normal context) take the write lock, dispatch takes short read
//! locks. The counter and statistics sequences are lock-free atomics and
//! are consulted directly.

use alloc::sync::Arc;

use arrayvec::ArrayVec;
use spin::RwLock;

use crate::driver::NotifyDriver;
use crate::error::{NotifyError, NotifyResult};
use crate::slot::{DisableCount, SlotStats, SlotStatsSnapshot};

/// Compile-time ceiling on concurrently registered transport drivers.
///
/// The runtime bound (`NotifyConfig::max_drivers`) must not exceed this.
pub const MAX_DRIVERS: usize = 16;

/// Index of a processor/core slot, `< max_drivers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcSlot(pub usize);

/// Bounded table of transport drivers with parallel per-slot state.
pub struct DriverTable {
    /// One optional driver per slot; length fixed at `max_drivers`.
    slots: RwLock<ArrayVec<Option<Arc<dyn NotifyDriver>>, MAX_DRIVERS>>,
    /// Parallel disable nesting counters, same length and indexing.
    disable: ArrayVec<DisableCount, MAX_DRIVERS>,
    /// Parallel statistics blocks, same length and indexing.
    stats: ArrayVec<SlotStats, MAX_DRIVERS>,
    /// Runtime slot bound, `<= MAX_DRIVERS`.
    max_drivers: usize,
}

impl DriverTable {
    /// Creates an empty table with `max_drivers` slots.
    ///
    /// The bound must already be validated (see
    /// [`NotifyConfig::validate`](crate::NotifyConfig::validate)).
    pub fn new(max_drivers: usize) -> Self {
        debug_assert!(max_drivers >= 1 && max_drivers <= MAX_DRIVERS);

        let mut slots = ArrayVec::new();
        let mut disable = ArrayVec::new();
        let mut stats = ArrayVec::new();
        for _ in 0..max_drivers {
            slots.push(None);
            disable.push(DisableCount::new());
            stats.push(SlotStats::new());
        }

        Self {
            slots: RwLock::new(slots),
            disable,
            stats,
            max_drivers,
        }
    }

    /// The configured slot bound.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_drivers
    }

    fn check(&self, slot: ProcSlot) -> NotifyResult {
        if slot.0 >= self.max_drivers {
            return Err(NotifyError::OutOfRange {
                index: slot.0,
                max: self.max_drivers,
            });
        }
        Ok(())
    }

    /// Registers a driver into `slot`.
    ///
    /// Resets the slot's disable counter and statistics so the new backend
    /// starts with delivery active and a clean baseline.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for an invalid slot index, or `SlotOccupied` if
    /// the slot already holds a driver (existing state is not mutated).
    pub fn register(&self, slot: ProcSlot, driver: Arc<dyn NotifyDriver>) -> NotifyResult {
        self.check(slot)?;

        let mut slots = self.slots.write();
        if slots[slot.0].is_some() {
            return Err(NotifyError::SlotOccupied(slot));
        }

        debug!("registering driver '{}' at slot {}", driver.name(), slot.0);
        slots[slot.0] = Some(driver);
        self.disable[slot.0].reset();
        self.stats[slot.0].reset();
        Ok(())
    }

    /// Removes and returns the driver at `slot`.
    ///
    /// The table does not cascade: registry entries owned by the slot are
    /// the caller's responsibility (see
    /// [`Notify::unregister_driver`](crate::Notify::unregister_driver)).
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for an invalid slot index, or `NotRegistered`
    /// if the slot is empty.
    pub fn unregister(&self, slot: ProcSlot) -> NotifyResult<Arc<dyn NotifyDriver>> {
        self.check(slot)?;

        let mut slots = self.slots.write();
        match slots[slot.0].take() {
            Some(driver) => {
                debug!("unregistered driver '{}' from slot {}", driver.name(), slot.0);
                Ok(driver)
            }
            None => Err(NotifyError::NotRegistered(slot)),
        }
    }

    /// Returns the driver at `slot`, if any. No side effects.
    pub fn lookup(&self, slot: ProcSlot) -> Option<Arc<dyn NotifyDriver>> {
        if slot.0 >= self.max_drivers {
            return None;
        }
        self.slots.read()[slot.0].clone()
    }

    /// Whether `slot` currently holds a driver.
    #[inline]
    pub fn is_registered(&self, slot: ProcSlot) -> bool {
        slot.0 < self.max_drivers && self.slots.read()[slot.0].is_some()
    }

    /// Number of occupied slots.
    pub fn registered_count(&self) -> usize {
        self.slots.read().iter().filter(|s| s.is_some()).count()
    }

    /// Fails with `OutOfRange` or `NotRegistered` unless `slot` holds a
    /// driver.
    pub fn ensure_registered(&self, slot: ProcSlot) -> NotifyResult {
        self.check(slot)?;
        if !self.is_registered(slot) {
            return Err(NotifyError::NotRegistered(slot));
        }
        Ok(())
    }

    /// Increments the slot's disable nesting counter.
    ///
    /// On the 0 → 1 transition the registered driver's
    /// [`disable`](NotifyDriver::disable) hook runs so the backend can mask
    /// its interrupt source; the counter stays raised even if the hook
    /// fails, and the hook error is propagated.
    ///
    /// Returns the new nesting depth.
    pub fn disable(&self, slot: ProcSlot) -> NotifyResult<u32> {
        self.check(slot)?;

        let (depth, transitioned) = self.disable[slot.0].raise();
        trace!("slot {} disabled, depth {}", slot.0, depth);

        if transitioned {
            if let Some(driver) = self.lookup(slot) {
                driver.disable()?;
            }
        }
        Ok(depth)
    }

    /// Decrements the slot's disable nesting counter.
    ///
    /// On the 1 → 0 transition the registered driver's
    /// [`enable`](NotifyDriver::enable) hook runs. An unmatched restore
    /// (depth already zero) fails with `RestoreUnderflow` and changes
    /// nothing.
    ///
    /// Returns the new nesting depth.
    pub fn restore(&self, slot: ProcSlot) -> NotifyResult<u32> {
        self.check(slot)?;

        let (depth, reached_zero) = self.disable[slot.0]
            .try_lower()
            .ok_or(NotifyError::RestoreUnderflow(slot))?;
        trace!("slot {} restored, depth {}", slot.0, depth);

        if reached_zero {
            if let Some(driver) = self.lookup(slot) {
                driver.enable()?;
            }
        }
        Ok(depth)
    }

    /// The slot's current disable nesting depth.
    pub fn disable_depth(&self, slot: ProcSlot) -> NotifyResult<u32> {
        self.check(slot)?;
        Ok(self.disable[slot.0].depth())
    }

    /// Lock-free suppression check for the dispatch path.
    ///
    /// The caller must have validated `slot` already.
    #[inline]
    pub(crate) fn is_suppressed(&self, slot: ProcSlot) -> bool {
        debug_assert!(slot.0 < self.max_drivers);
        self.disable[slot.0].is_suppressed()
    }

    /// Lock-free statistics access for the dispatch and send paths.
    ///
    /// The caller must have validated `slot` already.
    #[inline]
    pub(crate) fn stats_ref(&self, slot: ProcSlot) -> &SlotStats {
        debug_assert!(slot.0 < self.max_drivers);
        &self.stats[slot.0]
    }

    /// Point-in-time copy of the slot's statistics.
    pub fn stats(&self, slot: ProcSlot) -> NotifyResult<SlotStatsSnapshot> {
        self.check(slot)?;
        Ok(self.stats[slot.0].snapshot())
    }
}

impl core::fmt::Debug for DriverTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DriverTable")
            .field("max_drivers", &self.max_drivers)
            .field("registered", &self.registered_count())
            .finish()
    }
}
