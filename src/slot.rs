//! Per-slot atomic state: the disable nesting counter and statistics.
//!
//! Both types are lock-free so the dispatch path can consult them without
//! taking the driver table's write lock.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Nested disable/enable counter for one processor slot.
///
/// `raise()` increments the counter, `try_lower()` decrements it; event
/// delivery is suppressed whenever the counter is nonzero. The counter
/// starts at zero (delivery active). Decrementing below zero is refused:
/// an unmatched restore is a caller error the core fails loudly on rather
/// than clamping or wrapping.
///
/// Transitions (0 → 1 and 1 → 0) are reported to the caller so it can run
/// the driver's hardware mask hooks exactly once per suppressed region,
/// however deeply the regions nest.
#[derive(Debug, Default)]
pub struct DisableCount(AtomicU32);

impl DisableCount {
    /// Creates a counter at depth zero (delivery active).
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Current nesting depth.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// Whether delivery is currently suppressed.
    ///
    /// Dispatch samples this exactly once at entry; see
    /// [`Notify::notify_event`](crate::Notify::notify_event) for the
    /// relaxed overlap semantics.
    #[inline]
    pub fn is_suppressed(&self) -> bool {
        self.depth() != 0
    }

    /// Increments the depth.
    ///
    /// Returns the new depth and whether this call left depth zero
    /// (the 0 → 1 transition).
    pub fn raise(&self) -> (u32, bool) {
        let prev = self.0.fetch_add(1, Ordering::AcqRel);
        debug_assert!(prev < u32::MAX, "disable nesting depth overflow");
        (prev + 1, prev == 0)
    }

    /// Decrements the depth, refusing to underflow.
    ///
    /// Returns `Some((new_depth, reached_zero))`, or `None` if the depth
    /// was already zero. Uses a CAS loop so a concurrent `raise` between
    /// the check and the decrement retries instead of racing.
    pub fn try_lower(&self) -> Option<(u32, bool)> {
        loop {
            let current = self.0.load(Ordering::Acquire);
            if current == 0 {
                return None;
            }

            match self.0.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some((current - 1, current == 1)),
                Err(_) => continue,
            }
        }
    }

    /// Resets the depth to zero (delivery active).
    ///
    /// Used when a driver registers into the slot.
    pub fn reset(&self) {
        self.0.store(0, Ordering::Release);
    }
}

/// Monotonic per-slot counters, updated with relaxed atomics.
///
/// `delivered` counts completed dispatch cycles (including those that ended
/// in partial failure); `suppressed` counts dispatches dropped while the
/// slot was disabled; `callback_failures` counts individual failing
/// handlers; `sent` counts successful outbound events.
#[derive(Debug, Default)]
pub struct SlotStats {
    delivered: AtomicU64,
    suppressed: AtomicU64,
    callback_failures: AtomicU64,
    sent: AtomicU64,
}

/// Point-in-time copy of a slot's [`SlotStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotStatsSnapshot {
    /// Completed dispatch cycles.
    pub delivered: u64,
    /// Dispatches dropped while the slot was disabled.
    pub suppressed: u64,
    /// Individual handler failures across all dispatches.
    pub callback_failures: u64,
    /// Successful outbound sends.
    pub sent: u64,
}

impl SlotStats {
    /// Creates a zeroed statistics block.
    pub const fn new() -> Self {
        Self {
            delivered: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
            callback_failures: AtomicU64::new(0),
            sent: AtomicU64::new(0),
        }
    }

    /// Records a completed dispatch cycle.
    #[inline]
    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a dispatch dropped by suppression.
    #[inline]
    pub fn record_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `count` failing handlers from one dispatch cycle.
    #[inline]
    pub fn record_callback_failures(&self, count: u64) {
        self.callback_failures.fetch_add(count, Ordering::Relaxed);
    }

    /// Records a successful outbound send.
    #[inline]
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters.
    pub fn snapshot(&self) -> SlotStatsSnapshot {
        SlotStatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
        }
    }

    /// Zeroes all counters.
    ///
    /// Used when a driver registers into the slot so the new backend starts
    /// from a clean baseline.
    pub fn reset(&self) {
        self.delivered.store(0, Ordering::Relaxed);
        self.suppressed.store(0, Ordering::Relaxed);
        self.callback_failures.store(0, Ordering::Relaxed);
        self.sent.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disable_count_initial() {
        let count = DisableCount::new();
        assert_eq!(count.depth(), 0);
        assert!(!count.is_suppressed());
    }

    #[test]
    fn test_disable_count_nesting() {
        let count = DisableCount::new();

        assert_eq!(count.raise(), (1, true));
        assert_eq!(count.raise(), (2, false));
        assert!(count.is_suppressed());

        // First lower stays suppressed (depth 2 -> 1).
        assert_eq!(count.try_lower(), Some((1, false)));
        assert!(count.is_suppressed());

        // Second lower reaches zero.
        assert_eq!(count.try_lower(), Some((0, true)));
        assert!(!count.is_suppressed());
    }

    #[test]
    fn test_disable_count_underflow_refused() {
        let count = DisableCount::new();
        assert_eq!(count.try_lower(), None);
        assert_eq!(count.depth(), 0);

        count.raise();
        count.try_lower().unwrap();
        assert_eq!(count.try_lower(), None);
    }

    #[test]
    fn test_disable_count_reset() {
        let count = DisableCount::new();
        count.raise();
        count.raise();
        count.reset();
        assert_eq!(count.depth(), 0);
        assert_eq!(count.try_lower(), None);
    }

    #[test]
    fn test_stats_counters() {
        let stats = SlotStats::new();
        stats.record_delivered();
        stats.record_delivered();
        stats.record_suppressed();
        stats.record_callback_failures(3);
        stats.record_sent();

        let snap = stats.snapshot();
        assert_eq!(snap.delivered, 2);
        assert_eq!(snap.suppressed, 1);
        assert_eq!(snap.callback_failures, 3);
        assert_eq!(snap.sent, 1);
    }

    #[test]
    fn test_stats_reset() {
        let stats = SlotStats::new();
        stats.record_delivered();
        stats.record_sent();
        stats.reset();
        assert_eq!(stats.snapshot(), SlotStatsSnapshot::default());
    }
}
