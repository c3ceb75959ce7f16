//! Event dispatch: the interrupt-context fan-out path.
//!
//! [`dispatch`] is entered by a transport backend when it observes an event
//! signal, in an interrupt-context-equivalent execution mode: it never
//! blocks, never allocates, and only takes spin read locks that normal
//! context holds for bounded, non-blocking spans. The algorithm:
//!
//! 1. Validate the slot; an out-of-range or driverless slot fails with
//!    `UnknownProcessor` without touching registry state.
//! 2. Sample the slot's disable counter once. If nonzero, count the drop
//!    and return [`DispatchOutcome::Suppressed`]; no handler runs.
//! 3. Invoke the key's handlers synchronously, in subscription order. A
//!    failing handler is counted and logged but never stops the walk.
//! 4. Report [`DispatchOutcome::Delivered`] or, if any handler failed,
//!    [`DispatchOutcome::PartialFailure`] with the failure count.

use crate::error::{NotifyError, NotifyResult};
use crate::registry::{EventId, EventRegistry};
use crate::table::{DriverTable, ProcSlot};

/// Status of one dispatch cycle. `Suppressed` and `PartialFailure` are
/// statuses, not errors: the transport backend decides whether repeated
/// failures should escalate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every subscribed handler ran and succeeded.
    Delivered {
        /// Number of handlers invoked (zero if nobody subscribed).
        invoked: usize,
    },
    /// Delivery was suppressed by the slot's disable counter; no handler
    /// ran.
    Suppressed,
    /// All handlers ran, but some failed.
    PartialFailure {
        /// Number of handlers invoked.
        invoked: usize,
        /// Number of those that failed.
        failed: usize,
    },
}

impl DispatchOutcome {
    /// Whether every invoked handler succeeded.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// Number of failing handlers (zero unless `PartialFailure`).
    pub fn failed(&self) -> usize {
        match self {
            Self::PartialFailure { failed, .. } => *failed,
            _ => 0,
        }
    }
}

/// Resolves `(slot, event)` to its subscribers and invokes them.
///
/// See the module docs for the algorithm and context constraints.
pub(crate) fn dispatch(
    table: &DriverTable,
    registry: &EventRegistry,
    slot: ProcSlot,
    event: EventId,
    payload: u32,
) -> NotifyResult<DispatchOutcome> {
    if !table.is_registered(slot) {
        return Err(NotifyError::UnknownProcessor(slot.0));
    }

    // One sample at entry; a disable arriving mid-iteration does not abort
    // the in-flight delivery.
    if table.is_suppressed(slot) {
        table.stats_ref(slot).record_suppressed();
        trace!("slot {} event {} suppressed", slot.0, event.0);
        return Ok(DispatchOutcome::Suppressed);
    }

    let mut failed = 0usize;
    let invoked = registry.for_each_entry(slot, event, |handler, arg| {
        if let Err(err) = handler.on_event(slot, event, payload, arg) {
            failed += 1;
            warn!(
                "handler failed for slot {} event {}: {}",
                slot.0, event.0, err.0
            );
        }
    });

    let stats = table.stats_ref(slot);
    stats.record_delivered();

    if failed > 0 {
        stats.record_callback_failures(failed as u64);
        Ok(DispatchOutcome::PartialFailure { invoked, failed })
    } else {
        trace!(
            "slot {} event {} delivered to {} handler(s)",
            slot.0, event.0, invoked
        );
        Ok(DispatchOutcome::Delivered { invoked })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NotifyDriver;
    use crate::handler::{EventHandler, HandlerError, HandlerResult};
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;
    use spin::Mutex;

    struct NullDriver;

    impl NotifyDriver for NullDriver {
        fn name(&self) -> &str {
            "null"
        }

        fn send_event(&self, _event: EventId, _payload: u32) -> NotifyResult {
            Ok(())
        }
    }

    /// Appends its tag to a shared log on every invocation.
    struct Recorder {
        tag: usize,
        order: Arc<Mutex<Vec<usize>>>,
        fail: bool,
    }

    impl EventHandler for Recorder {
        fn on_event(
            &self,
            _slot: ProcSlot,
            _event: EventId,
            _payload: u32,
            _arg: usize,
        ) -> HandlerResult {
            self.order.lock().push(self.tag);
            if self.fail {
                Err(HandlerError("recorder configured to fail"))
            } else {
                Ok(())
            }
        }
    }

    fn setup(max_drivers: usize) -> (DriverTable, EventRegistry) {
        let table = DriverTable::new(max_drivers);
        table.register(ProcSlot(0), Arc::new(NullDriver)).unwrap();
        (table, EventRegistry::new(max_drivers))
    }

    fn recorder(
        order: &Arc<Mutex<Vec<usize>>>,
        tag: usize,
        fail: bool,
    ) -> Arc<dyn EventHandler> {
        Arc::new(Recorder {
            tag,
            order: Arc::clone(order),
            fail,
        })
    }

    #[test]
    fn test_dispatch_unknown_processor() {
        let (table, registry) = setup(2);

        // Out of range.
        let err = dispatch(&table, &registry, ProcSlot(2), EventId(0), 0).unwrap_err();
        assert_eq!(err, NotifyError::UnknownProcessor(2));

        // In range but no driver.
        let err = dispatch(&table, &registry, ProcSlot(1), EventId(0), 0).unwrap_err();
        assert_eq!(err, NotifyError::UnknownProcessor(1));
    }

    #[test]
    fn test_dispatch_invokes_in_subscription_order() {
        let (table, registry) = setup(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in [1, 2, 3] {
            registry
                .subscribe(ProcSlot(0), EventId(5), recorder(&order, tag, false), 0)
                .unwrap();
        }

        let outcome = dispatch(&table, &registry, ProcSlot(0), EventId(5), 0).unwrap();
        assert_eq!(outcome, DispatchOutcome::Delivered { invoked: 3 });
        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_dispatch_no_subscribers() {
        let (table, registry) = setup(1);
        let outcome = dispatch(&table, &registry, ProcSlot(0), EventId(9), 0).unwrap();
        assert_eq!(outcome, DispatchOutcome::Delivered { invoked: 0 });
    }

    #[test]
    fn test_failing_handler_does_not_stop_delivery() {
        let (table, registry) = setup(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        registry
            .subscribe(ProcSlot(0), EventId(5), recorder(&order, 1, true), 0)
            .unwrap();
        registry
            .subscribe(ProcSlot(0), EventId(5), recorder(&order, 2, false), 0)
            .unwrap();
        registry
            .subscribe(ProcSlot(0), EventId(5), recorder(&order, 3, true), 0)
            .unwrap();

        let outcome = dispatch(&table, &registry, ProcSlot(0), EventId(5), 0).unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::PartialFailure {
                invoked: 3,
                failed: 2,
            }
        );
        // Everyone still ran, in order.
        assert_eq!(*order.lock(), vec![1, 2, 3]);
        assert_eq!(table.stats(ProcSlot(0)).unwrap().callback_failures, 2);
    }

    #[test]
    fn test_dispatch_suppressed() {
        let (table, registry) = setup(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        registry
            .subscribe(ProcSlot(0), EventId(5), recorder(&order, 1, false), 0)
            .unwrap();

        table.disable(ProcSlot(0)).unwrap();
        let outcome = dispatch(&table, &registry, ProcSlot(0), EventId(5), 0).unwrap();
        assert_eq!(outcome, DispatchOutcome::Suppressed);
        assert!(order.lock().is_empty());
        assert_eq!(table.stats(ProcSlot(0)).unwrap().suppressed, 1);

        table.restore(ProcSlot(0)).unwrap();
        let outcome = dispatch(&table, &registry, ProcSlot(0), EventId(5), 0).unwrap();
        assert_eq!(outcome, DispatchOutcome::Delivered { invoked: 1 });
    }

    #[test]
    fn test_handlers_receive_payload_and_arg() {
        let (table, registry) = setup(1);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let handler = move |_: ProcSlot, _: EventId, payload: u32, arg: usize| -> HandlerResult {
            seen_clone.lock().push((payload, arg));
            Ok(())
        };
        registry
            .subscribe(ProcSlot(0), EventId(5), Arc::new(handler), 0xA5)
            .unwrap();

        dispatch(&table, &registry, ProcSlot(0), EventId(5), 0xDEAD_BEEF).unwrap();
        assert_eq!(*seen.lock(), vec![(0xDEAD_BEEF, 0xA5)]);
    }

    #[test]
    fn test_outcome_helpers() {
        assert!(DispatchOutcome::Delivered { invoked: 2 }.is_delivered());
        assert!(!DispatchOutcome::Suppressed.is_delivered());
        assert_eq!(
            DispatchOutcome::PartialFailure {
                invoked: 4,
                failed: 3,
            }
            .failed(),
            3
        );
    }
}
