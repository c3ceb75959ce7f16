//! Event handler contract for the restricted dispatch context.
//!
//! Handlers run synchronously inside
//! [`Notify::notify_event`](crate::Notify::notify_event), which is entered
//! from an interrupt-context-equivalent execution mode. The contract is
//! strict:
//!
//! - **No blocking.** A handler must not sleep, wait, or take a lock that a
//!   blocking operation can hold.
//! - **No allocation.** The dispatch path performs none, and neither may a
//!   handler; failures are reported with a `&'static str` for this reason.
//! - **No re-entry.** A handler must not call back into registry or table
//!   mutation (`subscribe`, `unsubscribe`, `register_driver`,
//!   `unregister_driver`); those run from normal context only. Handlers are
//!   invoked while the registry read lock is held, so a violating handler
//!   deadlocks immediately rather than corrupting state.
//!
//! A misbehaving handler that blocks the dispatcher is a caller-introduced
//! defect; the core documents the contract rather than defending against it.

use crate::registry::EventId;
use crate::table::ProcSlot;

/// Failure reported by an event handler.
///
/// Carries a static reason string so the failure path itself cannot
/// allocate. One failing handler never prevents delivery to the handlers
/// after it; the dispatcher aggregates failures into
/// [`DispatchOutcome::PartialFailure`](crate::DispatchOutcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerError(pub &'static str);

/// Result returned by [`EventHandler::on_event`].
pub type HandlerResult = Result<(), HandlerError>;

/// A subscriber callback invoked when its (processor, event) key fires.
///
/// `payload` is the 32-bit word carried by the notification; `arg` is the
/// opaque word supplied at subscription time and passed back verbatim on
/// every invocation.
pub trait EventHandler: Send + Sync {
    /// Called from the dispatch context. See the module docs for the
    /// execution contract.
    fn on_event(&self, slot: ProcSlot, event: EventId, payload: u32, arg: usize) -> HandlerResult;
}

/// Plain functions and closures can serve as handlers directly.
impl<F> EventHandler for F
where
    F: Fn(ProcSlot, EventId, u32, usize) -> HandlerResult + Send + Sync,
{
    fn on_event(&self, slot: ProcSlot, event: EventId, payload: u32, arg: usize) -> HandlerResult {
        self(slot, event, payload, arg)
    }
}
