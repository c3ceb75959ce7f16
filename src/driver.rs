//! Transport driver interface.
//!
//! A [`NotifyDriver`] bridges one hardware mailbox/interrupt mechanism to
//! the dispatch core. The backend owns everything hardware-specific: it
//! detects an incoming notification (typically in its interrupt handler),
//! normalizes it to a `(slot, event, payload)` tuple, and calls
//! [`Notify::notify_event`](crate::Notify::notify_event). The core never
//! touches mailbox registers or acknowledgment sequencing.
//!
//! The core calls *into* the driver in three places:
//!
//! - [`send_event`](NotifyDriver::send_event) to raise an event on the
//!   remote processor (the outbound path),
//! - [`disable`](NotifyDriver::disable) when the slot's nesting counter
//!   transitions 0 → 1, so the backend can mask its interrupt source,
//! - [`enable`](NotifyDriver::enable) on the matching 1 → 0 transition.
//!
//! Transport-level failures are reported upward unchanged and never retried
//! by the core; whether a failure should escalate (for example by tearing
//! the driver down) is the backend owner's decision.

use crate::error::NotifyResult;
use crate::registry::EventId;

/// A transport backend bound to one processor slot.
pub trait NotifyDriver: Send + Sync {
    /// Short backend name for diagnostics (e.g. `"mailbox0"`).
    fn name(&self) -> &str;

    /// Unmask event delivery at the hardware level.
    ///
    /// Invoked when the slot's disable nesting counter returns to zero.
    fn enable(&self) -> NotifyResult {
        Ok(())
    }

    /// Mask event delivery at the hardware level.
    ///
    /// Invoked when the slot's disable nesting counter leaves zero.
    fn disable(&self) -> NotifyResult {
        Ok(())
    }

    /// Raise `event` with `payload` on the remote processor.
    fn send_event(&self, event: EventId, payload: u32) -> NotifyResult;
}
