//! Error types for the notification core.
//!
//! Every fallible operation in this crate returns [`NotifyResult`]. The
//! variants mirror the distinct ways the subsystem can be misused or fail:
//! configuration/registration errors are reported synchronously to the
//! caller and never retried by the core; dispatch-time errors are fatal to
//! that single dispatch only.

use core::fmt;

use crate::registry::EntryHandle;
use crate::table::ProcSlot;

/// Errors produced by the notification core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyError {
    /// A slot or configuration index exceeded the configured bound.
    OutOfRange {
        /// The offending index or requested capacity.
        index: usize,
        /// The bound it was checked against.
        max: usize,
    },
    /// A driver is already registered at this slot.
    SlotOccupied(ProcSlot),
    /// No driver is registered at this slot.
    NotRegistered(ProcSlot),
    /// The entry handle does not name a live subscription.
    NotFound(EntryHandle),
    /// Dispatch-time: the processor index is out of range or has no driver.
    UnknownProcessor(usize),
    /// `restore()` was called with the nesting counter already at zero.
    RestoreUnderflow(ProcSlot),
    /// `shutdown()` was called while drivers were still registered.
    DriversRemain(usize),
    /// A transport backend reported a failure.
    Transport(&'static str),
}

/// Result alias used throughout the crate.
pub type NotifyResult<T = ()> = Result<T, NotifyError>;

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { index, max } => {
                write!(f, "index {index} out of range (max {max})")
            }
            Self::SlotOccupied(slot) => write!(f, "slot {} already holds a driver", slot.0),
            Self::NotRegistered(slot) => write!(f, "no driver registered at slot {}", slot.0),
            Self::NotFound(handle) => write!(f, "unknown subscription handle {handle:?}"),
            Self::UnknownProcessor(index) => write!(f, "unknown processor {index}"),
            Self::RestoreUnderflow(slot) => {
                write!(f, "unmatched restore on slot {} (depth already zero)", slot.0)
            }
            Self::DriversRemain(count) => {
                write!(f, "{count} driver(s) still registered at shutdown")
            }
            Self::Transport(reason) => write!(f, "transport failure: {reason}"),
        }
    }
}
