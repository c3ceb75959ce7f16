#![no_std]

//! # Inter-Processor Notification Core
//!
//! This crate implements the dispatch core of a kernel-resident
//! inter-processor notification subsystem: a general-purpose processor and
//! one or more attached co-processors exchange lightweight event
//! notifications through hardware mailboxes, and this crate multiplexes
//! those events onto registered handlers. It is designed for `no_std`
//! environments and uses the `alloc` crate on the normal-context paths
//! only; the dispatch path never allocates.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────┐
//! │ Transport backend │ Hardware mailbox/interrupt code (one per slot),
//! │ (NotifyDriver)    │ registered at subsystem initialization
//! └────────┬──────────┘
//!          │ notify_event(slot, event, payload)   [interrupt context]
//!          ▼
//! ┌───────────────────┐     ┌────────────────────────────────────┐
//! │      Notify       │────▶│ DriverTable                        │
//! │  (context object) │     │  - slot drivers  (bounded)         │
//! └────────┬──────────┘     │  - disable nesting counters        │
//!          │                │  - per-slot statistics             │
//!          │                └────────────────────────────────────┘
//!          ▼
//! ┌───────────────────┐
//! │ EventRegistry     │ Ordered handlers per (slot, event) key
//! └────────┬──────────┘
//!          │ on_event(slot, event, payload, arg)
//!          ▼
//! ┌───────────────────┐
//! │ EventHandler(s)   │ Subscriber callbacks, invoked synchronously
//! └───────────────────┘     in subscription order
//! ```
//!
//! ## Execution contexts
//!
//! - [`Notify::notify_event`] is entered from restricted
//!   (interrupt-equivalent) context: non-preemptible, no blocking, no
//!   allocation, spin locks only.
//! - Everything else (`register_driver`, `subscribe`, `disable`, …) runs
//!   from normal context and synchronizes against in-flight dispatch
//!   through the same spin locks.
//!
//! ## Enable/disable nesting
//!
//! Each slot carries a nesting counter rather than a boolean: `disable`
//! increments it, `restore` decrements it, and delivery is suppressed
//! whenever it is nonzero, so overlapping critical sections compose.
//! Calls must balance: `restore` at depth zero fails with
//! [`NotifyError::RestoreUnderflow`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use ipc_notify::{Notify, NotifyConfig, ProcSlot, EventId};
//!
//! // Subsystem start: one context, two remote processors.
//! let notify = Notify::new(NotifyConfig::new(2))?;
//! notify.register_driver(ProcSlot(0), Arc::new(MailboxDriver::new(...)))?;
//!
//! // A client subscribes to event 5 from processor 0.
//! let handle = notify.subscribe(ProcSlot(0), EventId(5), handler, 0)?;
//!
//! // The backend's interrupt handler reports an incoming event.
//! let outcome = notify.notify_event(ProcSlot(0), EventId(5), payload)?;
//!
//! // Raise an event on the remote side.
//! notify.send_event(ProcSlot(0), EventId(5), 0xC0FFEE)?;
//!
//! // Subsystem stop.
//! notify.unsubscribe(handle)?;
//! notify.unregister_driver(ProcSlot(0))?;
//! notify.shutdown()?;
//! ```

extern crate alloc;
#[macro_use]
extern crate log;

mod config;
mod dispatch;
mod driver;
mod error;
mod handler;
mod notify;
mod registry;
mod slot;
mod table;

pub use config::NotifyConfig;
pub use dispatch::DispatchOutcome;
pub use driver::NotifyDriver;
pub use error::{NotifyError, NotifyResult};
pub use handler::{EventHandler, HandlerError, HandlerResult};
pub use notify::Notify;
pub use registry::{EntryHandle, EventId, EventRegistry};
pub use slot::{DisableCount, SlotStats, SlotStatsSnapshot};
pub use table::{DriverTable, ProcSlot, MAX_DRIVERS};
