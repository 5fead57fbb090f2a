//! Typed event variant set and pub/sub event bus (§4.1, §6).
//!
//! The bus is the sole channel of communication between the executor, the
//! context builder, the checkpointer, an external dashboard, and the
//! human-input coordinator. There is no global singleton — callers obtain
//! an [`EventBus`] per run and pass it by injection (§9).

pub mod bus;
pub mod event;

pub use bus::{BusError, EventBus, StreamGuard, SubscriptionId};
pub use event::{Event, EventKind};
