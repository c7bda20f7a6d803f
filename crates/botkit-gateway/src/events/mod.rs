//! Gateway events
//!
//! Dispatch event names, the payloads the runtime decodes itself, and the
//! router that hands events to user handlers.

mod event_types;
mod payloads;
mod router;

pub use event_types::GatewayEventType;
pub use payloads::{GuildMemberRemoveEvent, MessageDeleteEvent, PartialApplication, ReadyEvent};
pub use router::{EventHandler, EventRouter, RawObserver};
