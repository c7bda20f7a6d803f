//! Gateway protocol definitions
//!
//! Op codes, the message envelope, payloads and close codes.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use messages::{FrameError, GatewayMessage, ServerFrame};
pub use opcodes::OpCode;
pub use payloads::{
    Activity, HelloPayload, IdentifyPayload, IdentifyProperties, PresencePayload,
    RequestGuildMembersPayload, ResumePayload, LIBRARY_NAME,
};
