//! Connection-level state: session bookkeeping, heartbeat and backoff

mod heartbeat;
mod session;

pub use heartbeat::{spawn_heartbeat, Backoff};
pub use session::{BotUser, SessionPhase, SessionState};

use crate::protocol::GatewayMessage;

/// Items consumed by the connection's writer task
#[derive(Debug)]
pub enum Outbound {
    Frame(GatewayMessage),
    /// Close the socket with this code
    Close(u16),
}
