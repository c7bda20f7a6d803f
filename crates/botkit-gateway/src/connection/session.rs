//! Session state
//!
//! Written by the read loop; the heartbeat task only touches the heartbeat
//! bookkeeping. Everyone else reads through `snapshot()`.

use std::time::Duration;

use botkit_core::{Snowflake, User};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::Outbound;
use crate::error::{GatewayError, GatewayResult};
use crate::events::ReadyEvent;
use crate::protocol::{GatewayMessage, ResumePayload};

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    #[default]
    Connecting,
    AwaitingHello,
    Identifying,
    SteadyState,
    Resuming,
    Reconnecting,
}

/// Read-only view of the session handed to user callbacks
#[derive(Debug, Clone, Default)]
pub struct BotUser {
    /// The bot account, known after READY
    pub user: Option<User>,
    pub application_id: Option<Snowflake>,
    pub session_id: Option<String>,
    /// Round trip of the most recent acknowledged heartbeat
    pub latency: Option<Duration>,
    pub sequence: Option<u64>,
    pub phase: SessionPhase,
    pub bootstrapped: bool,
    /// Raised while a member chunk is merged into the cache on the read
    /// loop. Informational; member chunks themselves are never routed.
    pub suppress_dispatch: bool,
}

impl BotUser {
    /// Bot user id, or zero before READY
    pub fn id(&self) -> Snowflake {
        self.user.as_ref().map(|u| u.id).unwrap_or_default()
    }

    /// Latency in whole milliseconds
    pub fn latency_ms(&self) -> Option<u128> {
        self.latency.map(|l| l.as_millis())
    }
}

#[derive(Debug, Default)]
struct Inner {
    sequence: Option<u64>,
    session_id: Option<String>,
    resume_url: Option<String>,
    heartbeat_interval: Option<Duration>,
    last_heartbeat_sent: Option<Instant>,
    last_heartbeat_ack: Option<Instant>,
    awaiting_ack: bool,
    latency: Option<Duration>,
    phase: SessionPhase,
    bootstrapped: bool,
    suppress_dispatch: bool,
    commands_flushed: bool,
    user: Option<User>,
    application_id: Option<Snowflake>,
}

/// Shared session state for one gateway session
#[derive(Debug, Default)]
pub struct SessionState {
    inner: RwLock<Inner>,
    /// Writer channel of the live connection
    outbound: Mutex<Option<mpsc::Sender<Outbound>>>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of the fields callbacks may read
    pub fn snapshot(&self) -> BotUser {
        let inner = self.inner.read();
        BotUser {
            user: inner.user.clone(),
            application_id: inner.application_id,
            session_id: inner.session_id.clone(),
            latency: inner.latency,
            sequence: inner.sequence,
            phase: inner.phase,
            bootstrapped: inner.bootstrapped,
            suppress_dispatch: inner.suppress_dispatch,
        }
    }

    // === Sequence ===

    /// Last fully processed sequence number
    pub fn sequence(&self) -> Option<u64> {
        self.inner.read().sequence
    }

    /// Commit the sequence of a processed frame; never moves backwards
    pub fn commit_sequence(&self, sequence: u64) {
        let mut inner = self.inner.write();
        if inner.sequence.is_none_or(|current| sequence > current) {
            inner.sequence = Some(sequence);
        }
    }

    // === Heartbeat ===

    pub fn set_heartbeat_interval(&self, interval: Duration) {
        let mut inner = self.inner.write();
        inner.heartbeat_interval = Some(interval);
        inner.awaiting_ack = false;
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.inner.read().heartbeat_interval
    }

    /// Whether the previous heartbeat is still unacknowledged
    pub fn is_awaiting_ack(&self) -> bool {
        self.inner.read().awaiting_ack
    }

    /// Record that a heartbeat left; returns the sequence it must carry
    pub fn record_heartbeat_sent(&self) -> Option<u64> {
        let mut inner = self.inner.write();
        inner.last_heartbeat_sent = Some(Instant::now());
        inner.awaiting_ack = true;
        inner.sequence
    }

    /// Record an ACK and derive latency from the last send time
    pub fn record_heartbeat_ack(&self) -> Option<Duration> {
        let now = Instant::now();
        let mut inner = self.inner.write();
        inner.last_heartbeat_ack = Some(now);
        inner.awaiting_ack = false;
        if let Some(sent) = inner.last_heartbeat_sent {
            inner.latency = Some(now.saturating_duration_since(sent));
        }
        inner.latency
    }

    pub fn last_heartbeat_ack(&self) -> Option<Instant> {
        self.inner.read().last_heartbeat_ack
    }

    pub fn latency(&self) -> Option<Duration> {
        self.inner.read().latency
    }

    // === Lifecycle ===

    pub fn phase(&self) -> SessionPhase {
        self.inner.read().phase
    }

    pub fn set_phase(&self, phase: SessionPhase) {
        self.inner.write().phase = phase;
    }

    /// Store READY data; returns true only for the first READY of the process
    pub fn apply_ready(&self, ready: &ReadyEvent) -> bool {
        let mut inner = self.inner.write();
        inner.session_id = Some(ready.session_id.clone());
        inner.resume_url = ready.resume_gateway_url.clone();
        inner.user = Some(ready.user.clone());
        inner.application_id = Some(ready.application.id);
        inner.bootstrapped = true;
        inner.phase = SessionPhase::SteadyState;
        !std::mem::replace(&mut inner.commands_flushed, true)
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.inner.read().bootstrapped
    }

    pub fn application_id(&self) -> Option<Snowflake> {
        self.inner.read().application_id
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.read().session_id.clone()
    }

    pub fn resume_url(&self) -> Option<String> {
        self.inner.read().resume_url.clone()
    }

    /// Forget the session so the next handshake identifies from scratch
    pub fn clear_session(&self) {
        let mut inner = self.inner.write();
        inner.session_id = None;
        inner.resume_url = None;
        inner.sequence = None;
    }

    /// Resume payload, if a session is held
    pub fn resume_payload(&self, token: &str) -> Option<ResumePayload> {
        let inner = self.inner.read();
        inner.session_id.as_ref().map(|session_id| ResumePayload {
            token: token.to_string(),
            session_id: session_id.clone(),
            seq: inner.sequence,
        })
    }

    pub fn set_suppress_dispatch(&self, suppress: bool) {
        self.inner.write().suppress_dispatch = suppress;
    }

    pub fn is_dispatch_suppressed(&self) -> bool {
        self.inner.read().suppress_dispatch
    }

    // === Outbound ===

    pub(crate) fn attach(&self, sender: mpsc::Sender<Outbound>) {
        *self.outbound.lock() = Some(sender);
    }

    pub(crate) fn detach(&self) {
        *self.outbound.lock() = None;
    }

    /// Queue a frame on the live connection
    pub async fn send(&self, message: GatewayMessage) -> GatewayResult<()> {
        let sender = self.outbound.lock().clone();
        match sender {
            Some(sender) => sender
                .send(Outbound::Frame(message))
                .await
                .map_err(|_| GatewayError::ChannelClosed),
            None => Err(GatewayError::ChannelClosed),
        }
    }
}
