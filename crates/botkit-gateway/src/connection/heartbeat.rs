//! Heartbeat task and reconnect backoff

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{Outbound, SessionState};
use crate::protocol::GatewayMessage;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Spawn the heartbeat loop for one connection
///
/// The first beat goes out after `interval * jitter`, then every `interval`.
/// A tick that finds the previous beat unacknowledged notifies `zombie` and
/// stops. A zero interval is raised to one millisecond.
pub fn spawn_heartbeat(
    state: Arc<SessionState>,
    outbound: mpsc::Sender<Outbound>,
    interval: Duration,
    zombie: Arc<Notify>,
) -> JoinHandle<()> {
    let interval = interval.max(MIN_INTERVAL);
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    let first = Instant::now() + interval.mul_f64(jitter);

    tokio::spawn(async move {
        let mut ticker = interval_at(first, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if state.is_awaiting_ack() {
                tracing::warn!(
                    interval_ms = interval.as_millis(),
                    "Connection zombied (heartbeat not ACKed)"
                );
                zombie.notify_one();
                return;
            }

            let sequence = state.record_heartbeat_sent();
            tracing::trace!(seq = ?sequence, "Sending heartbeat");

            if outbound
                .send(Outbound::Frame(GatewayMessage::heartbeat(sequence)))
                .await
                .is_err()
            {
                tracing::debug!("Writer closed, stopping heartbeat");
                return;
            }
        }
    })
}

/// Exponential backoff with jitter for reconnect attempts
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before `attempt` (0-based) without jitter: `base * 2^attempt`, capped
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(31));
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Delay before `attempt` with +/-20% jitter, never above the cap
    pub fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt);
        let jitter: f64 = rand::thread_rng().gen_range(0.8..1.2);
        ceiling.mul_f64(jitter).min(self.max)
    }
}
