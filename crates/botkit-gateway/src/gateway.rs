//! Gateway session
//!
//! Owns the websocket for the lifetime of the session. The read loop is the
//! only writer of session state apart from heartbeat bookkeeping; outbound
//! frames go through a writer task fed by an mpsc channel.

use std::sync::Arc;
use std::time::Duration;

use botkit_common::BotConfig;
use botkit_core::{Guild, GuildMembersChunk, Snowflake, UnavailableGuild};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::cache::GuildCache;
use crate::commands::CommandRegistry;
use crate::connection::{spawn_heartbeat, Backoff, Outbound, SessionPhase, SessionState};
use crate::error::{GatewayError, GatewayResult};
use crate::events::{EventRouter, GatewayEventType, ReadyEvent};
use crate::interactions::InteractionDispatcher;
use crate::protocol::{
    CloseCode, GatewayMessage, IdentifyPayload, IdentifyProperties, PresencePayload,
    RequestGuildMembersPayload, ServerFrame,
};
use crate::rest::{routes, RestRequest, Transport};

/// Channel buffer size for outgoing frames
const OUTBOUND_BUFFER: usize = 100;

/// How long the writer may take to flush a close frame
const WRITER_DRAIN: Duration = Duration::from_secs(2);

/// Close code sent when dropping a zombied connection
const ZOMBIE_CLOSE_CODE: u16 = 4000;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Deserialize)]
struct GatewayInfo {
    url: String,
}

/// Per-connection handles
struct Connection {
    outbound: mpsc::Sender<Outbound>,
    zombie: Arc<Notify>,
    heartbeat: Option<JoinHandle<()>>,
    reached_steady: bool,
}

impl Connection {
    fn new(outbound: mpsc::Sender<Outbound>) -> Self {
        Self {
            outbound,
            zombie: Arc::new(Notify::new()),
            heartbeat: None,
            reached_steady: false,
        }
    }

    async fn send(&self, message: GatewayMessage) {
        if self.outbound.send(Outbound::Frame(message)).await.is_err() {
            tracing::debug!("Writer closed, dropping outbound frame");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
    }
}

/// How one connection ended
#[derive(Debug, Default)]
struct DriveOutcome {
    /// Close code sent by the server, if it sent one
    close: Option<u16>,
    reached_steady: bool,
}

/// Gateway session state machine
pub struct GatewaySession {
    config: BotConfig,
    transport: Arc<dyn Transport>,
    state: Arc<SessionState>,
    router: Arc<EventRouter>,
    dispatcher: Arc<InteractionDispatcher>,
    commands: Arc<CommandRegistry>,
    cache: Arc<GuildCache>,
}

impl GatewaySession {
    #[must_use]
    pub fn new(
        config: BotConfig,
        transport: Arc<dyn Transport>,
        state: Arc<SessionState>,
        router: Arc<EventRouter>,
        dispatcher: Arc<InteractionDispatcher>,
        commands: Arc<CommandRegistry>,
        cache: Arc<GuildCache>,
    ) -> Self {
        Self {
            config,
            transport,
            state,
            router,
            dispatcher,
            commands,
            cache,
        }
    }

    /// Run until the session ends
    ///
    /// Discovery and the first dial are fatal. Later disconnects reconnect
    /// with backoff and resume when a session is held.
    pub async fn run(&self) -> GatewayResult<()> {
        self.state.set_phase(SessionPhase::Connecting);
        let base = self.discover().await?;
        let url = gateway_url(&base, self.config.gateway_version);

        let reconnect = &self.config.reconnect;
        let backoff = Backoff::new(
            Duration::from_millis(reconnect.base_delay_ms),
            Duration::from_millis(reconnect.max_delay_ms),
        );

        let mut socket = Some(self.dial(&url).await?);
        let mut attempt: u32 = 0;

        loop {
            let ws = match socket.take() {
                Some(ws) => ws,
                None => {
                    if attempt >= reconnect.max_attempts {
                        tracing::error!(attempts = attempt, "Giving up reconnecting");
                        return Err(GatewayError::ReconnectExhausted { attempts: attempt });
                    }
                    let delay = backoff.delay(attempt);
                    attempt += 1;
                    tracing::info!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        "Reconnecting to gateway"
                    );
                    tokio::time::sleep(delay).await;

                    let target = self
                        .state
                        .resume_url()
                        .map_or_else(|| url.clone(), |resume| {
                            gateway_url(&resume, self.config.gateway_version)
                        });
                    match self.dial(&target).await {
                        Ok(ws) => ws,
                        Err(e) => {
                            tracing::warn!(error = %e, "Reconnect attempt failed");
                            continue;
                        }
                    }
                }
            };

            let outcome = self.drive(ws).await;
            if outcome.reached_steady {
                attempt = 0;
            }

            if let Some(code) = outcome.close {
                match CloseCode::from_u16(code) {
                    Some(close) if !close.should_reconnect() => {
                        tracing::error!(
                            code,
                            reason = close.description(),
                            "Gateway closed the session"
                        );
                        return Err(GatewayError::Closed(close));
                    }
                    Some(close) if close.invalidates_session() => {
                        tracing::warn!(code, reason = close.description(), "Session invalidated");
                        self.state.clear_session();
                    }
                    Some(close) => {
                        tracing::info!(code, reason = close.description(), "Gateway closed");
                    }
                    None => tracing::info!(code, "Gateway connection closed"),
                }
            } else {
                tracing::warn!("Gateway connection dropped");
            }

            self.state.set_phase(SessionPhase::Reconnecting);
        }
    }

    async fn discover(&self) -> GatewayResult<String> {
        let response = self
            .transport
            .execute(RestRequest::get(routes::GATEWAY))
            .await
            .map_err(|e| GatewayError::Discovery(e.to_string()))?;

        if !response.is_success() {
            return Err(GatewayError::Discovery(format!(
                "status {}: {}",
                response.status,
                response.error_message()
            )));
        }

        let info: GatewayInfo = response
            .json()
            .map_err(|e| GatewayError::Discovery(e.to_string()))?;
        tracing::debug!(url = %info.url, "Discovered gateway endpoint");
        Ok(info.url)
    }

    async fn dial(&self, url: &str) -> GatewayResult<WsStream> {
        tracing::info!(url = %url, "Connecting to gateway");
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| GatewayError::Connect {
                url: url.to_string(),
                source: Box::new(e),
            })?;
        Ok(ws)
    }

    /// Drive one websocket until it closes, fails or zombies
    async fn drive(&self, ws: WsStream) -> DriveOutcome {
        let (mut sink, mut stream) = ws.split();
        let (tx, mut rx) = mpsc::channel::<Outbound>(OUTBOUND_BUFFER);

        let mut writer = tokio::spawn(async move {
            while let Some(item) = rx.recv().await {
                let result = match item {
                    Outbound::Frame(message) => match message.to_json() {
                        Ok(json) => sink.send(Message::Text(json.into())).await,
                        Err(e) => {
                            tracing::warn!(error = %e, op = %message.op, "Failed to encode frame");
                            continue;
                        }
                    },
                    Outbound::Close(code) => {
                        let frame = CloseFrame {
                            code: WsCloseCode::from(code),
                            reason: "".into(),
                        };
                        let _ = sink.send(Message::Close(Some(frame))).await;
                        break;
                    }
                };
                if let Err(e) = result {
                    tracing::debug!(error = %e, "Gateway write failed");
                    break;
                }
            }
        });

        self.state.attach(tx.clone());
        self.state.set_phase(SessionPhase::AwaitingHello);

        let mut conn = Connection::new(tx);
        let mut outcome = DriveOutcome::default();

        loop {
            let zombie = conn.zombie.clone();
            tokio::select! {
                () = zombie.notified() => {
                    let _ = conn.outbound.send(Outbound::Close(ZOMBIE_CLOSE_CODE)).await;
                    break;
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        self.handle_text(text.as_str(), &mut conn).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        outcome.close = frame.map(|f| u16::from(f.code));
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::warn!("Ignoring binary gateway frame");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Gateway read failed");
                        break;
                    }
                    None => break,
                },
            }
        }

        outcome.reached_steady = conn.reached_steady;
        self.state.detach();
        drop(conn);

        if tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
            writer.abort();
        }
        outcome
    }

    async fn handle_text(&self, text: &str, conn: &mut Connection) {
        let message = match GatewayMessage::from_json(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed gateway frame");
                return;
            }
        };

        self.router.observe_raw(&message, self.state.snapshot());

        let frame = match message.into_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping gateway frame");
                return;
            }
        };

        match frame {
            ServerFrame::Hello(interval_ms) => {
                let interval = Duration::from_millis(interval_ms);
                tracing::info!(heartbeat_interval_ms = interval_ms, "Received Hello");
                self.state.set_heartbeat_interval(interval);

                let heartbeat = spawn_heartbeat(
                    self.state.clone(),
                    conn.outbound.clone(),
                    interval,
                    conn.zombie.clone(),
                );
                if let Some(previous) = conn.heartbeat.replace(heartbeat) {
                    previous.abort();
                }
                self.handshake(conn).await;
            }
            ServerFrame::HeartbeatAck => {
                if let Some(latency) = self.state.record_heartbeat_ack() {
                    tracing::trace!(latency_ms = latency.as_millis(), "Heartbeat ACK");
                }
            }
            ServerFrame::HeartbeatRequest => {
                let sequence = self.state.record_heartbeat_sent();
                conn.send(GatewayMessage::heartbeat(sequence)).await;
            }
            ServerFrame::Reconnect => {
                tracing::info!("Server requested reconnect");
                self.handshake(conn).await;
            }
            ServerFrame::InvalidSession { resumable } => {
                tracing::warn!(resumable, "Session invalidated by server");
                if !resumable {
                    self.state.clear_session();
                }
                self.handshake(conn).await;
            }
            ServerFrame::Dispatch {
                event,
                sequence,
                data,
            } => {
                self.handle_dispatch(&event, data, conn).await;
                if let Some(sequence) = sequence {
                    self.state.commit_sequence(sequence);
                }
            }
        }
    }

    /// Resume when a session is held, identify otherwise
    async fn handshake(&self, conn: &Connection) {
        let message = match self.state.resume_payload(&self.config.token) {
            Some(payload) => {
                tracing::info!(
                    session_id = %payload.session_id,
                    seq = ?payload.seq,
                    "Resuming session"
                );
                self.state.set_phase(SessionPhase::Resuming);
                GatewayMessage::resume(&payload)
            }
            None => {
                tracing::info!(intents = self.config.intents, "Identifying");
                self.state.set_phase(SessionPhase::Identifying);
                GatewayMessage::identify(&self.identify_payload())
            }
        };

        match message {
            Ok(message) => conn.send(message).await,
            Err(e) => tracing::error!(error = %e, "Failed to encode handshake"),
        }
    }

    fn identify_payload(&self) -> IdentifyPayload {
        let presence = PresencePayload::from(&self.config.presence);
        let presence = if presence.is_valid_status() {
            Some(presence)
        } else {
            tracing::warn!(status = %presence.status, "Ignoring invalid presence status");
            None
        };

        IdentifyPayload {
            token: self.config.token.clone(),
            intents: self.config.intents(),
            properties: IdentifyProperties::new(self.config.presence.on_mobile),
            presence,
        }
    }

    async fn handle_dispatch(&self, event: &str, data: Value, conn: &mut Connection) {
        match GatewayEventType::from_str(event) {
            Some(GatewayEventType::Ready) => {
                let ready: ReadyEvent = match serde_json::from_value(data.clone()) {
                    Ok(ready) => ready,
                    Err(e) => {
                        tracing::warn!(error = %e, "Malformed READY payload");
                        return;
                    }
                };
                let first = self.state.apply_ready(&ready);
                conn.reached_steady = true;
                tracing::info!(
                    session_id = %ready.session_id,
                    user = %ready.user.tag(),
                    guilds = ready.guilds.len(),
                    "Session ready"
                );
                if first {
                    self.flush_commands(ready.application.id);
                }
                self.route_event(event, data);
            }
            Some(GatewayEventType::Resumed) => {
                self.state.set_phase(SessionPhase::SteadyState);
                conn.reached_steady = true;
                tracing::info!(seq = ?self.state.sequence(), "Session resumed");
                self.route_event(event, data);
            }
            Some(GatewayEventType::GuildCreate) => {
                match serde_json::from_value::<Guild>(data.clone()) {
                    Ok(guild) => {
                        let guild_id = guild.id;
                        self.cache.insert(guild);
                        if self.config.memoize_guilds {
                            self.request_members(guild_id, conn).await;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Malformed GUILD_CREATE payload"),
                }
                self.route_event(event, data);
            }
            Some(GatewayEventType::GuildDelete) => {
                if let Ok(guild) = serde_json::from_value::<UnavailableGuild>(data.clone()) {
                    self.cache.remove(guild.id);
                }
                self.route_event(event, data);
            }
            Some(GatewayEventType::GuildMembersChunk) => {
                match serde_json::from_value::<GuildMembersChunk>(data) {
                    Ok(chunk) => {
                        self.state.set_suppress_dispatch(true);
                        let merged = self.cache.merge_members(chunk.guild_id, chunk.members);
                        self.state.set_suppress_dispatch(false);
                        tracing::debug!(
                            guild_id = %chunk.guild_id,
                            chunk = chunk.chunk_index,
                            of = chunk.chunk_count,
                            merged,
                            "Merged member chunk"
                        );
                    }
                    Err(e) => tracing::warn!(error = %e, "Malformed GUILD_MEMBERS_CHUNK payload"),
                }
            }
            Some(GatewayEventType::InteractionCreate) => {
                self.dispatcher.route(data, self.state.snapshot());
            }
            _ => self.route_event(event, data),
        }
    }

    fn route_event(&self, event: &str, data: Value) {
        if self.state.is_dispatch_suppressed() {
            return;
        }
        self.router.dispatch(event, data, self.state.snapshot());
    }

    fn flush_commands(&self, application_id: Snowflake) {
        // Registration tasks run detached; each logs its own outcome
        drop(self.commands.flush(&self.transport, application_id));
    }

    async fn request_members(&self, guild_id: Snowflake, conn: &Connection) {
        match GatewayMessage::request_guild_members(&RequestGuildMembersPayload::all(guild_id)) {
            Ok(message) => conn.send(message).await,
            Err(e) => tracing::error!(error = %e, "Failed to encode member request"),
        }
    }
}

impl std::fmt::Debug for GatewaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySession")
            .field("config", &self.config)
            .field("phase", &self.state.phase())
            .finish_non_exhaustive()
    }
}

/// Append the version and encoding query to a gateway url
fn gateway_url(base: &str, version: u8) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}v={version}&encoding=json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::ComponentRegistry;
    use crate::commands::PendingCommand;
    use crate::connection::BotUser;
    use crate::protocol::OpCode;
    use crate::rest::recording::RecordingTransport;
    use crate::rest::RestResponse;
    use botkit_core::ApplicationCommand;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        session: GatewaySession,
        state: Arc<SessionState>,
        router: Arc<EventRouter>,
        commands: Arc<CommandRegistry>,
        cache: Arc<GuildCache>,
        recording: Arc<RecordingTransport>,
        conn: Connection,
        rx: mpsc::Receiver<Outbound>,
    }

    fn harness(memoize: bool) -> Harness {
        let mut config = BotConfig::new("secret-token");
        config.memoize_guilds = memoize;

        let recording = Arc::new(RecordingTransport::with_responder(|request| {
            if request.path.ends_with("/commands") {
                RestResponse {
                    status: 201,
                    body: r#"{"id":"77"}"#.to_string(),
                }
            } else {
                RestResponse {
                    status: 200,
                    body: r#"{"url":"wss://gateway.example"}"#.to_string(),
                }
            }
        }));
        let transport: Arc<dyn Transport> = recording.clone();
        let state = Arc::new(SessionState::new());
        let router = Arc::new(EventRouter::new());
        let commands = Arc::new(CommandRegistry::new());
        let cache = Arc::new(GuildCache::new());
        let dispatcher = Arc::new(InteractionDispatcher::new(
            transport.clone(),
            commands.clone(),
            ComponentRegistry::new(state.clone()),
        ));
        let session = GatewaySession::new(
            config,
            transport,
            state.clone(),
            router.clone(),
            dispatcher,
            commands.clone(),
            cache.clone(),
        );
        let (tx, rx) = mpsc::channel(16);
        Harness {
            session,
            state,
            router,
            commands,
            cache,
            recording,
            conn: Connection::new(tx),
            rx,
        }
    }

    impl Harness {
        async fn feed(&mut self, frame: Value) {
            self.session.handle_text(&frame.to_string(), &mut self.conn).await;
        }

        fn sent(&mut self) -> Vec<GatewayMessage> {
            let mut sent = Vec::new();
            while let Ok(item) = self.rx.try_recv() {
                if let Outbound::Frame(message) = item {
                    sent.push(message);
                }
            }
            sent
        }
    }

    fn ready(seq: u64) -> Value {
        json!({
            "op": 0,
            "t": "READY",
            "s": seq,
            "d": {
                "v": 10,
                "user": {"id": "1", "username": "bot", "bot": true},
                "session_id": "session-1",
                "resume_gateway_url": "wss://resume.example",
                "application": {"id": "5"},
                "guilds": []
            }
        })
    }

    #[test]
    fn test_gateway_url() {
        assert_eq!(
            gateway_url("wss://gateway.example", 10),
            "wss://gateway.example?v=10&encoding=json"
        );
        assert_eq!(
            gateway_url("wss://gateway.example/?compress=false", 10),
            "wss://gateway.example/?compress=false&v=10&encoding=json"
        );
    }

    #[tokio::test]
    async fn test_discover_reads_url() {
        let h = harness(false);
        assert_eq!(h.session.discover().await.unwrap(), "wss://gateway.example");
        assert_eq!(h.recording.last().unwrap().path, "/gateway");
    }

    #[tokio::test]
    async fn test_discover_failure_is_fatal() {
        let mut h = harness(false);
        let transport: Arc<dyn Transport> =
            Arc::new(RecordingTransport::with_responder(|_| RestResponse {
                status: 401,
                body: r#"{"message":"401: Unauthorized"}"#.to_string(),
            }));
        h.session.transport = transport;
        let err = h.session.run().await.unwrap_err();
        assert!(matches!(err, GatewayError::Discovery(ref m) if m.contains("Unauthorized")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hello_then_identify() {
        let mut h = harness(false);
        h.feed(json!({"op": 10, "d": {"heartbeat_interval": 41250}})).await;

        let sent = h.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].op, OpCode::Identify);
        let d = sent[0].d.as_ref().unwrap();
        assert_eq!(d["token"], "secret-token");
        assert_eq!(d["properties"]["browser"], "botkit");
        assert_eq!(d["presence"]["status"], "online");
        assert_eq!(h.state.phase(), SessionPhase::Identifying);
        assert_eq!(h.state.heartbeat_interval(), Some(Duration::from_millis(41250)));
        assert!(h.conn.heartbeat.is_some());
    }

    #[tokio::test]
    async fn test_ready_flushes_commands_once_and_commits_sequence() {
        let mut h = harness(false);
        h.commands.enqueue([PendingCommand::new(
            ApplicationCommand::slash("ping", "Ping"),
            |_ctx| async { Ok(()) },
        )]);

        let readies = Arc::new(AtomicUsize::new(0));
        let r = readies.clone();
        h.router.on("READY", move |_bot, _ready: ReadyEvent| {
            let r = r.clone();
            async move {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        h.feed(ready(1)).await;
        assert_eq!(h.state.sequence(), Some(1));
        assert_eq!(h.state.phase(), SessionPhase::SteadyState);
        assert!(h.conn.reached_steady);
        assert_eq!(h.commands.pending_len(), 0);

        // Second READY after an invalidated session does not re-register
        h.commands.enqueue([PendingCommand::new(
            ApplicationCommand::slash("late", "Late"),
            |_ctx| async { Ok(()) },
        )]);
        h.feed(ready(2)).await;
        assert_eq!(h.commands.pending_len(), 1);

        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(readies.load(Ordering::SeqCst), 2);
        assert!(h.commands.handler(Snowflake::new(77)).is_some());
        let registrations = h
            .recording
            .requests()
            .into_iter()
            .filter(|r| r.path == "/applications/5/commands")
            .count();
        assert_eq!(registrations, 1);
    }

    #[tokio::test]
    async fn test_reconnect_request_resumes_with_committed_sequence() {
        let mut h = harness(false);
        h.feed(ready(1)).await;
        h.feed(json!({"op": 0, "t": "MESSAGE_CREATE", "s": 2, "d": {"id": "9", "channel_id": "3"}}))
            .await;
        h.sent();

        h.feed(json!({"op": 7, "d": null})).await;
        let sent = h.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].op, OpCode::Resume);
        let d = sent[0].d.as_ref().unwrap();
        assert_eq!(d["session_id"], "session-1");
        assert_eq!(d["seq"], 2);
        assert_eq!(h.state.phase(), SessionPhase::Resuming);

        h.feed(json!({"op": 0, "t": "RESUMED", "s": 3, "d": {}})).await;
        assert_eq!(h.state.phase(), SessionPhase::SteadyState);
        assert_eq!(h.state.sequence(), Some(3));
    }

    #[tokio::test]
    async fn test_invalid_session_reidentifies() {
        let mut h = harness(false);
        h.feed(ready(4)).await;
        h.sent();

        h.feed(json!({"op": 9, "d": false})).await;
        let sent = h.sent();
        assert_eq!(sent[0].op, OpCode::Identify);
        assert_eq!(h.state.sequence(), None);
        assert!(h.state.session_id().is_none());
        assert!(h.state.is_bootstrapped());
    }

    #[tokio::test]
    async fn test_resumable_invalid_session_resumes() {
        let mut h = harness(false);
        h.feed(ready(4)).await;
        h.sent();

        h.feed(json!({"op": 9, "d": true})).await;
        assert_eq!(h.sent()[0].op, OpCode::Resume);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_ack_and_server_request() {
        let mut h = harness(false);
        h.feed(ready(8)).await;

        h.feed(json!({"op": 1, "d": null})).await;
        let sent = h.sent();
        assert_eq!(sent[0].op, OpCode::Heartbeat);
        assert_eq!(sent[0].d, Some(json!(8)));

        tokio::time::advance(Duration::from_millis(40)).await;
        h.feed(json!({"op": 11})).await;
        assert_eq!(h.state.latency(), Some(Duration::from_millis(40)));
    }

    #[tokio::test]
    async fn test_guild_create_caches_and_memoizes() {
        let mut h = harness(true);
        h.feed(json!({
            "op": 0, "t": "GUILD_CREATE", "s": 1,
            "d": {"id": "50", "name": "Guild", "owner_id": "1"}
        }))
        .await;

        assert!(h.cache.get(Snowflake::new(50)).is_some());
        let sent = h.sent();
        assert_eq!(sent[0].op, OpCode::RequestGuildMembers);
        let d = sent[0].d.as_ref().unwrap();
        assert_eq!(d["guild_id"], "50");
        assert_eq!(d["query"], "");
        assert_eq!(d["limit"], 0);

        h.feed(json!({
            "op": 0, "t": "GUILD_MEMBERS_CHUNK", "s": 2,
            "d": {
                "guild_id": "50",
                "members": [{"user": {"id": "7", "username": "ada"}}],
                "chunk_index": 0,
                "chunk_count": 1
            }
        }))
        .await;
        let guild = h.cache.get(Snowflake::new(50)).unwrap();
        assert!(guild.member(Snowflake::new(7)).is_some());
        assert!(!h.state.is_dispatch_suppressed());
        assert_eq!(h.state.sequence(), Some(2));

        h.feed(json!({"op": 0, "t": "GUILD_DELETE", "s": 3, "d": {"id": "50"}})).await;
        assert!(h.cache.is_empty());
    }

    #[tokio::test]
    async fn test_member_chunk_is_merged_not_routed() {
        let mut h = harness(false);
        let hits = Arc::new(AtomicUsize::new(0));
        let c = hits.clone();
        h.router.on("GUILD_MEMBERS_CHUNK", move |bot: BotUser, _v: Value| {
            let c = c.clone();
            async move {
                assert!(!bot.suppress_dispatch);
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        h.feed(json!({
            "op": 0, "t": "GUILD_MEMBERS_CHUNK", "s": 1,
            "d": {"guild_id": "60", "members": [], "chunk_index": 0, "chunk_count": 1}
        }))
        .await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(!h.state.snapshot().suppress_dispatch);
        assert_eq!(h.state.sequence(), Some(1));
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped() {
        let mut h = harness(false);
        h.session.handle_text("not json", &mut h.conn).await;
        h.feed(json!({"op": 0, "s": 5, "d": {}})).await;
        h.feed(json!({"op": 2, "d": {}})).await;
        assert_eq!(h.state.sequence(), None);
        assert!(h.sent().is_empty());
    }

    #[tokio::test]
    async fn test_zero_interval_hello_is_dropped() {
        let mut h = harness(false);
        h.feed(json!({"op": 10, "d": {"heartbeat_interval": 0}})).await;
        assert!(h.conn.heartbeat.is_none());
        assert!(h.sent().is_empty());
    }

    #[tokio::test]
    async fn test_raw_observer_sees_every_frame() {
        let mut h = harness(false);
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        h.router.set_raw_observer(move |_bot, _message| {
            let s = s.clone();
            async move {
                s.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        h.feed(json!({"op": 11})).await;
        h.feed(json!({"op": 0, "t": "TYPING_START", "s": 1, "d": {}})).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
