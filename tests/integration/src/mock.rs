//! In-process mock of the gateway and control channel

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use botkit_common::BotConfig;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Default wait for anything the client is expected to do
pub const WAIT: Duration = Duration::from_secs(5);

/// First id handed out for created commands
const FIRST_COMMAND_ID: u64 = 1000;

/// REST request received by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Value,
}

enum ServerCommand {
    Send(String),
    Close(u16),
}

#[derive(Clone)]
struct MockState {
    addr: SocketAddr,
    requests: mpsc::UnboundedSender<RecordedRequest>,
    connections: mpsc::UnboundedSender<MockConnection>,
    next_command_id: Arc<AtomicU64>,
}

impl MockState {
    fn record(&self, method: Method, path: String, body: &Bytes) {
        let body = serde_json::from_slice(body).unwrap_or(Value::Null);
        let _ = self.requests.send(RecordedRequest { method, path, body });
    }
}

/// Server side of one websocket connection
pub struct MockConnection {
    to_client: mpsc::UnboundedSender<ServerCommand>,
    from_client: mpsc::UnboundedReceiver<Value>,
}

impl MockConnection {
    /// Send a frame to the client
    pub fn send(&self, frame: &Value) {
        let _ = self.to_client.send(ServerCommand::Send(frame.to_string()));
    }

    /// Send raw text, valid JSON or not
    pub fn send_text(&self, text: &str) {
        let _ = self.to_client.send(ServerCommand::Send(text.to_string()));
    }

    /// Close the socket with a gateway close code
    pub fn close(&self, code: u16) {
        let _ = self.to_client.send(ServerCommand::Close(code));
    }

    /// Next frame from the client
    pub async fn recv(&mut self) -> Result<Value> {
        tokio::time::timeout(WAIT, self.from_client.recv())
            .await
            .context("timed out waiting for a client frame")?
            .ok_or_else(|| anyhow!("client connection closed"))
    }

    /// Next frame with `op`, skipping heartbeats and anything else
    pub async fn recv_op(&mut self, op: u8) -> Result<Value> {
        loop {
            let frame = self.recv().await?;
            if frame["op"] == op {
                return Ok(frame);
            }
        }
    }

    /// Hello followed by the client's Identify
    pub async fn handshake(&mut self) -> Result<Value> {
        self.send(&hello(45_000));
        self.recv_op(2).await
    }
}

/// Mock gateway and REST API bound to a local port
pub struct MockDiscord {
    pub addr: SocketAddr,
    requests: Mutex<mpsc::UnboundedReceiver<RecordedRequest>>,
    connections: Mutex<mpsc::UnboundedReceiver<MockConnection>>,
    _handle: JoinHandle<()>,
}

impl MockDiscord {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (connections_tx, connections_rx) = mpsc::unbounded_channel();
        let state = MockState {
            addr,
            requests: requests_tx,
            connections: connections_tx,
            next_command_id: Arc::new(AtomicU64::new(FIRST_COMMAND_ID)),
        };

        let app = Router::new()
            .route("/gateway", get(gateway_info))
            .route("/ws", get(ws_upgrade))
            .route("/applications/:app/commands", post(create_command))
            .route(
                "/applications/:app/guilds/:guild/commands",
                post(create_command),
            )
            .route("/channels/:channel/messages", post(create_message))
            .fallback(record_any)
            .with_state(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            requests: Mutex::new(requests_rx),
            connections: Mutex::new(connections_rx),
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Bot config pointed at this mock with fast reconnects
    pub fn config(&self) -> BotConfig {
        let mut config = BotConfig::new("mock-token");
        config.api_base_url = self.base_url();
        config.reconnect.base_delay_ms = 10;
        config.reconnect.max_delay_ms = 50;
        config.reconnect.max_attempts = 3;
        config
    }

    /// Wait for the client to open a websocket
    pub async fn next_connection(&self) -> Result<MockConnection> {
        tokio::time::timeout(WAIT, self.connections.lock().await.recv())
            .await
            .context("timed out waiting for a gateway connection")?
            .ok_or_else(|| anyhow!("mock server stopped"))
    }

    /// Next REST request matching `path`, skipping others
    pub async fn request_to(&self, path: &str) -> Result<RecordedRequest> {
        let mut requests = self.requests.lock().await;
        loop {
            let request = tokio::time::timeout(WAIT, requests.recv())
                .await
                .with_context(|| format!("timed out waiting for a request to {path}"))?
                .ok_or_else(|| anyhow!("mock server stopped"))?;
            if request.path == path {
                return Ok(request);
            }
        }
    }

    /// Next request whose path starts with `prefix`
    pub async fn request_starting(&self, prefix: &str) -> Result<RecordedRequest> {
        let mut requests = self.requests.lock().await;
        loop {
            let request = tokio::time::timeout(WAIT, requests.recv())
                .await
                .with_context(|| format!("timed out waiting for a request to {prefix}*"))?
                .ok_or_else(|| anyhow!("mock server stopped"))?;
            if request.path.starts_with(prefix) {
                return Ok(request);
            }
        }
    }
}

async fn gateway_info(State(state): State<MockState>) -> Json<Value> {
    Json(json!({ "url": format!("ws://{}/ws", state.addr) }))
}

async fn create_command(
    State(state): State<MockState>,
    uri: Uri,
    body: Bytes,
) -> Response {
    state.record(Method::POST, uri.path().to_string(), &body);

    let definition: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    if definition["name"] == "broken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": 50035, "message": "Invalid Form Body"})),
        )
            .into_response();
    }

    let id = state.next_command_id.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::CREATED,
        Json(json!({"id": id.to_string(), "name": definition["name"]})),
    )
        .into_response()
}

async fn create_message(
    State(state): State<MockState>,
    Path(channel): Path<String>,
    uri: Uri,
    body: Bytes,
) -> Json<Value> {
    state.record(Method::POST, uri.path().to_string(), &body);
    let content = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|b| b["content"].as_str().map(String::from))
        .unwrap_or_default();
    Json(json!({"id": "9000", "channel_id": channel, "content": content}))
}

/// Interaction callbacks, webhooks and anything else: record and accept
async fn record_any(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> StatusCode {
    state.record(method, uri.path().to_string(), &body);
    StatusCode::NO_CONTENT
}

async fn ws_upgrade(State(state): State<MockState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(socket: WebSocket, state: MockState) {
    let (mut sink, mut stream) = socket.split();
    let (to_client, mut commands) = mpsc::unbounded_channel();
    let (frames, from_client) = mpsc::unbounded_channel();

    if state
        .connections
        .send(MockConnection {
            to_client: to_client.clone(),
            from_client,
        })
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(ServerCommand::Send(text)) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Some(ServerCommand::Close(code)) => {
                    let frame = CloseFrame { code, reason: "".into() };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    break;
                }
                None => break,
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let Ok(frame) = serde_json::from_str::<Value>(&text) else {
                        tracing::warn!("Mock received non-JSON frame");
                        continue;
                    };
                    if frame["op"] == 1 {
                        let _ = to_client.send(ServerCommand::Send(json!({"op": 11}).to_string()));
                    }
                    let _ = frames.send(frame);
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

// === Frame builders ===

pub fn hello(interval_ms: u64) -> Value {
    json!({"op": 10, "d": {"heartbeat_interval": interval_ms}})
}

pub fn dispatch(event: &str, seq: u64, data: Value) -> Value {
    json!({"op": 0, "t": event, "s": seq, "d": data})
}

/// READY for application 5 whose resume url points back at `ws_url`
pub fn ready(seq: u64, session_id: &str, ws_url: &str) -> Value {
    dispatch(
        "READY",
        seq,
        json!({
            "v": 10,
            "user": {"id": "1", "username": "botkit", "bot": true},
            "session_id": session_id,
            "resume_gateway_url": ws_url,
            "application": {"id": "5", "flags": 0},
            "guilds": [{"id": "50", "unavailable": true}]
        }),
    )
}
