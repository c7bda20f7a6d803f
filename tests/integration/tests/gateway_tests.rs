//! Gateway Integration Tests
//!
//! Each test runs a bot against an in-process `MockDiscord` serving the
//! discovery endpoint, the websocket gateway and the REST routes.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::collections::HashSet;
use std::time::Duration;

use botkit_core::{ApplicationCommand, Guild, Message, Snowflake};
use botkit_gateway::protocol::CloseCode;
use botkit_gateway::{
    ActionRow, Bot, Button, ButtonStyle, GatewayError, GatewayResult, MessageBody, ReadyEvent,
    SessionPhase, View,
};
use integration_tests::{dispatch, ready, MockDiscord, WAIT};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

fn spawn_bot(bot: &Bot) -> JoinHandle<GatewayResult<()>> {
    let bot = bot.clone();
    tokio::spawn(async move { bot.run().await })
}

/// Poll `check` until it holds or the default wait elapses
async fn eventually(check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for handler")
        .expect("handler channel closed")
}

fn ping_command() -> ApplicationCommand {
    ApplicationCommand::slash("ping", "Ping")
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[tokio::test]
async fn test_identify_ready_and_command_registration() {
    let mock = MockDiscord::start().await.unwrap();
    let bot = Bot::new(mock.config()).unwrap();

    let (tx, mut ready_rx) = mpsc::unbounded_channel();
    bot.on_ready(move |_bot, ready: ReadyEvent| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(ready.session_id);
            Ok(())
        }
    });
    bot.add_command(ping_command(), |_ctx| async { Ok(()) });

    let runner = spawn_bot(&bot);
    let mut conn = mock.next_connection().await.unwrap();

    let identify = conn.handshake().await.unwrap();
    assert_eq!(identify["d"]["token"], "mock-token");
    assert_eq!(identify["d"]["intents"], 4609);
    assert_eq!(identify["d"]["properties"]["browser"], "botkit");

    conn.send(&ready(1, "session-a", &mock.ws_url()));

    let registration = mock.request_to("/applications/5/commands").await.unwrap();
    assert_eq!(registration.body["name"], "ping");
    assert_eq!(recv(&mut ready_rx).await, "session-a");

    let snapshot = bot.snapshot();
    assert!(snapshot.bootstrapped);
    assert_eq!(snapshot.application_id, Some(Snowflake::new(5)));
    assert_eq!(snapshot.sequence, Some(1));

    runner.abort();
}

#[tokio::test]
async fn test_failed_registration_does_not_block_others() {
    let mock = MockDiscord::start().await.unwrap();
    let bot = Bot::new(mock.config()).unwrap();
    bot.add_command(ApplicationCommand::slash("broken", "Rejected"), |_ctx| async {
        Ok(())
    });
    bot.add_command(ping_command(), |_ctx| async { Ok(()) });

    let runner = spawn_bot(&bot);
    let mut conn = mock.next_connection().await.unwrap();
    conn.handshake().await.unwrap();
    conn.send(&ready(1, "session-a", &mock.ws_url()));

    let mut names = HashSet::new();
    for _ in 0..2 {
        let request = mock.request_starting("/applications/5/").await.unwrap();
        names.insert(request.body["name"].as_str().unwrap().to_string());
    }
    assert_eq!(names, HashSet::from(["broken".to_string(), "ping".to_string()]));

    // The session keeps running
    conn.send(&dispatch("TYPING_START", 2, json!({})));
    assert!(eventually(|| bot.snapshot().sequence == Some(2)).await);
    assert!(!runner.is_finished());

    runner.abort();
}

#[tokio::test]
async fn test_commands_register_only_on_first_ready() {
    let mock = MockDiscord::start().await.unwrap();
    let bot = Bot::new(mock.config()).unwrap();
    bot.add_command(ping_command(), |_ctx| async { Ok(()) });

    let runner = spawn_bot(&bot);
    let mut conn = mock.next_connection().await.unwrap();
    conn.handshake().await.unwrap();
    conn.send(&ready(1, "session-a", &mock.ws_url()));
    mock.request_to("/applications/5/commands").await.unwrap();

    // Invalidated session: identify again and receive a second READY
    conn.send(&json!({"op": 9, "d": false}));
    let identify = conn.recv_op(2).await.unwrap();
    assert_eq!(identify["d"]["token"], "mock-token");
    conn.send(&ready(1, "session-b", &mock.ws_url()));

    assert!(eventually(|| bot.snapshot().session_id.as_deref() == Some("session-b")).await);
    let again = tokio::time::timeout(
        Duration::from_millis(300),
        mock.request_starting("/applications/"),
    )
    .await;
    assert!(again.is_err());

    runner.abort();
}

#[tokio::test]
async fn test_reconnect_request_resumes_on_same_connection() {
    let mock = MockDiscord::start().await.unwrap();
    let bot = Bot::new(mock.config()).unwrap();

    let runner = spawn_bot(&bot);
    let mut conn = mock.next_connection().await.unwrap();
    conn.handshake().await.unwrap();
    conn.send(&ready(1, "session-a", &mock.ws_url()));
    conn.send(&dispatch("TYPING_START", 2, json!({})));

    conn.send(&json!({"op": 7, "d": null}));
    let resume = conn.recv_op(6).await.unwrap();
    assert_eq!(resume["d"]["session_id"], "session-a");
    assert_eq!(resume["d"]["seq"], 2);
    assert_eq!(resume["d"]["token"], "mock-token");

    conn.send(&dispatch("RESUMED", 3, json!({})));
    assert!(eventually(|| bot.snapshot().phase == SessionPhase::SteadyState).await);
    assert_eq!(bot.snapshot().sequence, Some(3));

    runner.abort();
}

#[tokio::test]
async fn test_dropped_connection_reconnects_and_resumes() {
    let mock = MockDiscord::start().await.unwrap();
    let bot = Bot::new(mock.config()).unwrap();

    let (tx, mut messages) = mpsc::unbounded_channel();
    bot.on_message(move |_bot, message: Message| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(message.content);
            Ok(())
        }
    });

    let runner = spawn_bot(&bot);
    let mut conn = mock.next_connection().await.unwrap();
    conn.handshake().await.unwrap();
    conn.send(&ready(1, "session-a", &mock.ws_url()));
    conn.send(&dispatch(
        "MESSAGE_CREATE",
        2,
        json!({"id": "10", "channel_id": "20", "content": "before"}),
    ));
    assert_eq!(recv(&mut messages).await, "before");

    conn.close(4000);

    let mut second = mock.next_connection().await.unwrap();
    second.send(&integration_tests::hello(45_000));
    let resume = second.recv_op(6).await.unwrap();
    assert_eq!(resume["d"]["session_id"], "session-a");
    assert_eq!(resume["d"]["seq"], 2);

    second.send(&dispatch("RESUMED", 3, json!({})));
    second.send(&dispatch(
        "MESSAGE_CREATE",
        4,
        json!({"id": "11", "channel_id": "20", "content": "after"}),
    ));
    assert_eq!(recv(&mut messages).await, "after");
    assert!(!runner.is_finished());

    runner.abort();
}

#[tokio::test]
async fn test_session_invalidating_close_reidentifies() {
    let mock = MockDiscord::start().await.unwrap();
    let bot = Bot::new(mock.config()).unwrap();

    let runner = spawn_bot(&bot);
    let mut conn = mock.next_connection().await.unwrap();
    conn.handshake().await.unwrap();
    conn.send(&ready(1, "session-a", &mock.ws_url()));
    assert!(eventually(|| bot.snapshot().bootstrapped).await);

    conn.close(4009);

    let mut second = mock.next_connection().await.unwrap();
    let identify = second.handshake().await.unwrap();
    assert_eq!(identify["op"], 2);

    runner.abort();
}

#[tokio::test]
async fn test_fatal_close_code_ends_run() {
    let mock = MockDiscord::start().await.unwrap();
    let bot = Bot::new(mock.config()).unwrap();

    let runner = spawn_bot(&bot);
    let mut conn = mock.next_connection().await.unwrap();
    conn.handshake().await.unwrap();
    conn.close(4004);

    let result = tokio::time::timeout(WAIT, runner).await.unwrap().unwrap();
    assert!(matches!(
        result,
        Err(GatewayError::Closed(CloseCode::AuthenticationFailed))
    ));
}

#[tokio::test]
async fn test_discovery_failure_is_fatal() {
    let mock = MockDiscord::start().await.unwrap();
    let mut config = mock.config();
    // Nothing listens on port 1
    config.api_base_url = "http://127.0.0.1:1".to_string();
    let bot = Bot::new(config).unwrap();

    let result = tokio::time::timeout(WAIT, bot.run()).await.unwrap();
    assert!(matches!(result, Err(GatewayError::Discovery(_))));
}

#[tokio::test]
async fn test_malformed_frames_are_ignored() {
    let mock = MockDiscord::start().await.unwrap();
    let bot = Bot::new(mock.config()).unwrap();

    let (tx, mut ops) = mpsc::unbounded_channel();
    bot.on_socket_receive(move |_bot, frame| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(frame.op.as_u8());
            Ok(())
        }
    });

    let runner = spawn_bot(&bot);
    let mut conn = mock.next_connection().await.unwrap();
    conn.handshake().await.unwrap();
    assert_eq!(recv(&mut ops).await, 10);

    conn.send_text("{not json");
    conn.send(&json!({"op": 0, "s": 7, "d": {}}));
    conn.send(&ready(1, "session-a", &mock.ws_url()));

    assert!(eventually(|| bot.snapshot().bootstrapped).await);
    assert_eq!(bot.snapshot().sequence, Some(1));
    assert!(!runner.is_finished());

    runner.abort();
}

// ============================================================================
// Guild cache
// ============================================================================

#[tokio::test]
async fn test_member_chunks_fill_cache() {
    let mock = MockDiscord::start().await.unwrap();
    let mut config = mock.config();
    config.memoize_guilds = true;
    let bot = Bot::new(config).unwrap();

    let (tx, mut joined) = mpsc::unbounded_channel();
    bot.on_guild_join(move |_bot, guild: Guild| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(guild.name);
            Ok(())
        }
    });

    let runner = spawn_bot(&bot);
    let mut conn = mock.next_connection().await.unwrap();
    conn.handshake().await.unwrap();
    conn.send(&ready(1, "session-a", &mock.ws_url()));
    conn.send(&dispatch(
        "GUILD_CREATE",
        2,
        json!({"id": "50", "name": "Test Guild", "owner_id": "1"}),
    ));

    let request = conn.recv_op(8).await.unwrap();
    assert_eq!(request["d"]["guild_id"], "50");
    assert_eq!(request["d"]["limit"], 0);
    assert_eq!(recv(&mut joined).await, "Test Guild");

    conn.send(&dispatch(
        "GUILD_MEMBERS_CHUNK",
        3,
        json!({
            "guild_id": "50",
            "members": [{"user": {"id": "7", "username": "ada"}, "roles": []}],
            "chunk_index": 0,
            "chunk_count": 1
        }),
    ));

    assert!(
        eventually(|| bot
            .guild(Snowflake::new(50))
            .is_some_and(|g| g.member(Snowflake::new(7)).is_some()))
        .await
    );
    assert!(!bot.snapshot().suppress_dispatch);

    conn.send(&dispatch("GUILD_DELETE", 4, json!({"id": "50"})));
    assert!(eventually(|| bot.guild(Snowflake::new(50)).is_none()).await);

    runner.abort();
}

// ============================================================================
// Interactions
// ============================================================================

fn interaction(id: &str, token: &str, kind: u8, data: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "application_id": "5",
        "type": kind,
        "token": token,
        "channel_id": "20",
        "user": {"id": "7", "username": "ada"},
        "data": data
    })
}

#[tokio::test]
async fn test_command_and_button_round_trip() {
    let mock = MockDiscord::start().await.unwrap();
    let bot = Bot::new(mock.config()).unwrap();

    bot.add_command(ping_command(), |ctx| async move {
        let again = Button::new(ButtonStyle::Primary)
            .label("Again")
            .on_click(|ctx| async move {
                ctx.update_message("clicked").await?;
                Ok(())
            });
        let view = View::new().row(ActionRow::new().button(again));
        ctx.respond(MessageBody::text("pong").view(view)).await?;
        Ok(())
    });

    let runner = spawn_bot(&bot);
    let mut conn = mock.next_connection().await.unwrap();
    conn.handshake().await.unwrap();
    conn.send(&ready(1, "session-a", &mock.ws_url()));
    mock.request_to("/applications/5/commands").await.unwrap();
    // Registration stores the handler once the response is read
    tokio::time::sleep(Duration::from_millis(200)).await;

    conn.send(&dispatch(
        "INTERACTION_CREATE",
        2,
        interaction("700", "tok-a", 2, json!({"id": "1000", "name": "ping"})),
    ));
    let response = mock
        .request_to("/interactions/700/tok-a/callback")
        .await
        .unwrap();
    assert_eq!(response.body["type"], 4);
    assert_eq!(response.body["data"]["content"], "pong");

    let button = &response.body["data"]["components"][0]["components"][0];
    assert_eq!(button["type"], 2);
    assert_eq!(button["label"], "Again");
    let custom_id = button["custom_id"].as_str().unwrap().to_string();

    conn.send(&dispatch(
        "INTERACTION_CREATE",
        3,
        interaction(
            "701",
            "tok-b",
            3,
            json!({"custom_id": custom_id, "component_type": 2}),
        ),
    ));
    let update = mock
        .request_to("/interactions/701/tok-b/callback")
        .await
        .unwrap();
    assert_eq!(update.body["type"], 7);
    assert_eq!(update.body["data"]["content"], "clicked");

    // Buttons stay live after a click
    assert!(bot.components().callbacks().contains(&custom_id));

    runner.abort();
}

#[tokio::test]
async fn test_send_message_over_control_channel() {
    let mock = MockDiscord::start().await.unwrap();
    let bot = Bot::new(mock.config()).unwrap();

    let message = bot
        .send_message(Snowflake::new(42), MessageBody::text("hello").tts())
        .await
        .unwrap();
    assert_eq!(message.content, "hello");
    assert_eq!(message.channel_id, Snowflake::new(42));

    let request = mock.request_to("/channels/42/messages").await.unwrap();
    assert_eq!(request.body["content"], "hello");
    assert_eq!(request.body["tts"], true);
}
