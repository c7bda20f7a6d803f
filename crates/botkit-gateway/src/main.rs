//! Demo bot entry point
//!
//! Run with:
//! ```bash
//! DISCORD_TOKEN=... cargo run -p botkit-gateway
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use std::time::Duration;

use botkit_common::{try_init_tracing, BotConfig};
use botkit_core::ApplicationCommand;
use botkit_gateway::{ActionRow, Bot, Button, ButtonStyle, MessageBody, View};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Bot stopped");
        std::process::exit(1);
    }
}

fn ping_view() -> View {
    let again = Button::new(ButtonStyle::Primary)
        .label("Again")
        .on_click(|ctx| async move {
            let latency = ctx.bot.latency_ms().unwrap_or_default();
            ctx.update_message(format!("Pong! {latency}ms")).await?;
            Ok(())
        });

    View::new()
        .row(ActionRow::new().button(again))
        .timeout(Duration::from_secs(60))
        .on_timeout(|_bot, last| async move {
            if let Some(ctx) = last {
                ctx.edit_original(MessageBody::text("Ping expired")).await?;
            }
            Ok(())
        })
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting bot...");

    let config = BotConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;
    info!(
        intents = config.intents,
        memoize_guilds = config.memoize_guilds,
        "Configuration loaded"
    );

    let bot = Bot::new(config)?;

    bot.on_ready(|bot, ready| async move {
        info!(
            user = %ready.user.tag(),
            guilds = ready.guilds.len(),
            application_id = ?bot.application_id,
            "Logged in"
        );
        Ok(())
    });

    bot.add_command(
        ApplicationCommand::slash("ping", "Check gateway latency"),
        |ctx| async move {
            let latency = ctx.bot.latency_ms().unwrap_or_default();
            let body = MessageBody::text(format!("Pong! {latency}ms")).view(ping_view());
            ctx.respond(body).await?;
            Ok(())
        },
    );

    bot.run().await?;
    Ok(())
}
