//! Tango bot — standalone binary.
//!
//! Wires the Discord Gateway intake, the Discord REST adapter, and the
//! backend link together and runs until Ctrl-C.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tango_bot::config::BotConfig;
use tango_bot::discord::DiscordRest;
use tango_bot::feed::MessageFeed;
use tango_bot::gateway;
use tango_bot::handler::BotState;
use tango_bot::jisho::JishoClient;
use tango_bot::kanji::{KANJI_TOPIC, KanjiAckHandler, STROKE_ORDER_TOPIC, StrokeOrderAckHandler};
use tango_bot::shiritori::{CHECK_TOPIC, CheckAckHandler, GameRegistry};
use tango_core::ChatPort;
use tango_link::{AckRouter, BackendLink, LinkConfig, ack_topic, run_link};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,tango_bot=info,tango_link=info")),
        )
        .init();

    let config = Arc::new(BotConfig::load(None)?);
    let chat: Arc<dyn ChatPort> = Arc::new(DiscordRest::new(&config.bot_token));
    let (link, io) = BackendLink::new();
    let router = AckRouter::new();

    router
        .register(ack_topic(CHECK_TOPIC), Arc::new(CheckAckHandler::new(chat.clone())))
        .await;
    router
        .register(ack_topic(KANJI_TOPIC), Arc::new(KanjiAckHandler::new(chat.clone())))
        .await;
    router
        .register(
            ack_topic(STROKE_ORDER_TOPIC),
            Arc::new(StrokeOrderAckHandler::new(chat.clone())),
        )
        .await;

    let state = BotState {
        chat,
        link,
        router: router.clone(),
        feed: MessageFeed::new(),
        games: GameRegistry::new(),
        jisho: JishoClient::new(),
        config: config.clone(),
    };

    let (shutdown_tx, _) = broadcast::channel(1);

    let mut link_config = LinkConfig::new(config.backend_url.clone());
    link_config.backoff_base_ms = config.backoff_base_ms;
    link_config.backoff_max_ms = config.backoff_max_ms;
    let link_task = tokio::spawn(run_link(link_config, io, router, shutdown_tx.subscribe()));
    let gateway_task = tokio::spawn(gateway::run_gateway(state, shutdown_tx.subscribe()));

    info!("Tango is running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    let _ = shutdown_tx.send(());
    let _ = link_task.await;
    let _ = gateway_task.await;
    Ok(())
}
