//! Incoming message handling: feed publication and command dispatch.

use std::sync::Arc;

use tango_core::{ChatPort, MessageContext, TangoError};
use tango_link::{AckRouter, BackendLink};
use tracing::warn;

use crate::command::{self, Command, Parsed};
use crate::config::BotConfig;
use crate::feed::{IncomingMessage, MessageFeed};
use crate::jisho::{self, JishoClient};
use crate::kanji;
use crate::shiritori::{self, GameRegistry};

/// Fixed apology when the backend connection capability is absent.
pub const BACKEND_DOWN_MESSAGE: &str =
    "The word-game backend is currently unavailable. Please try again later.";

/// Shared bot state passed to every handler. Cloning is cheap; every
/// field is a handle.
#[derive(Clone)]
pub struct BotState {
    /// Chat platform adapter.
    pub chat: Arc<dyn ChatPort>,
    /// Backend link (capability gate + request emitter).
    pub link: BackendLink,
    /// Acknowledgment router.
    pub router: AckRouter,
    /// Inbound message fan-out for game sessions.
    pub feed: MessageFeed,
    /// Active game sessions, keyed by author + channel.
    pub games: GameRegistry,
    /// Dictionary client.
    pub jisho: JishoClient,
    /// Runtime configuration.
    pub config: Arc<BotConfig>,
}

/// Reply to the message behind `ctx`, logging instead of failing.
pub(crate) async fn reply_to(chat: &dyn ChatPort, ctx: &MessageContext, text: &str) {
    if let Err(e) = chat.reply(ctx.channel(), ctx.message(), text).await {
        warn!(channel = %ctx.channel(), error = %e, "Failed to reply");
    }
}

/// Handle one incoming chat message.
///
/// The message is published to the feed before command parsing: an
/// active game in this channel may be waiting for exactly this message
/// as an answer, and game answers are not commands.
pub async fn handle_message(state: BotState, message: IncomingMessage) {
    if !state.config.is_guild_allowed(message.context.guild()) {
        return;
    }

    state.feed.publish(message.clone());

    let Some(parsed) = command::parse(&state.config.command_prefix, &message.text) else {
        return;
    };
    let ctx = message.context;

    let result = match parsed {
        Parsed::Usage(text) => {
            reply_to(state.chat.as_ref(), &ctx, text).await;
            Ok(())
        },
        Parsed::Command(Command::Kanji(query)) => kanji::run_kanji(&state, ctx, &query).await,
        Parsed::Command(Command::StrokeOrder(query)) => {
            kanji::run_stroke_order(&state, ctx, &query).await
        },
        Parsed::Command(Command::Shiritori { time_limit }) => {
            // Sessions outlive the triggering message by design.
            let state = state.clone();
            tokio::spawn(async move {
                shiritori::start_game(state, ctx, time_limit).await;
            });
            Ok(())
        },
        Parsed::Command(Command::ShiritoriCheck(word)) => {
            shiritori::run_check(&state, ctx, &word).await
        },
        Parsed::Command(Command::Jisho(query)) => jisho::run_jisho(&state, ctx, &query).await,
    };

    match result {
        Ok(()) => {},
        Err(TangoError::BackendUnavailable) => {
            reply_to(state.chat.as_ref(), &ctx, BACKEND_DOWN_MESSAGE).await;
        },
        Err(e) => warn!(error = %e, "Command failed"),
    }
}
