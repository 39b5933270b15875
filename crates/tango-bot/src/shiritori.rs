//! The shiritori game session: a turn-based loop of answer, request,
//! acknowledgment.
//!
//! All game logic (kana validation, chaining, scoring) lives in the
//! backend. This module owns the conversation: it collects the player's
//! answers, emits one `shiritori` request per turn (including the
//! timeout turn, with a null word), and interprets the verdict carried
//! by the next `ack_shiritori` event whose context belongs to this
//! session. Acknowledgments match purely on author + channel; a second
//! concurrent game with the same key would cross-talk, so starts are
//! rejected while a session with that key is active.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tango_core::{ChannelId, MessageContext, TangoError, TangoResult, UserId, text};
use tango_link::{AckHandler, InboundAck, ack_topic};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::catalog::{self, EndType};
use crate::feed::FeedSubscription;
use crate::handler::{BACKEND_DOWN_MESSAGE, BotState, reply_to};
use crate::resolve;

/// Request topic for game turns.
pub const TOPIC: &str = "shiritori";
/// Request topic for one-shot word checks.
pub const CHECK_TOPIC: &str = "shiritori_check";

/// Lowest accepted per-turn time limit, in seconds.
pub const MIN_TIME_LIMIT: u64 = 5;
/// Highest accepted per-turn time limit, in seconds.
pub const MAX_TIME_LIMIT: u64 = 60;
/// Time limit used when the command does not name one.
pub const DEFAULT_TIME_LIMIT: u64 = 20;

/// Rejection for a time limit outside the accepted range.
pub const TIME_LIMIT_MESSAGE: &str = "Time limit must be between 5 - 60 seconds.";

pub(crate) const ALREADY_PLAYING_MESSAGE: &str =
    "You already have a game of Shiritori running in this channel.";

/// Pause between the rules and the first turn.
const START_DELAY: Duration = Duration::from_secs(5);

/// How often an unanswered ack wait rechecks the backend link.
const ACK_RECHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Active game sessions, keyed by author + channel. Cloning shares the
/// set.
#[derive(Clone, Default)]
pub struct GameRegistry {
    active: Arc<Mutex<HashSet<(UserId, ChannelId)>>>,
}

impl GameRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a session key. Returns `false` when a game with this key is
    /// already running.
    pub async fn try_begin(&self, key: (UserId, ChannelId)) -> bool {
        self.active.lock().await.insert(key)
    }

    /// Release a session key when its game ends.
    pub async fn finish(&self, key: (UserId, ChannelId)) {
        self.active.lock().await.remove(&key);
    }
}

/// An `ack_shiritori` payload.
#[derive(Debug, Deserialize)]
struct GameAck {
    ctx: MessageContext,
    #[serde(default)]
    end_type: Option<EndType>,
    #[serde(default)]
    next_word: Option<NextWord>,
    #[serde(default)]
    score: u64,
    #[serde(default)]
    timeout: Option<u64>,
}

/// The backend's counter-word.
#[derive(Debug, Deserialize)]
struct NextWord {
    reading: String,
    #[serde(default)]
    writing: Option<String>,
}

pub(crate) fn rules_text(time_limit: u64) -> String {
    format!(
        "A game of Shiritori is starting!\n\
         The rules for my game are as follows:\n\
         1. Words must be written in hiragana or katakana accordingly.\n\
         2. Words must consist of at least two syllables/kana. (Final sokuon/dash is ignored)\n\
         3. Words must be nouns only.\n\
         4. A word must not be repeated twice.\n\
         5. The time limit for each turn is {time_limit} seconds.\n\n\
         All messages following this will be considered as answers. If you want the bot to \
         ignore a message (like if you're replying to a friend in the same channel), add a \
         backslash (`\\`) before your message.\n\n\
         Get ready, the game will start in 5 seconds!"
    )
}

/// Start a game session: validate, announce the rules, then run the
/// turn loop to completion. Runs in its own task.
pub async fn start_game(state: BotState, ctx: MessageContext, time_limit: u64) {
    let chat = state.chat.as_ref();
    if !(MIN_TIME_LIMIT..=MAX_TIME_LIMIT).contains(&time_limit) {
        reply_to(chat, &ctx, TIME_LIMIT_MESSAGE).await;
        return;
    }
    if state.link.require_connected().is_err() {
        reply_to(chat, &ctx, BACKEND_DOWN_MESSAGE).await;
        return;
    }
    let key = ctx.session_key();
    if !state.games.try_begin(key).await {
        reply_to(chat, &ctx, ALREADY_PLAYING_MESSAGE).await;
        return;
    }
    info!(author = %ctx.author(), channel = %ctx.channel(), time_limit, "Starting game");

    reply_to(chat, &ctx, &rules_text(time_limit)).await;
    tokio::time::sleep(START_DELAY).await;
    reply_to(chat, &ctx, &format!("<@{}> Starting off, しりとり!", ctx.author())).await;

    let answers = state.feed.subscribe();
    run_game(&state, answers, ctx, time_limit).await;
    state.games.finish(key).await;
    info!(author = %key.0, channel = %key.1, "Game over");
}

/// The turn loop. Each cycle emits exactly one request: either the
/// player's normalized answer or, after the time limit, a null word
/// under the previous turn's context.
pub(crate) async fn run_game(
    state: &BotState,
    mut answers: FeedSubscription,
    mut ctx: MessageContext,
    time_limit: u64,
) {
    let mut acks = state.router.subscribe(ack_topic(TOPIC));
    let mut timeout = time_limit;

    loop {
        let word = match answers.next_answer(&ctx, Duration::from_secs(timeout)).await {
            Some(answer) => {
                ctx = answer.context;
                Some(text::normalize_answer(&answer.text))
            },
            // Timed out; the backend decides what that means. The stale
            // context is reused since there is no newer one.
            None => None,
        };

        if state.link.require_connected().is_err() {
            reply_to(state.chat.as_ref(), &ctx, BACKEND_DOWN_MESSAGE).await;
            return;
        }
        if let Err(e) = state.link.emit(TOPIC, &ctx, json!({ "word": word, "timeout": timeout })) {
            warn!(error = %e, "Abandoning game, request could not be queued");
            return;
        }

        // The topic is shared by every running game; keep waiting until
        // an acknowledgment for this session arrives. The wait rechecks
        // the gate so a backend drop cannot strand the session (and its
        // registry key) on an ack that will never come.
        let ack = loop {
            match tokio::time::timeout(ACK_RECHECK_INTERVAL, acks.recv()).await {
                Ok(Some(event)) => {
                    match serde_json::from_value::<GameAck>(event.payload.clone()) {
                        Ok(ack) if ack.ctx.same_session(&ctx) => break ack,
                        Ok(_) => {},
                        Err(e) => error!(error = %e, "Protocol violation in game acknowledgment"),
                    }
                },
                Ok(None) => return,
                Err(_) => {
                    if state.link.require_connected().is_err() {
                        reply_to(state.chat.as_ref(), &ctx, BACKEND_DOWN_MESSAGE).await;
                        return;
                    }
                },
            }
        };

        let Some((channel, message)) = resolve::reply_target(state.chat.as_ref(), &ack.ctx).await
        else {
            // Reply target gone; the game ends with no output.
            return;
        };

        match ack.end_type {
            None => {
                let Some(next) = ack.next_word else {
                    error!("Protocol violation: continue acknowledgment without next_word");
                    return;
                };
                let response = match next.writing {
                    Some(writing) => format!("{} ({writing})", next.reading),
                    None => next.reading,
                };
                if let Err(e) = state.chat.reply(channel, message, &response).await {
                    warn!(error = %e, "Abandoning game, reply failed");
                    return;
                }
                ctx = ack.ctx;
                timeout = ack.timeout.unwrap_or(timeout);
            },
            Some(EndType::Silent) => return,
            Some(end) => {
                if let Some(text) = catalog::end_message(end) {
                    let response = format!("{text} (Score: {})", ack.score);
                    if let Err(e) = state.chat.reply(channel, message, &response).await {
                        warn!(error = %e, "Failed to deliver the game-over message");
                    }
                }
                return;
            },
        }
    }
}

/// One-shot `shiritori check`: emit and return; the registered
/// [`CheckAckHandler`] picks up the verdict.
///
/// # Errors
///
/// `TangoError::BackendUnavailable` when the gate is closed,
/// `TangoError::Transport` when the request cannot be queued.
pub async fn run_check(state: &BotState, ctx: MessageContext, word: &str) -> TangoResult<()> {
    state
        .link
        .require_connected()
        .map_err(|_| TangoError::BackendUnavailable)?;
    state
        .link
        .emit(CHECK_TOPIC, &ctx, json!({ "word": word }))
        .map_err(|e| TangoError::Transport(e.to_string()))?;
    Ok(())
}

/// An `ack_shiritori_check` payload.
#[derive(Debug, Deserialize)]
struct CheckAck {
    ctx: MessageContext,
    #[serde(default)]
    end_type: Option<EndType>,
}

/// Replies the verdict of a one-shot word check.
pub struct CheckAckHandler {
    chat: Arc<dyn tango_core::ChatPort>,
}

impl CheckAckHandler {
    /// Create a handler replying through the given chat adapter.
    #[must_use]
    pub fn new(chat: Arc<dyn tango_core::ChatPort>) -> Self {
        Self { chat }
    }
}

#[async_trait::async_trait]
impl AckHandler for CheckAckHandler {
    async fn on_ack(&self, ack: &InboundAck) -> anyhow::Result<()> {
        let verdict: CheckAck = serde_json::from_value(ack.payload.clone())
            .map_err(|e| anyhow::anyhow!("malformed shiritori_check acknowledgment: {e}"))?;
        let Some((channel, message)) =
            resolve::reply_target(self.chat.as_ref(), &verdict.ctx).await
        else {
            return Ok(());
        };
        if let Some(text) = catalog::check_message(verdict.end_type) {
            self.chat.reply(channel, message, text).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::IncomingMessage;
    use crate::testutil::{FakeChat, test_state};
    use tango_core::MessageId;

    fn ctx(message: u64) -> MessageContext {
        MessageContext::new(ChannelId(1), MessageId(message), UserId(7))
    }

    fn answer(message: u64, text: &str) -> IncomingMessage {
        IncomingMessage {
            context: ctx(message),
            text: text.to_string(),
        }
    }

    fn game_ack(payload: serde_json::Value) -> InboundAck {
        InboundAck {
            topic: "ack_shiritori".to_string(),
            payload,
        }
    }

    async fn wait_for_replies(chat: &FakeChat, n: usize) {
        for _ in 0..400 {
            if chat.replies().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("never saw {n} replies, got {:?}", chat.reply_texts());
    }

    async fn no_frame(io: &mut tango_link::LinkIo) {
        let queued = tokio::time::timeout(Duration::from_millis(50), io.recv()).await;
        assert!(queued.is_err(), "expected no request frame");
    }

    #[tokio::test]
    async fn start_rejects_out_of_range_time_limits() {
        let (state, mut io, chat) = test_state();
        io.set_connected(true);
        start_game(state.clone(), ctx(10), 4).await;
        start_game(state.clone(), ctx(10), 61).await;
        assert_eq!(
            chat.reply_texts(),
            vec![TIME_LIMIT_MESSAGE.to_string(), TIME_LIMIT_MESSAGE.to_string()]
        );
        no_frame(&mut io).await;
    }

    #[tokio::test]
    async fn start_requires_the_backend() {
        let (state, mut io, chat) = test_state();
        start_game(state.clone(), ctx(10), 20).await;
        assert_eq!(chat.reply_texts(), vec![BACKEND_DOWN_MESSAGE.to_string()]);
        no_frame(&mut io).await;
    }

    #[tokio::test]
    async fn start_rejects_a_second_game_with_the_same_key() {
        let (state, io, chat) = test_state();
        io.set_connected(true);
        // Simulate an active session holding the key.
        assert!(state.games.try_begin(ctx(10).session_key()).await);

        start_game(state, ctx(11), 20).await;
        assert_eq!(chat.reply_texts(), vec![ALREADY_PLAYING_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn registry_key_is_reusable_after_finish() {
        let registry = GameRegistry::new();
        let key = ctx(1).session_key();
        assert!(registry.try_begin(key).await);
        assert!(!registry.try_begin(key).await);
        registry.finish(key).await;
        assert!(registry.try_begin(key).await);
    }

    #[tokio::test(start_paused = true)]
    async fn start_announces_rules_then_the_first_turn_after_the_grace_period() {
        let (state, mut io, chat) = test_state();
        io.set_connected(true);

        let started = tokio::time::Instant::now();
        let game = tokio::spawn(start_game(state.clone(), ctx(10), 7));

        // No answer arrives, so the first request is the timeout turn:
        // 5 s of grace plus the configured 7 s awaiting window.
        let frame = io.recv().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(12));

        let texts = chat.reply_texts();
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("The time limit for each turn is 7 seconds."));
        assert_eq!(texts[1], "<@7> Starting off, しりとり!");

        assert_eq!(frame.topic, "shiritori");
        assert!(frame.payload["word"].is_null());
        assert_eq!(frame.payload["timeout"], 7);
        game.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn backend_drop_while_awaiting_an_ack_ends_the_game() {
        let (state, mut io, chat) = test_state();
        io.set_connected(true);

        let answers = state.feed.subscribe();
        state.feed.publish(answer(11, "ねこ"));
        let game_state = state.clone();
        let game = tokio::spawn(async move { run_game(&game_state, answers, ctx(10), 5).await });

        let _ = io.recv().await.unwrap();
        io.set_connected(false);

        game.await.unwrap();
        assert_eq!(chat.reply_texts(), vec![BACKEND_DOWN_MESSAGE.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn session_key_is_released_after_a_backend_drop() {
        let (state, mut io, chat) = test_state();
        io.set_connected(true);

        let game = tokio::spawn(start_game(state.clone(), ctx(10), 5));
        let _ = io.recv().await.unwrap();
        io.set_connected(false);
        game.await.unwrap();

        assert_eq!(
            chat.reply_texts().last().map(String::as_str),
            Some(BACKEND_DOWN_MESSAGE)
        );
        // The key is free again; a new game with the same key may start.
        assert!(state.games.try_begin(ctx(10).session_key()).await);
    }

    #[test]
    fn rules_mention_the_time_limit() {
        let rules = rules_text(45);
        assert!(rules.contains("The time limit for each turn is 45 seconds."));
        assert!(rules.contains("backslash"));
    }

    #[tokio::test]
    async fn game_round_trip() {
        let (state, mut io, chat) = test_state();
        io.set_connected(true);

        let answers = state.feed.subscribe();
        state.feed.publish(answer(11, "ね こ"));

        let game_state = state.clone();
        let game =
            tokio::spawn(async move { run_game(&game_state, answers, ctx(10), 5).await });

        // Turn 1: the answer is normalized and its context adopted.
        let frame = io.recv().await.unwrap();
        assert_eq!(frame.topic, "shiritori");
        assert_eq!(frame.payload["word"], "ねこ");
        assert_eq!(frame.payload["timeout"], 5);
        assert_eq!(frame.payload["ctx"]["message"]["id"], 11);

        state
            .router
            .dispatch(game_ack(json!({
                "ctx": ctx(12),
                "end_type": null,
                "next_word": { "reading": "こたつ", "writing": "炬燵" },
                "score": 1,
                "timeout": 5,
            })))
            .await;
        wait_for_replies(&chat, 1).await;
        assert_eq!(chat.reply_texts()[0], "こたつ (炬燵)");

        // Turn 2 ends the game.
        state.feed.publish(answer(13, "つき"));
        let frame = io.recv().await.unwrap();
        assert_eq!(frame.payload["word"], "つき");
        assert_eq!(frame.payload["ctx"]["message"]["id"], 13);

        state
            .router
            .dispatch(game_ack(json!({
                "ctx": ctx(14),
                "end_type": "n_ending",
                "score": 2,
            })))
            .await;
        wait_for_replies(&chat, 2).await;
        assert_eq!(
            chat.reply_texts()[1],
            "Words that end with ん or ン end the game. (Score: 2)"
        );
        game.await.unwrap();
    }

    #[tokio::test]
    async fn timeout_turn_sends_a_null_word_under_the_stale_context() {
        let (state, mut io, _chat) = test_state();
        io.set_connected(true);

        let answers = state.feed.subscribe();
        let game_state = state.clone();
        let game = tokio::spawn(async move { run_game(&game_state, answers, ctx(10), 1).await });

        let frame = io.recv().await.unwrap();
        assert!(frame.payload["word"].is_null());
        assert_eq!(frame.payload["ctx"]["message"]["id"], 10);

        state
            .router
            .dispatch(game_ack(json!({ "ctx": ctx(10), "end_type": "silent" })))
            .await;
        game.await.unwrap();
    }

    #[tokio::test]
    async fn next_word_without_writing_is_reading_only() {
        let (state, mut io, chat) = test_state();
        io.set_connected(true);

        let answers = state.feed.subscribe();
        state.feed.publish(answer(11, "ねこ"));
        let game_state = state.clone();
        let game = tokio::spawn(async move { run_game(&game_state, answers, ctx(10), 5).await });

        let _ = io.recv().await.unwrap();
        state
            .router
            .dispatch(game_ack(json!({
                "ctx": ctx(12),
                "next_word": { "reading": "こたつ" },
                "score": 1,
            })))
            .await;
        wait_for_replies(&chat, 1).await;
        assert_eq!(chat.reply_texts()[0], "こたつ");
        game.abort();
    }

    #[tokio::test]
    async fn silent_end_produces_no_output() {
        let (state, mut io, chat) = test_state();
        io.set_connected(true);

        let answers = state.feed.subscribe();
        state.feed.publish(answer(11, "ねこ"));
        let game_state = state.clone();
        let game = tokio::spawn(async move { run_game(&game_state, answers, ctx(10), 5).await });

        let _ = io.recv().await.unwrap();
        state
            .router
            .dispatch(game_ack(json!({ "ctx": ctx(12), "end_type": "silent", "score": 3 })))
            .await;
        game.await.unwrap();
        assert!(chat.replies().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_ack_context_ends_the_game_silently() {
        let (state, mut io, chat) = test_state();
        io.set_connected(true);
        chat.forget_message(MessageId(12));

        let answers = state.feed.subscribe();
        state.feed.publish(answer(11, "ねこ"));
        let game_state = state.clone();
        let game = tokio::spawn(async move { run_game(&game_state, answers, ctx(10), 5).await });

        let _ = io.recv().await.unwrap();
        state
            .router
            .dispatch(game_ack(json!({
                "ctx": ctx(12),
                "next_word": { "reading": "こたつ" },
                "score": 1,
            })))
            .await;
        game.await.unwrap();
        assert!(chat.replies().is_empty());
    }

    #[tokio::test]
    async fn acks_for_other_sessions_are_ignored() {
        let (state, mut io, chat) = test_state();
        io.set_connected(true);

        let answers = state.feed.subscribe();
        state.feed.publish(answer(11, "ねこ"));
        let game_state = state.clone();
        let game = tokio::spawn(async move { run_game(&game_state, answers, ctx(10), 5).await });

        let _ = io.recv().await.unwrap();
        let stranger = MessageContext::new(ChannelId(1), MessageId(50), UserId(99));
        state
            .router
            .dispatch(game_ack(json!({
                "ctx": stranger,
                "end_type": "timeout",
                "score": 9,
            })))
            .await;
        state
            .router
            .dispatch(game_ack(json!({ "ctx": ctx(12), "end_type": "timeout", "score": 2 })))
            .await;
        wait_for_replies(&chat, 1).await;
        assert_eq!(chat.reply_texts(), vec!["Time's up! (Score: 2)".to_string()]);
        game.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_end_type_is_skipped_as_a_protocol_violation() {
        let (state, mut io, chat) = test_state();
        io.set_connected(true);

        let answers = state.feed.subscribe();
        state.feed.publish(answer(11, "ねこ"));
        let game_state = state.clone();
        let game = tokio::spawn(async move { run_game(&game_state, answers, ctx(10), 5).await });

        let _ = io.recv().await.unwrap();
        state
            .router
            .dispatch(game_ack(json!({ "ctx": ctx(12), "end_type": "out_of_words" })))
            .await;
        state
            .router
            .dispatch(game_ack(json!({ "ctx": ctx(12), "end_type": "timeout", "score": 1 })))
            .await;
        wait_for_replies(&chat, 1).await;
        assert_eq!(chat.reply_texts(), vec!["Time's up! (Score: 1)".to_string()]);
        game.await.unwrap();
    }

    #[tokio::test]
    async fn check_emits_the_word() {
        let (state, mut io, _chat) = test_state();
        io.set_connected(true);
        run_check(&state, ctx(10), "ねこ").await.unwrap();

        let frame = io.recv().await.unwrap();
        assert_eq!(frame.topic, "shiritori_check");
        assert_eq!(frame.payload["word"], "ねこ");
    }

    #[tokio::test]
    async fn check_requires_the_backend() {
        let (state, mut io, _chat) = test_state();
        let result = run_check(&state, ctx(10), "ねこ").await;
        assert!(matches!(result, Err(TangoError::BackendUnavailable)));
        no_frame(&mut io).await;
    }

    #[tokio::test]
    async fn check_handler_maps_verdicts() {
        let chat = Arc::new(FakeChat::new());
        let handler = CheckAckHandler::new(chat.clone());

        for (end_type, expected) in [
            (json!(null), "Looks good!"),
            (json!("not_noun"), "That is not a common noun."),
            (json!("bad_word"), "That did not seem like proper Japanese with kana only."),
            (json!("n_ending"), "Words that end with ん or ン end the game."),
        ] {
            handler
                .on_ack(&InboundAck {
                    topic: "ack_shiritori_check".to_string(),
                    payload: json!({ "ctx": ctx(10), "end_type": end_type }),
                })
                .await
                .unwrap();
            assert_eq!(chat.reply_texts().last().map(String::as_str), Some(expected));
        }
    }

    #[tokio::test]
    async fn check_handler_rejects_unknown_verdicts() {
        let chat = Arc::new(FakeChat::new());
        let handler = CheckAckHandler::new(chat.clone());
        let result = handler
            .on_ack(&InboundAck {
                topic: "ack_shiritori_check".to_string(),
                payload: json!({ "ctx": ctx(10), "end_type": "out_of_words" }),
            })
            .await;
        assert!(result.is_err());
        assert!(chat.replies().is_empty());
    }

    #[tokio::test]
    async fn check_handler_is_silent_on_an_unresolvable_context() {
        let chat = Arc::new(FakeChat::new());
        chat.forget_channel(ChannelId(1));
        let handler = CheckAckHandler::new(chat.clone());
        handler
            .on_ack(&InboundAck {
                topic: "ack_shiritori_check".to_string(),
                payload: json!({ "ctx": ctx(10), "end_type": null }),
            })
            .await
            .unwrap();
        assert!(chat.replies().is_empty());
    }
}
