//! Kanji lookup and stroke-order diagrams.
//!
//! Both commands validate locally (exactly one character; kanji lookup
//! additionally requires a CJK ideograph), emit a single request, and
//! let a registered acknowledgment handler deliver the result.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tango_core::{ChatPort, MessageContext, TangoError, TangoResult, text};
use tango_link::{AckHandler, InboundAck};

use crate::handler::{BotState, reply_to};
use crate::resolve;

/// Request topic for kanji lookups.
pub const KANJI_TOPIC: &str = "kanji_search";
/// Request topic for stroke-order lookups.
pub const STROKE_ORDER_TOPIC: &str = "stroke_order";

const ONE_KANJI_MESSAGE: &str = "Only one kanji can be queried at a time.";
const NOT_JIS_MESSAGE: &str =
    "Kanji not found in the Japanese Industrial Standard (JIS) X kanji sets.";
const ONE_CHARACTER_MESSAGE: &str = "Only one Japanese character can be queried at a time.";

/// `kanji <character>`: validate and emit a `kanji_search` request.
///
/// # Errors
///
/// `TangoError::BackendUnavailable` when the gate is closed,
/// `TangoError::Transport` when the request cannot be queued. Local
/// validation failures reply to the user and are not errors.
pub async fn run_kanji(state: &BotState, ctx: MessageContext, query: &str) -> TangoResult<()> {
    let mut chars = query.chars();
    let (first, rest) = (chars.next(), chars.next());
    let Some(character) = first else {
        return Ok(());
    };
    if rest.is_some() {
        reply_to(state.chat.as_ref(), &ctx, ONE_KANJI_MESSAGE).await;
        return Ok(());
    }
    if !text::is_cjk_ideograph(character) {
        reply_to(state.chat.as_ref(), &ctx, NOT_JIS_MESSAGE).await;
        return Ok(());
    }

    state
        .link
        .require_connected()
        .map_err(|_| TangoError::BackendUnavailable)?;
    state
        .link
        .emit(KANJI_TOPIC, &ctx, json!({ "kanji": query }))
        .map_err(|e| TangoError::Transport(e.to_string()))?;
    Ok(())
}

/// `strokeorder <character>`: validate and emit a `stroke_order`
/// request. Kana are allowed here, unlike the kanji lookup.
///
/// # Errors
///
/// Same contract as [`run_kanji`].
pub async fn run_stroke_order(
    state: &BotState,
    ctx: MessageContext,
    query: &str,
) -> TangoResult<()> {
    if query.chars().count() > 1 {
        reply_to(state.chat.as_ref(), &ctx, ONE_CHARACTER_MESSAGE).await;
        return Ok(());
    }

    state
        .link
        .require_connected()
        .map_err(|_| TangoError::BackendUnavailable)?;
    state
        .link
        .emit(STROKE_ORDER_TOPIC, &ctx, json!({ "character": query }))
        .map_err(|e| TangoError::Transport(e.to_string()))?;
    Ok(())
}

/// An `ack_kanji_search` payload. `kanji` is absent when KANJIDIC2 has
/// no entry for the queried character.
#[derive(Debug, Deserialize)]
struct KanjiSearchAck {
    ctx: MessageContext,
    #[serde(default)]
    kanji: Option<KanjiInfo>,
    query_kanji: String,
}

/// KANJIDIC2 entry data. Every field beyond the character itself and
/// the stroke count is optional in the source data.
#[derive(Debug, Deserialize)]
struct KanjiInfo {
    character: String,
    stroke_count: u32,
    #[serde(default)]
    grade: Option<u8>,
    #[serde(default)]
    frequency_rank: Option<u32>,
    #[serde(default)]
    old_jlpt_level: Option<u8>,
    #[serde(default)]
    meanings_readings: Vec<MeaningsReadings>,
    #[serde(default)]
    nanori: Vec<String>,
    #[serde(default)]
    stroke_order_gif_url: Option<String>,
}

/// One meanings group with its readings.
#[derive(Debug, Deserialize)]
struct MeaningsReadings {
    #[serde(default)]
    meanings: Vec<String>,
    #[serde(default)]
    kun_readings: Vec<String>,
    #[serde(default)]
    on_readings: Vec<String>,
}

const IDEOGRAPHIC_COMMA: &str = "\u{3001}";

/// Render an entry as plain text, omitting every absent field.
fn render_kanji(info: &KanjiInfo) -> String {
    let mut lines = vec![
        format!("Kanji Lookup - {}", info.character),
        format!("Stroke count: {}", info.stroke_count),
    ];
    if let Some(grade) = info.grade {
        lines.push(format!("Grade: {grade}"));
    }
    if let Some(rank) = info.frequency_rank {
        lines.push(format!("Frequency rank: #{rank}"));
    }
    if let Some(level) = info.old_jlpt_level {
        lines.push(format!("Former JLPT level: {level}"));
    }

    if !info.meanings_readings.is_empty() {
        lines.push(String::new());
        lines.push("Meanings and Readings".to_string());
        for (i, group) in info.meanings_readings.iter().enumerate() {
            if i > 0 {
                lines.push(String::new());
            }
            if group.meanings.is_empty() {
                lines.push("(miscellaneous readings)".to_string());
            } else {
                lines.push(group.meanings.join("/"));
            }
            if !group.kun_readings.is_empty() {
                lines.push(format!("kun: {}", group.kun_readings.join(IDEOGRAPHIC_COMMA)));
            }
            if !group.on_readings.is_empty() {
                lines.push(format!("on: {}", group.on_readings.join(IDEOGRAPHIC_COMMA)));
            }
        }
    }

    if !info.nanori.is_empty() {
        lines.push(String::new());
        lines.push("Nanori (Pronunciation in names)".to_string());
        lines.push(info.nanori.join(IDEOGRAPHIC_COMMA));
    }

    if let Some(url) = &info.stroke_order_gif_url {
        lines.push(String::new());
        lines.push(format!("Stroke order: {url}"));
    }

    lines.join("\n")
}

/// Replies the result of a kanji lookup.
pub struct KanjiAckHandler {
    chat: Arc<dyn ChatPort>,
}

impl KanjiAckHandler {
    /// Create a handler replying through the given chat adapter.
    #[must_use]
    pub fn new(chat: Arc<dyn ChatPort>) -> Self {
        Self { chat }
    }
}

#[async_trait::async_trait]
impl AckHandler for KanjiAckHandler {
    async fn on_ack(&self, ack: &InboundAck) -> anyhow::Result<()> {
        let result: KanjiSearchAck = serde_json::from_value(ack.payload.clone())
            .map_err(|e| anyhow::anyhow!("malformed kanji_search acknowledgment: {e}"))?;
        let Some((channel, message)) =
            resolve::reply_target(self.chat.as_ref(), &result.ctx).await
        else {
            return Ok(());
        };
        let response = match &result.kanji {
            Some(info) => render_kanji(info),
            None => format!("Kanji {} not found in KANJIDIC2.", result.query_kanji),
        };
        self.chat.reply(channel, message, &response).await?;
        Ok(())
    }
}

/// An `ack_stroke_order` payload.
#[derive(Debug, Deserialize)]
struct StrokeOrderAck {
    ctx: MessageContext,
    #[serde(default)]
    gif_url: Option<String>,
    query_character: String,
}

/// Replies the result of a stroke-order lookup.
pub struct StrokeOrderAckHandler {
    chat: Arc<dyn ChatPort>,
}

impl StrokeOrderAckHandler {
    /// Create a handler replying through the given chat adapter.
    #[must_use]
    pub fn new(chat: Arc<dyn ChatPort>) -> Self {
        Self { chat }
    }
}

#[async_trait::async_trait]
impl AckHandler for StrokeOrderAckHandler {
    async fn on_ack(&self, ack: &InboundAck) -> anyhow::Result<()> {
        let result: StrokeOrderAck = serde_json::from_value(ack.payload.clone())
            .map_err(|e| anyhow::anyhow!("malformed stroke_order acknowledgment: {e}"))?;
        let Some((channel, message)) =
            resolve::reply_target(self.chat.as_ref(), &result.ctx).await
        else {
            return Ok(());
        };
        let response = match &result.gif_url {
            Some(url) => url.clone(),
            None => format!(
                "Stroke order diagram for {} was not found.",
                result.query_character
            ),
        };
        self.chat.reply(channel, message, &response).await?;
        Ok(())
    }
}
