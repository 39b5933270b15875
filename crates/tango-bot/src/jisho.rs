//! Jisho dictionary lookup.
//!
//! The only command that never touches the backend: entries come
//! straight from the public Jisho search API over HTTPS and are
//! rendered as plain text.

use serde::Deserialize;
use tango_core::{MessageContext, TangoResult};

use crate::handler::{BotState, reply_to};

/// Jisho word-search endpoint.
pub const API_URL: &str = "https://jisho.org/api/v1/search/words";

/// HTTP client for the Jisho search API. Cloning shares the connection
/// pool.
#[derive(Clone)]
pub struct JishoClient {
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Entry>,
}

/// One dictionary entry.
#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    is_common: Option<bool>,
    #[serde(default)]
    japanese: Vec<JapaneseForm>,
    #[serde(default)]
    senses: Vec<Sense>,
}

#[derive(Debug, Deserialize)]
struct JapaneseForm {
    #[serde(default)]
    word: Option<String>,
    #[serde(default)]
    reading: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Sense {
    #[serde(default)]
    english_definitions: Vec<String>,
    #[serde(default)]
    parts_of_speech: Vec<String>,
    #[serde(default)]
    links: Vec<SenseLink>,
}

#[derive(Debug, Deserialize)]
struct SenseLink {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl JishoClient {
    /// Create a client with a fresh connection pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Search the dictionary.
    ///
    /// # Errors
    ///
    /// Any transport or non-success HTTP status error from the API.
    pub async fn search(&self, word: &str) -> Result<Vec<Entry>, reqwest::Error> {
        let response = self
            .http
            .get(API_URL)
            .query(&[("keyword", word)])
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;
        Ok(response.data)
    }
}

impl Default for JishoClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Render one entry as a page of plain text.
fn render_entry(entry: &Entry) -> String {
    let mut lines = Vec::new();

    for form in &entry.japanese {
        match (&form.word, &form.reading) {
            (Some(word), Some(reading)) => lines.push(format!("{word}（{reading}）")),
            (None, Some(reading)) => lines.push(reading.clone()),
            (Some(word), None) => lines.push(word.clone()),
            (None, None) => {},
        }
    }
    if entry.is_common == Some(true) {
        lines.push("(common word)".to_string());
    }
    lines.push(String::new());

    for (i, sense) in entry.senses.iter().enumerate() {
        let parts = if sense.parts_of_speech.is_empty() {
            String::new()
        } else {
            format!(
                "({}) ",
                sense
                    .parts_of_speech
                    .iter()
                    .map(|p| p.to_lowercase())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        };
        lines.push(format!(
            "{}. {parts}{}",
            i.saturating_add(1),
            sense.english_definitions.join("; ")
        ));
        for link in &sense.links {
            if let (Some(text), Some(url)) = (&link.text, &link.url) {
                lines.push(format!("{text} <{url}>"));
            }
        }
    }

    lines.join("\n")
}

/// `jisho <word>`: search and reply with the first entry.
///
/// # Errors
///
/// None currently; API failures become user-facing messages. The
/// `Result` keeps the runner signatures uniform.
pub async fn run_jisho(state: &BotState, ctx: MessageContext, word: &str) -> TangoResult<()> {
    let chat = state.chat.as_ref();
    let entries = match state.jisho.search(word).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "Dictionary lookup failed");
            reply_to(chat, &ctx, "The dictionary is currently unavailable.").await;
            return Ok(());
        },
    };
    if entries.is_empty() {
        reply_to(chat, &ctx, &format!("Could not look up {word} in the dictionary.")).await;
        return Ok(());
    }

    let mut page = format!("Jisho entries related to {word}\n\n{}", render_entry(&entries[0]));
    if entries.len() > 1 {
        page.push_str(&format!("\n\n(1 of {} entries)", entries.len()));
    }
    reply_to(chat, &ctx, &page).await;
    Ok(())
}
