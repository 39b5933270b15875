//! Tango — a Japanese-learning Discord bot front end.
//!
//! Tango parses prefix commands from chat messages, validates their
//! arguments locally, and forwards them as topic-keyed events to a
//! stateful word-game backend over a persistent `WebSocket`
//! ([`tango_link`]). Acknowledgment events arrive independently and are
//! correlated back to the originating conversation purely through the
//! message context they carry; there are no correlation identifiers.
//!
//! Commands:
//! - `shiritori [time_limit]` — a turn-based word-chain game session
//! - `shiritori check <word>` — one-shot word validation
//! - `kanji <character>` — KANJIDIC2 kanji lookup
//! - `strokeorder <character>` — animated stroke diagram lookup
//! - `jisho <word>` — Jisho dictionary lookup (direct HTTP, no backend)

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod catalog;
pub mod command;
pub mod config;
pub mod discord;
pub mod feed;
pub mod gateway;
pub mod handler;
pub mod jisho;
pub mod kanji;
pub mod resolve;
pub mod shiritori;

#[cfg(test)]
pub(crate) mod testutil;
