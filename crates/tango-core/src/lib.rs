//! Tango Core - shared types for the Tango word-game front end.
//!
//! This crate provides:
//! - Identifier newtypes and the [`MessageContext`] that travels inside
//!   every backend request and acknowledgment
//! - The [`ChatPort`] trait, the seam to the chat platform
//! - Shared error types
//! - Japanese text helpers (answer normalization, ideograph checks)

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod chat;
mod context;
mod error;
pub mod text;

pub use chat::ChatPort;
pub use context::{ChannelId, GuildId, MessageContext, MessageId, UserId};
pub use error::{ChatError, TangoError, TangoResult};
