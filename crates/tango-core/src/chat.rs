//! The chat platform seam.
//!
//! Everything the front end needs from the chat platform is behind
//! [`ChatPort`]: resolve a channel, resolve a message, reply, send. The
//! concrete adapter (Discord REST) lives in the bot crate; tests use
//! in-memory fakes.

use async_trait::async_trait;

use crate::context::{ChannelId, MessageId};
use crate::error::ChatError;

/// Chat platform operations consumed by the front end.
#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Check that a channel still exists and is accessible.
    ///
    /// # Errors
    ///
    /// `ChatError::NotFound` if the channel is gone; other variants for
    /// transport or API failures.
    async fn resolve_channel(&self, channel: ChannelId) -> Result<(), ChatError>;

    /// Check that a message still exists within a channel.
    ///
    /// # Errors
    ///
    /// `ChatError::NotFound` if the message is gone (deleted or
    /// inaccessible); other variants for transport or API failures.
    async fn resolve_message(&self, channel: ChannelId, message: MessageId)
    -> Result<(), ChatError>;

    /// Reply to a specific message, threading the response to it.
    ///
    /// # Errors
    ///
    /// Any `ChatError` on failure; the caller decides whether the
    /// current command survives.
    async fn reply(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> Result<MessageId, ChatError>;

    /// Send a plain message to a channel.
    ///
    /// # Errors
    ///
    /// Any `ChatError` on failure.
    async fn send(&self, channel: ChannelId, text: &str) -> Result<MessageId, ChatError>;
}
