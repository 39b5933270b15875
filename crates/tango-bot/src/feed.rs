//! The inbound message feed.
//!
//! Every chat message the Gateway delivers is published here before any
//! command parsing, so an active game session can observe the author's
//! answers in its channel. Subscribers filter by session (author +
//! channel) and skip messages prefixed with the escape marker.

use std::sync::Arc;
use std::time::Duration;

use tango_core::{MessageContext, text};
use tokio::sync::broadcast;
use tracing::warn;

/// Default feed capacity; a slow game loop lags rather than blocking
/// the Gateway.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// One chat message as seen by the front end.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Where the message came from.
    pub context: MessageContext,
    /// Raw message text.
    pub text: String,
}

/// Broadcast fan-out of incoming messages. Cloning is cheap.
#[derive(Clone)]
pub struct MessageFeed {
    tx: broadcast::Sender<Arc<IncomingMessage>>,
}

impl MessageFeed {
    /// Create a feed with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Create a feed with an explicit capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish one message to all current subscribers. A feed with no
    /// subscribers silently drops the message.
    pub fn publish(&self, message: IncomingMessage) {
        let _ = self.tx.send(Arc::new(message));
    }

    /// Subscribe to messages published from this point on.
    #[must_use]
    pub fn subscribe(&self) -> FeedSubscription {
        FeedSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for MessageFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A receiver over the feed, held for the lifetime of a game session so
/// no answer between turns is missed.
pub struct FeedSubscription {
    rx: broadcast::Receiver<Arc<IncomingMessage>>,
}

impl FeedSubscription {
    /// Wait up to `limit` for the next answer in `session`: a message
    /// from the same author in the same channel whose text is not
    /// escape-prefixed. `None` on timeout.
    pub async fn next_answer(
        &mut self,
        session: &MessageContext,
        limit: Duration,
    ) -> Option<Arc<IncomingMessage>> {
        tokio::time::timeout(limit, async {
            loop {
                match self.rx.recv().await {
                    Ok(message) => {
                        if message.context.same_session(session) && text::is_game_answer(&message.text)
                        {
                            return Some(message);
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        warn!(skipped = count, "Message feed receiver lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .await
        .ok()
        .flatten()
    }
}
