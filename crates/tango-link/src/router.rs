//! Acknowledgment router: topic-keyed dispatch of inbound events.
//!
//! Two subscription forms are offered:
//!
//! 1. **Registered handlers**: implementations of [`AckHandler`] bound to
//!    a topic at registration. Every handler on a topic is invoked for
//!    every event on that topic; a failing handler cannot prevent its
//!    peers from running.
//!
//! 2. **Awaitable subscriptions**: [`AckSubscription`] receivers over a
//!    broadcast channel, filtered by topic, for tasks (the game loop)
//!    that need to suspend until the next relevant acknowledgment.
//!
//! There is no correlation identifier. Subscribers filter by the context
//! embedded in the payload.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, trace, warn};

use crate::wire::InboundAck;

/// Default broadcast capacity for awaitable subscriptions.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// A subscriber invoked for every acknowledgment on its topic.
///
/// Implementations must re-resolve the embedded context themselves and
/// return without error when the event is not theirs or the reply target
/// can no longer be resolved.
#[async_trait]
pub trait AckHandler: Send + Sync {
    /// Handle one acknowledgment.
    ///
    /// # Errors
    ///
    /// Errors are logged by the router and never propagated to other
    /// subscribers.
    async fn on_ack(&self, ack: &InboundAck) -> anyhow::Result<()>;
}

/// Topic-keyed acknowledgment router.
///
/// Cloning is cheap; all clones share the registry and the broadcast
/// channel.
pub struct AckRouter {
    handlers: Arc<RwLock<HashMap<String, Vec<Arc<dyn AckHandler>>>>>,
    broadcast: broadcast::Sender<Arc<InboundAck>>,
}

impl AckRouter {
    /// Create a router with the default broadcast capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a router with an explicit broadcast capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            broadcast: tx,
        }
    }

    /// Register a handler for a topic. Handlers on the same topic form an
    /// unordered set; all of them fire for every event on the topic.
    pub async fn register(&self, topic: impl Into<String>, handler: Arc<dyn AckHandler>) {
        let topic = topic.into();
        let mut guard = self.handlers.write().await;
        guard.entry(topic).or_default().push(handler);
    }

    /// Subscribe to future acknowledgments on one topic.
    #[must_use]
    pub fn subscribe(&self, topic: impl Into<String>) -> AckSubscription {
        AckSubscription {
            receiver: self.broadcast.subscribe(),
            topic: topic.into(),
        }
    }

    /// Dispatch one inbound acknowledgment.
    ///
    /// Broadcasts to awaitable subscribers, then invokes every registered
    /// handler for the topic on its own task so failures stay isolated
    /// per subscriber. Unknown topics are a no-op.
    pub async fn dispatch(&self, ack: InboundAck) {
        let ack = Arc::new(ack);
        trace!(topic = %ack.topic, "Dispatching acknowledgment");

        // Awaitable subscribers first so loops resume without waiting on
        // handler scheduling. No receivers is fine.
        let _ = self.broadcast.send(Arc::clone(&ack));

        let handlers = {
            let guard = self.handlers.read().await;
            guard.get(&ack.topic).cloned().unwrap_or_default()
        };
        if handlers.is_empty() {
            debug!(topic = %ack.topic, "No registered handlers for topic");
        }
        for handler in handlers {
            let ack = Arc::clone(&ack);
            tokio::spawn(async move {
                if let Err(e) = handler.on_ack(&ack).await {
                    warn!(topic = %ack.topic, error = %e, "Ack handler failed");
                }
            });
        }
    }

    /// Number of handlers registered for a topic.
    #[must_use]
    pub async fn handler_count(&self, topic: &str) -> usize {
        self.handlers
            .read()
            .await
            .get(topic)
            .map_or(0, Vec::len)
    }
}

impl Default for AckRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for AckRouter {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
            broadcast: self.broadcast.clone(),
        }
    }
}

/// A topic-filtered receiver of acknowledgments.
pub struct AckSubscription {
    receiver: broadcast::Receiver<Arc<InboundAck>>,
    topic: String,
}

impl AckSubscription {
    /// Receive the next acknowledgment on this subscription's topic.
    ///
    /// Returns `None` when the router is gone. Lagged events are dropped
    /// with a warning and reception continues.
    pub async fn recv(&mut self) -> Option<Arc<InboundAck>> {
        loop {
            match self.receiver.recv().await {
                Ok(ack) => {
                    if ack.topic == self.topic {
                        return Some(ack);
                    }
                },
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Ack receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
