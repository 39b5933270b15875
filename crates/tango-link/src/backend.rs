//! The capability gate and the request emitter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Map, Value};
use tango_core::MessageContext;
use tokio::sync::mpsc;

use crate::error::LinkError;
use crate::wire::{CTX_KEY, OutboundRequest};

/// Handle to the backend link shared by all command handlers.
///
/// Cloning is cheap; all clones share the outbound channel and the
/// connected flag maintained by the connection task.
#[derive(Clone)]
pub struct BackendLink {
    outbound: mpsc::UnboundedSender<OutboundRequest>,
    connected: Arc<AtomicBool>,
}

/// The receiving side of the link, consumed by the connection task.
pub struct LinkIo {
    pub(crate) outbound: mpsc::UnboundedReceiver<OutboundRequest>,
    pub(crate) connected: Arc<AtomicBool>,
}

impl LinkIo {
    /// Flip the shared connected flag. Called by whatever owns the
    /// transport when the connection is established or lost.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Receive the next outbound request. `None` when every
    /// [`BackendLink`] clone has been dropped.
    pub async fn recv(&mut self) -> Option<OutboundRequest> {
        self.outbound.recv().await
    }
}

impl BackendLink {
    /// Create a link and the I/O half for the connection task.
    #[must_use]
    pub fn new() -> (Self, LinkIo) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        (
            Self {
                outbound: tx,
                connected: Arc::clone(&connected),
            },
            LinkIo {
                outbound: rx,
                connected,
            },
        )
    }

    /// Whether the backend connection capability is currently present.
    ///
    /// Re-reads the shared flag on every call; never cached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Capability gate: fail fast before any request is constructed.
    ///
    /// # Errors
    ///
    /// `LinkError::BackendUnavailable` when the connection is absent. No
    /// side effect is performed in that case.
    pub fn require_connected(&self) -> Result<(), LinkError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(LinkError::BackendUnavailable)
        }
    }

    /// Build a request payload by merging `fields` with the context under
    /// the reserved `ctx` key and push it onto the outbound channel.
    ///
    /// Non-blocking and fire-and-forget: no acknowledgment is awaited,
    /// and a transport failure is fatal to the current command, never
    /// retried.
    ///
    /// # Errors
    ///
    /// `LinkError::Protocol` if `fields` is not a JSON object,
    /// `LinkError::ChannelClosed` if the connection task has gone away.
    pub fn emit(
        &self,
        topic: &str,
        ctx: &MessageContext,
        fields: Value,
    ) -> Result<(), LinkError> {
        let mut payload = match fields {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                return Err(LinkError::Protocol(
                    "request fields must be a JSON object".to_string(),
                ));
            },
        };
        payload.insert(CTX_KEY.to_string(), serde_json::to_value(ctx)?);

        self.outbound
            .send(OutboundRequest {
                topic: topic.to_string(),
                payload: Value::Object(payload),
            })
            .map_err(|_| LinkError::ChannelClosed)
    }
}
