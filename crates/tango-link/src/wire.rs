//! Wire types for the backend event protocol.
//!
//! Frames are JSON text messages of the shape `{"t": topic, "d":
//! payload}`. A request's payload carries the originating context under
//! the reserved `ctx` key; the backend echoes it (or a refreshed one)
//! inside the acknowledgment payload.

use serde::{Deserialize, Serialize};
use tango_core::MessageContext;

/// Prefix applied to a request topic to form its acknowledgment topic.
pub const ACK_PREFIX: &str = "ack_";

/// Reserved payload key under which the context travels.
pub(crate) const CTX_KEY: &str = "ctx";

/// The acknowledgment topic for a request topic.
#[must_use]
pub fn ack_topic(topic: &str) -> String {
    format!("{ACK_PREFIX}{topic}")
}

/// A request frame pushed onto the outbound channel. Immutable once
/// sent; one request corresponds to exactly one logical turn of backend
/// work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    /// Topic name routing the request.
    #[serde(rename = "t")]
    pub topic: String,
    /// Command fields merged with the context under `ctx`.
    #[serde(rename = "d")]
    pub payload: serde_json::Value,
}

/// An acknowledgment frame received from the backend.
///
/// Zero or more may arrive per request (practically exactly one); arrival
/// order across different topics is not guaranteed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundAck {
    /// Topic name, `ack_` + the original request topic.
    #[serde(rename = "t")]
    pub topic: String,
    /// Original context plus topic-specific result fields.
    #[serde(rename = "d")]
    pub payload: serde_json::Value,
}

impl InboundAck {
    /// Extract the embedded context, if present and well-formed.
    #[must_use]
    pub fn context(&self) -> Option<MessageContext> {
        let ctx = self.payload.get(CTX_KEY)?;
        serde_json::from_value(ctx.clone()).ok()
    }
}
