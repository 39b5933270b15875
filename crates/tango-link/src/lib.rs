//! Tango Link - the persistent event link to the word-game backend.
//!
//! This crate provides:
//! - Wire types for topic-keyed requests and acknowledgments
//! - The capability gate and the fire-and-forget request emitter
//!   ([`BackendLink`])
//! - The acknowledgment router ([`AckRouter`]): a topic-keyed subscriber
//!   registry plus broadcast-based awaitable subscriptions
//! - The `WebSocket` connection task with full-jitter reconnect
//!
//! # Correlation model
//!
//! Requests and acknowledgments are tied together only through the
//! replicated message context, never through a correlation identifier.
//! Dispatch is by topic name alone: every subscriber registered for a
//! topic sees every event on that topic and must independently decide
//! applicability from the embedded context (author + channel). Two
//! concurrent sessions sharing identical author+channel keys on one
//! topic would therefore cross-talk; callers are expected to prevent
//! that overlap at session start.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod backend;
mod backoff;
mod conn;
mod error;
mod router;
mod wire;

pub use backend::{BackendLink, LinkIo};
pub use backoff::Backoff;
pub use conn::{LinkConfig, run_link};
pub use error::LinkError;
pub use router::{AckHandler, AckRouter, AckSubscription, DEFAULT_CHANNEL_CAPACITY};
pub use wire::{ACK_PREFIX, InboundAck, OutboundRequest, ack_topic};
