//! The backend `WebSocket` connection task.
//!
//! Owns the socket for the lifetime of the process: connects, flips the
//! link's connected flag, pumps outbound requests into the sink and
//! inbound acknowledgment frames into the router, and reconnects with
//! full-jitter backoff when the connection drops. Requests emitted while
//! the socket is down are lost with the connection (at-most-once send);
//! the capability gate keeps new commands from starting in that window.

use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::backend::LinkIo;
use crate::backoff::Backoff;
use crate::error::LinkError;
use crate::router::AckRouter;
use crate::wire::{InboundAck, OutboundRequest};

/// Configuration for the connection task.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Backend `WebSocket` URL (`ws://` or `wss://`).
    pub url: String,
    /// Base delay for exponential backoff (milliseconds).
    pub backoff_base_ms: u64,
    /// Maximum backoff delay (milliseconds).
    pub backoff_max_ms: u64,
}

impl LinkConfig {
    /// Create a config with default backoff parameters.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backoff_base_ms: 1000,
            backoff_max_ms: 60_000,
        }
    }
}

/// Run the connection task until shutdown.
///
/// Returns `Ok(())` on shutdown or when every [`BackendLink`] clone has
/// been dropped.
///
/// # Errors
///
/// Currently never returns an error; connection failures are retried
/// with backoff indefinitely. The `Result` return keeps the signature
/// stable should fatal close codes be added.
///
/// [`BackendLink`]: crate::BackendLink
pub async fn run_link(
    config: LinkConfig,
    mut io: LinkIo,
    router: AckRouter,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), LinkError> {
    let mut backoff = Backoff::new(config.backoff_base_ms, config.backoff_max_ms);

    loop {
        match connect_async(config.url.as_str()).await {
            Ok((ws, _response)) => {
                info!(url = %config.url, "Connected to backend");
                backoff.reset();
                io.set_connected(true);

                let result = pump(ws, &mut io, &router, &mut shutdown).await;

                io.set_connected(false);
                match result {
                    PumpEnd::Shutdown => return Ok(()),
                    PumpEnd::LinkDropped => return Ok(()),
                    PumpEnd::Disconnected(reason) => {
                        warn!(reason = %reason, "Backend connection lost");
                    },
                }
            },
            Err(e) => {
                warn!(url = %config.url, error = %e, "Backend connect failed");
            },
        }

        let delay = backoff.next_delay();
        debug!(delay_ms = delay.as_millis(), "Reconnecting after backoff");
        tokio::select! {
            () = tokio::time::sleep(delay) => {},
            _ = shutdown.recv() => return Ok(()),
        }
    }
}

/// Why the pump loop ended.
enum PumpEnd {
    Shutdown,
    LinkDropped,
    Disconnected(String),
}

/// Pump frames in both directions until the connection drops.
async fn pump<S>(
    ws: tokio_tungstenite::WebSocketStream<S>,
    io: &mut LinkIo,
    router: &AckRouter,
    shutdown: &mut broadcast::Receiver<()>,
) -> PumpEnd
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut writer, mut reader) = ws.split();

    loop {
        tokio::select! {
            request = io.outbound.recv() => {
                let Some(request) = request else {
                    // All link handles dropped; nothing left to send.
                    return PumpEnd::LinkDropped;
                };
                match send_request(&mut writer, &request).await {
                    Ok(()) => {},
                    Err(e) => return PumpEnd::Disconnected(e.to_string()),
                }
            },
            frame = reader.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<InboundAck>(&text) {
                            Ok(ack) => router.dispatch(ack).await,
                            Err(e) => {
                                warn!(error = %e, "Discarding malformed backend frame");
                            },
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.as_ref().map_or(1000u16, |f| f.code.into());
                        return PumpEnd::Disconnected(LinkError::Closed(code).to_string());
                    },
                    Some(Ok(
                        Message::Ping(_) | Message::Pong(_) | Message::Binary(_)
                        | Message::Frame(_),
                    )) => {
                        // Ping/pong handled by tungstenite; binary skipped.
                    },
                    Some(Err(e)) => return PumpEnd::Disconnected(e.to_string()),
                    None => return PumpEnd::Disconnected("stream ended".to_string()),
                }
            },
            _ = shutdown.recv() => {
                let _ = writer.send(Message::Close(None)).await;
                return PumpEnd::Shutdown;
            },
        }
    }
}

/// Serialize and send one request frame.
async fn send_request<S>(
    writer: &mut futures::stream::SplitSink<tokio_tungstenite::WebSocketStream<S>, Message>,
    request: &OutboundRequest,
) -> Result<(), LinkError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let json = serde_json::to_string(request)?;
    writer.send(Message::Text(json.into())).await?;
    Ok(())
}
