//! Minimal Discord Gateway intake.
//!
//! Maintains one Gateway connection (hello, identify, heartbeat) and
//! turns `MESSAGE_CREATE` dispatches into [`IncomingMessage`]s, each
//! handled on its own task. Reconnects with full-jitter backoff; no
//! session resume, a fresh identify is sent every time.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tango_core::{ChannelId, GuildId, MessageContext, MessageId, UserId};
use tango_link::Backoff;
use tokio::sync::broadcast;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::feed::IncomingMessage;
use crate::handler::{BotState, handle_message};

/// Gateway intents: `GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES |
/// MESSAGE_CONTENT`. Message content is a privileged intent and must be
/// enabled in the developer portal.
pub const INTENTS: u32 = (1 << 0) | (1 << 9) | (1 << 12) | (1 << 15);

mod opcode {
    pub(crate) const DISPATCH: u8 = 0;
    pub(crate) const HEARTBEAT: u8 = 1;
    pub(crate) const IDENTIFY: u8 = 2;
    pub(crate) const RECONNECT: u8 = 7;
    pub(crate) const INVALID_SESSION: u8 = 9;
    pub(crate) const HELLO: u8 = 10;
    pub(crate) const HEARTBEAT_ACK: u8 = 11;
}

/// Raw Gateway frame.
#[derive(Debug, Serialize, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: Option<serde_json::Value>,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HelloPayload {
    heartbeat_interval: u64,
}

#[derive(Debug, Deserialize)]
struct GatewayBotResponse {
    url: String,
}

/// The fields of a `MESSAGE_CREATE` dispatch the front end needs.
#[derive(Debug, Deserialize)]
struct MessageCreate {
    id: String,
    channel_id: String,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    content: String,
    author: Author,
}

#[derive(Debug, Deserialize)]
struct Author {
    id: String,
    #[serde(default)]
    bot: bool,
}

/// Convert a dispatch into an [`IncomingMessage`]. Bot-authored
/// messages (including our own) and malformed snowflakes yield `None`.
fn to_incoming(event: MessageCreate) -> Option<IncomingMessage> {
    if event.author.bot {
        return None;
    }
    let channel = ChannelId(event.channel_id.parse().ok()?);
    let message = MessageId(event.id.parse().ok()?);
    let author = UserId(event.author.id.parse().ok()?);
    let mut context = MessageContext::new(channel, message, author);
    if let Some(guild) = event.guild_id {
        context = context.with_guild(GuildId(guild.parse().ok()?));
    }
    Some(IncomingMessage {
        context,
        text: event.content,
    })
}

fn identify(token: &str) -> GatewayPayload {
    GatewayPayload {
        op: opcode::IDENTIFY,
        d: Some(serde_json::json!({
            "token": token,
            "intents": INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "tango",
                "device": "tango",
            },
        })),
        s: None,
        t: None,
    }
}

fn heartbeat(last_seq: Option<u64>) -> GatewayPayload {
    GatewayPayload {
        op: opcode::HEARTBEAT,
        d: last_seq.map(serde_json::Value::from),
        s: None,
        t: None,
    }
}

/// Run the Gateway intake until shutdown.
///
/// # Errors
///
/// Currently never returns an error; connection failures are retried
/// with backoff indefinitely.
pub async fn run_gateway(
    state: BotState,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let http = reqwest::Client::new();
    let mut backoff = Backoff::new(state.config.backoff_base_ms, state.config.backoff_max_ms);

    loop {
        match connect(&http, &state).await {
            Ok(ws) => {
                info!("Connected to the Discord Gateway");
                backoff.reset();
                if let SessionEnd::Shutdown = session(ws, &state, &mut shutdown).await {
                    return Ok(());
                }
                warn!("Gateway connection lost");
            },
            Err(e) => {
                warn!(error = %e, "Gateway connect failed");
            },
        }

        let delay = backoff.next_delay();
        debug!(delay_ms = delay.as_millis(), "Reconnecting to the Gateway after backoff");
        tokio::select! {
            () = tokio::time::sleep(delay) => {},
            _ = shutdown.recv() => return Ok(()),
        }
    }
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect(http: &reqwest::Client, state: &BotState) -> anyhow::Result<WsStream> {
    let info: GatewayBotResponse = http
        .get(format!("{}/gateway/bot", crate::discord::API_BASE))
        .header("Authorization", format!("Bot {}", state.config.bot_token))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let (ws, _response) = connect_async(format!("{}/?v=10&encoding=json", info.url)).await?;
    Ok(ws)
}

enum SessionEnd {
    Shutdown,
    Disconnected,
}

/// One connection's lifetime: identify after hello, heartbeat on the
/// advertised interval, dispatch messages until the socket drops.
async fn session(
    ws: WsStream,
    state: &BotState,
    shutdown: &mut broadcast::Receiver<()>,
) -> SessionEnd {
    let (mut writer, mut reader) = ws.split();
    let mut last_seq: Option<u64> = None;
    let mut heartbeats: Option<tokio::time::Interval> = None;

    loop {
        tokio::select! {
            () = async {
                match heartbeats.as_mut() {
                    Some(interval) => { interval.tick().await; },
                    None => std::future::pending().await,
                }
            } => {
                if send_payload(&mut writer, &heartbeat(last_seq)).await.is_err() {
                    return SessionEnd::Disconnected;
                }
            },
            frame = reader.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        return SessionEnd::Disconnected;
                    },
                    Some(Ok(_)) => continue,
                };
                let payload: GatewayPayload = match serde_json::from_str(&text) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "Discarding malformed Gateway frame");
                        continue;
                    },
                };
                match payload.op {
                    opcode::HELLO => {
                        let Some(hello) = payload
                            .d
                            .and_then(|d| serde_json::from_value::<HelloPayload>(d).ok())
                        else {
                            return SessionEnd::Disconnected;
                        };
                        heartbeats = Some(tokio::time::interval(Duration::from_millis(
                            hello.heartbeat_interval,
                        )));
                        let identity = identify(&state.config.bot_token);
                        if send_payload(&mut writer, &identity).await.is_err() {
                            return SessionEnd::Disconnected;
                        }
                    },
                    opcode::DISPATCH => {
                        if let Some(s) = payload.s {
                            last_seq = Some(s);
                        }
                        if payload.t.as_deref() == Some("MESSAGE_CREATE") {
                            let event = payload
                                .d
                                .and_then(|d| serde_json::from_value::<MessageCreate>(d).ok());
                            if let Some(incoming) = event.and_then(to_incoming) {
                                let state = state.clone();
                                tokio::spawn(handle_message(state, incoming));
                            }
                        }
                    },
                    opcode::HEARTBEAT => {
                        if send_payload(&mut writer, &heartbeat(last_seq)).await.is_err() {
                            return SessionEnd::Disconnected;
                        }
                    },
                    opcode::RECONNECT | opcode::INVALID_SESSION => {
                        debug!(op = payload.op, "Gateway requested a reconnect");
                        return SessionEnd::Disconnected;
                    },
                    opcode::HEARTBEAT_ACK => {},
                    other => debug!(op = other, "Ignoring Gateway opcode"),
                }
            },
            _ = shutdown.recv() => {
                let _ = writer.send(Message::Close(None)).await;
                return SessionEnd::Shutdown;
            },
        }
    }
}

async fn send_payload<S>(
    writer: &mut futures::stream::SplitSink<tokio_tungstenite::WebSocketStream<S>, Message>,
    payload: &GatewayPayload,
) -> anyhow::Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let json = serde_json::to_string(payload)?;
    writer.send(Message::Text(json.into())).await?;
    Ok(())
}
