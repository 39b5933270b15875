//! Context resolution for acknowledgment subscribers.
//!
//! A context is only a set of identifiers; before replying, the channel
//! and message behind it must still exist. Resolution failure is a
//! normal outcome (the user deleted the message, the bot lost access)
//! and suppresses output entirely.

use tango_core::{ChannelId, ChatPort, MessageContext, MessageId};
use tracing::debug;

/// Resolve a context to a live reply target, or `None` when the channel
/// or message is gone. Callers treat `None` as "say nothing".
pub async fn reply_target(
    chat: &dyn ChatPort,
    ctx: &MessageContext,
) -> Option<(ChannelId, MessageId)> {
    if let Err(e) = chat.resolve_channel(ctx.channel()).await {
        debug!(channel = %ctx.channel(), error = %e, "Reply channel unresolvable");
        return None;
    }
    if let Err(e) = chat.resolve_message(ctx.channel(), ctx.message()).await {
        debug!(
            channel = %ctx.channel(),
            message = %ctx.message(),
            error = %e,
            "Reply message unresolvable"
        );
        return None;
    }
    Some((ctx.channel(), ctx.message()))
}
