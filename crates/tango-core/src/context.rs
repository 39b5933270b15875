//! Message context: the identifiers needed to locate where a reply goes.
//!
//! A [`MessageContext`] is created once when a user command fires, copied
//! verbatim into the outbound request under the reserved `ctx` key, and
//! returned inside every acknowledgment. The wire shape is nested
//! (`ctx.channel.id`, `ctx.message.id`, `ctx.author.id`, optional
//! `ctx.guild.id`) because the backend addresses each identifier through
//! its owning entity.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(
    /// Channel (location) identifier.
    ChannelId
);
id_newtype!(
    /// Message identifier.
    MessageId
);
id_newtype!(
    /// User (author) identifier.
    UserId
);
id_newtype!(
    /// Guild identifier, present only for guild channels.
    GuildId
);

/// Wire representation of a single identified entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct EntityRef {
    id: u64,
}

/// Nested wire shape of a context payload.
#[derive(Serialize, Deserialize)]
struct WireContext {
    channel: EntityRef,
    message: EntityRef,
    author: EntityRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    guild: Option<EntityRef>,
}

/// Where a message came from: channel + message + author, with an
/// optional guild.
///
/// Immutable once created. A context must remain resolvable to a concrete
/// reply target *at the time of use*; resolution may fail (channel or
/// message deleted), which is a normal, non-fatal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageContext {
    channel: ChannelId,
    message: MessageId,
    author: UserId,
    guild: Option<GuildId>,
}

impl MessageContext {
    /// Create a context for a direct (non-guild) channel.
    #[must_use]
    pub fn new(channel: ChannelId, message: MessageId, author: UserId) -> Self {
        Self {
            channel,
            message,
            author,
            guild: None,
        }
    }

    /// Attach the guild identifier.
    #[must_use]
    pub fn with_guild(mut self, guild: GuildId) -> Self {
        self.guild = Some(guild);
        self
    }

    /// The channel the message was posted in.
    #[must_use]
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// The message that triggered the command or answer.
    #[must_use]
    pub fn message(&self) -> MessageId {
        self.message
    }

    /// The author of the message.
    #[must_use]
    pub fn author(&self) -> UserId {
        self.author
    }

    /// The guild, if the channel belongs to one.
    #[must_use]
    pub fn guild(&self) -> Option<GuildId> {
        self.guild
    }

    /// Session key: two contexts with the same key belong to the same
    /// logical conversation (author in channel).
    #[must_use]
    pub fn session_key(&self) -> (UserId, ChannelId) {
        (self.author, self.channel)
    }

    /// Returns `true` if `other` was produced by the same author in the
    /// same channel. Used by acknowledgment subscribers to decide whether
    /// an event on a shared topic is theirs.
    #[must_use]
    pub fn same_session(&self, other: &Self) -> bool {
        self.session_key() == other.session_key()
    }
}

impl Serialize for MessageContext {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireContext {
            channel: EntityRef {
                id: self.channel.0,
            },
            message: EntityRef {
                id: self.message.0,
            },
            author: EntityRef { id: self.author.0 },
            guild: self.guild.map(|g| EntityRef { id: g.0 }),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MessageContext {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireContext::deserialize(deserializer)?;
        Ok(Self {
            channel: ChannelId(wire.channel.id),
            message: MessageId(wire.message.id),
            author: UserId(wire.author.id),
            guild: wire.guild.map(|g| GuildId(g.id)),
        })
    }
}
