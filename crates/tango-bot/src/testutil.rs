//! In-memory fakes and wiring helpers shared by the crate's tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tango_core::{ChannelId, ChatError, ChatPort, MessageId};
use tango_link::{AckRouter, BackendLink, LinkIo};

use crate::config::BotConfig;
use crate::feed::MessageFeed;
use crate::handler::BotState;
use crate::jisho::JishoClient;
use crate::shiritori::GameRegistry;

/// Fake chat platform: every channel and message exists unless
/// explicitly forgotten; replies and sends are recorded.
pub(crate) struct FakeChat {
    gone_channels: Mutex<HashSet<ChannelId>>,
    gone_messages: Mutex<HashSet<MessageId>>,
    replies: Mutex<Vec<(ChannelId, MessageId, String)>>,
    sends: Mutex<Vec<(ChannelId, String)>>,
    next_id: AtomicU64,
}

impl FakeChat {
    pub(crate) fn new() -> Self {
        Self {
            gone_channels: Mutex::new(HashSet::new()),
            gone_messages: Mutex::new(HashSet::new()),
            replies: Mutex::new(Vec::new()),
            sends: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1000),
        }
    }

    pub(crate) fn forget_channel(&self, channel: ChannelId) {
        self.gone_channels.lock().unwrap().insert(channel);
    }

    pub(crate) fn forget_message(&self, message: MessageId) {
        self.gone_messages.lock().unwrap().insert(message);
    }

    pub(crate) fn replies(&self) -> Vec<(ChannelId, MessageId, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub(crate) fn reply_texts(&self) -> Vec<String> {
        self.replies().into_iter().map(|(_, _, text)| text).collect()
    }

    pub(crate) fn sends(&self) -> Vec<(ChannelId, String)> {
        self.sends.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPort for FakeChat {
    async fn resolve_channel(&self, channel: ChannelId) -> Result<(), ChatError> {
        if self.gone_channels.lock().unwrap().contains(&channel) {
            return Err(ChatError::NotFound("channel"));
        }
        Ok(())
    }

    async fn resolve_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), ChatError> {
        if self.gone_channels.lock().unwrap().contains(&channel) {
            return Err(ChatError::NotFound("channel"));
        }
        if self.gone_messages.lock().unwrap().contains(&message) {
            return Err(ChatError::NotFound("message"));
        }
        Ok(())
    }

    async fn reply(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> Result<MessageId, ChatError> {
        self.replies
            .lock()
            .unwrap()
            .push((channel, message, text.to_string()));
        Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn send(&self, channel: ChannelId, text: &str) -> Result<MessageId, ChatError> {
        self.sends.lock().unwrap().push((channel, text.to_string()));
        Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}

pub(crate) fn test_config() -> BotConfig {
    let mut config = BotConfig::from_toml("").unwrap();
    config.bot_token = "test-token".to_string();
    config
}

/// Full bot state wired against fakes. The returned `LinkIo` gives the
/// test the connection task's side of the link: flip the connected flag
/// with `set_connected` and read emitted frames with `recv`.
pub(crate) fn test_state() -> (BotState, LinkIo, Arc<FakeChat>) {
    let (link, io) = BackendLink::new();
    let chat = Arc::new(FakeChat::new());
    let state = BotState {
        chat: chat.clone(),
        link,
        router: AckRouter::new(),
        feed: MessageFeed::new(),
        games: GameRegistry::new(),
        jisho: JishoClient::new(),
        config: Arc::new(test_config()),
    };
    (state, io, chat)
}
