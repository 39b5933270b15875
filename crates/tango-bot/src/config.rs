//! Bot configuration: `tango.toml` plus environment overrides.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tango_core::{GuildId, TangoError, TangoResult};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tango.toml";

/// Runtime configuration for the bot binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Discord bot token. Required; usually supplied via
    /// `TANGO_BOT_TOKEN` rather than the config file.
    #[serde(default)]
    pub bot_token: String,
    /// `WebSocket` URL of the word-game backend.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Prefix that marks a message as a command.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Guilds the bot responds in. Empty means all guilds.
    #[serde(default)]
    pub allowed_guilds: Vec<u64>,
    /// Base reconnect delay for both the backend link and the Gateway.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Reconnect delay cap.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_backend_url() -> String {
    "ws://127.0.0.1:8765".to_string()
}

fn default_command_prefix() -> String {
    "t!".to_string()
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

impl BotConfig {
    /// Load configuration from a file (or `tango.toml` if present),
    /// apply environment overrides, and validate.
    ///
    /// # Errors
    ///
    /// `TangoError::Config` on unreadable or malformed TOML, or when
    /// validation fails.
    pub fn load(path: Option<&Path>) -> TangoResult<Self> {
        let raw = match path {
            Some(p) => fs::read_to_string(p)
                .map_err(|e| TangoError::Config(format!("cannot read {}: {e}", p.display())))?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    fs::read_to_string(default)
                        .map_err(|e| TangoError::Config(format!("cannot read tango.toml: {e}")))?
                } else {
                    String::new()
                }
            },
        };
        let mut config = Self::from_toml(&raw)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document into an unvalidated config.
    ///
    /// # Errors
    ///
    /// `TangoError::Config` on malformed TOML or unknown keys.
    pub fn from_toml(raw: &str) -> TangoResult<Self> {
        toml::from_str(raw).map_err(|e| TangoError::Config(e.to_string()))
    }

    /// Apply environment overrides via the given lookup. Split out from
    /// `load` so tests do not have to mutate the process environment.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(token) = get("TANGO_BOT_TOKEN") {
            self.bot_token = token;
        }
        if let Some(url) = get("TANGO_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(prefix) = get("TANGO_COMMAND_PREFIX") {
            self.command_prefix = prefix;
        }
    }

    /// Validate the assembled configuration.
    ///
    /// # Errors
    ///
    /// `TangoError::Config` naming the offending field.
    pub fn validate(&self) -> TangoResult<()> {
        if self.bot_token.is_empty() {
            return Err(TangoError::Config(
                "bot_token is required (set TANGO_BOT_TOKEN)".to_string(),
            ));
        }
        if !self.backend_url.starts_with("ws://") && !self.backend_url.starts_with("wss://") {
            return Err(TangoError::Config(format!(
                "backend_url must be a ws:// or wss:// URL, got {}",
                self.backend_url
            )));
        }
        if self.command_prefix.is_empty() {
            return Err(TangoError::Config("command_prefix must not be empty".to_string()));
        }
        Ok(())
    }

    /// Whether the bot responds to messages from this guild. Direct
    /// messages (no guild) are always allowed; the allowlist scopes
    /// guilds only.
    #[must_use]
    pub fn is_guild_allowed(&self, guild: Option<GuildId>) -> bool {
        match guild {
            None => true,
            Some(g) => self.allowed_guilds.is_empty() || self.allowed_guilds.contains(&g.0),
        }
    }
}
