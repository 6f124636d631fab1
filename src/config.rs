//! Startup configuration loaded from a secrets file.

use crate::error::{RelayError, Result};
use crate::types::{ChannelRef, SourceId};
use std::fs;
use std::path::Path;

/// Default location of the secrets file.
pub const DEFAULT_SECRETS_PATH: &str = ".telegram_bot_secret";

const KEY_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
const KEY_CHANNEL_ID: &str = "TELEGRAM_CHANNEL_ID";
const KEY_CHANNEL_USERNAME: &str = "TELEGRAM_CHANNEL_USERNAME";

/// Bot configuration.
///
/// Loaded once at startup. Any missing or malformed required value is fatal:
/// the process must not start the polling loop without a token and a
/// monitored channel id.
#[derive(Clone, Debug)]
pub struct BotConfig {
    /// API token for the transport.
    pub token: String,

    /// The monitored broadcast channel.
    pub channel: ChannelRef,
}

impl BotConfig {
    /// Load configuration from a line-oriented `KEY=VALUE` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("cannot read secrets file {}: {}", path.display(), e))
        })?;
        Self::parse(&contents)
    }

    /// Parse secrets file contents. Blank lines and lines without `=` are
    /// ignored; keys and values are trimmed; a repeated key keeps its last
    /// value.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut token = None;
        let mut channel_id = None;
        let mut channel_username = None;

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                KEY_TOKEN => token = Some(value.to_string()),
                KEY_CHANNEL_ID => channel_id = Some(value.to_string()),
                KEY_CHANNEL_USERNAME => channel_username = Some(value.to_string()),
                _ => {}
            }
        }

        let token = token.filter(|t| !t.is_empty()).ok_or_else(|| {
            RelayError::Config(format!("{} is not set in the secrets file", KEY_TOKEN))
        })?;

        let channel_id = channel_id.filter(|c| !c.is_empty()).ok_or_else(|| {
            RelayError::Config(format!("{} is not set in the secrets file", KEY_CHANNEL_ID))
        })?;

        let channel_id: i64 = channel_id.parse().map_err(|_| {
            RelayError::Config(format!(
                "{} must be a valid integer (ex: -1001936843102), got {:?}",
                KEY_CHANNEL_ID, channel_id
            ))
        })?;

        Ok(Self {
            token,
            channel: ChannelRef {
                id: SourceId(channel_id),
                public_name: channel_username.filter(|u| !u.is_empty()),
            },
        })
    }
}
