//! Transport boundary consumed by the relay core.
//!
//! The core only talks to the messaging platform through the [`Transport`]
//! trait: fetch a batch of updates, forward a post, send a text message.
//! [`http::HttpTransport`] implements it against the Bot API; tests
//! substitute recording fakes.

pub mod http;

use crate::error::Result;
use crate::types::{Cursor, MessageId, SourceId, SubscriberId, Update};
use std::time::Duration;

/// Formatting applied to an outgoing message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseMode {
    Plain,
    Markdown,
}

/// Delivery options for an outgoing message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendOptions {
    pub parse_mode: ParseMode,
    /// Whether the platform may render a preview for links in the text.
    pub link_preview: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            parse_mode: ParseMode::Plain,
            link_preview: false,
        }
    }
}

impl SendOptions {
    /// Markdown formatting, no link preview.
    pub fn markdown() -> Self {
        Self {
            parse_mode: ParseMode::Markdown,
            link_preview: false,
        }
    }

    /// Markdown formatting with link preview enabled.
    pub fn markdown_with_preview() -> Self {
        Self {
            parse_mode: ParseMode::Markdown,
            link_preview: true,
        }
    }
}

/// Capability set the core consumes; supplied externally.
pub trait Transport {
    /// Fetch the next batch of updates after `cursor`, blocking for up to
    /// `timeout` when none are pending. An empty batch on timeout is not an
    /// error.
    fn fetch_updates(&self, cursor: Cursor, timeout: Duration) -> Result<Vec<Update>>;

    /// Forward an existing post to a recipient, preserving its original
    /// content and formatting.
    fn forward_message(&self, to: SubscriberId, from: SourceId, message: MessageId) -> Result<()>;

    /// Send a text message to a recipient.
    fn send_message(&self, to: SubscriberId, text: &str, options: SendOptions) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn fetch_updates(&self, cursor: Cursor, timeout: Duration) -> Result<Vec<Update>> {
        (**self).fetch_updates(cursor, timeout)
    }

    fn forward_message(&self, to: SubscriberId, from: SourceId, message: MessageId) -> Result<()> {
        (**self).forward_message(to, from, message)
    }

    fn send_message(&self, to: SubscriberId, text: &str, options: SendOptions) -> Result<()> {
        (**self).send_message(to, text, options)
    }
}
