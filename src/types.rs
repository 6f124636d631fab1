//! Core types for the relay.

use std::fmt;

/// Private-chat identity of a subscriber.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(pub i64);

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriberId({})", self.0)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a broadcast channel. Broadcast channels carry a negative id
/// on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub i64);

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceId({})", self.0)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-channel sequence id of a post.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position in the inbound event stream.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UpdateId(pub i64);

impl UpdateId {
    pub fn next(self) -> Self {
        UpdateId(self.0 + 1)
    }
}

impl fmt::Debug for UpdateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UpdateId({})", self.0)
    }
}

impl fmt::Display for UpdateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Last acknowledged position in the event stream.
///
/// Unset means "fetch from the current position". The cursor is
/// monotonically non-decreasing: advancing past an id lower than the
/// current position is a no-op.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor(Option<UpdateId>);

impl Cursor {
    /// A cursor with no acknowledged position yet.
    pub fn unset() -> Self {
        Cursor(None)
    }

    /// The next position to fetch from, if any batch has been acknowledged.
    pub fn position(&self) -> Option<UpdateId> {
        self.0
    }

    /// Acknowledge everything up to and including `id`.
    pub fn advance_past(&mut self, id: UpdateId) {
        let next = id.next();
        self.0 = Some(match self.0 {
            Some(current) if current > next => current,
            _ => next,
        });
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "Cursor({})", id),
            None => write!(f, "Cursor(unset)"),
        }
    }
}

/// What kind of chat a message arrived in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Channel,
    Other,
}

/// A message received in a chat.
#[derive(Clone, Debug)]
pub struct ChatMessage {
    /// The chat the message arrived in. For private chats this is the
    /// subscriber's identity.
    pub chat: SubscriberId,
    pub kind: ChatKind,
    pub text: Option<String>,
}

/// A post published in a broadcast channel.
#[derive(Clone, Debug)]
pub struct ChannelPost {
    pub source: SourceId,
    pub message_id: MessageId,
    pub text: Option<String>,
    pub caption: Option<String>,
}

impl ChannelPost {
    /// The text keywords are matched against: text and caption concatenated
    /// with a single space, each defaulting to empty.
    pub fn search_text(&self) -> String {
        format!(
            "{} {}",
            self.text.as_deref().unwrap_or(""),
            self.caption.as_deref().unwrap_or("")
        )
    }
}

/// One event from the inbound stream.
#[derive(Clone, Debug)]
pub struct Update {
    pub id: UpdateId,
    pub payload: UpdatePayload,
}

/// Payload shapes the relay consumes. `Other` covers event kinds the relay
/// ignores; they still advance the cursor.
#[derive(Clone, Debug)]
pub enum UpdatePayload {
    Message(ChatMessage),
    Post(ChannelPost),
    Other,
}

/// Chat id prefix marking a broadcast channel on the wire.
const BROADCAST_ID_OFFSET: i64 = 1_000_000_000_000;

/// The monitored broadcast channel: its id plus the optional public name
/// used to build deep links.
#[derive(Clone, Debug)]
pub struct ChannelRef {
    pub id: SourceId,
    pub public_name: Option<String>,
}

impl ChannelRef {
    /// Deep link to a post. Public channels link through their public name;
    /// without one, the private-channel form is used, with the broadcast
    /// prefix stripped from the id.
    pub fn deep_link(&self, message: MessageId) -> String {
        match &self.public_name {
            Some(name) => format!("https://t.me/{}/{}", name, message),
            None => {
                let raw = self.id.0;
                let internal = if raw <= -BROADCAST_ID_OFFSET {
                    -raw - BROADCAST_ID_OFFSET
                } else {
                    raw.abs()
                };
                format!("https://t.me/c/{}/{}", internal, message)
            }
        }
    }
}
