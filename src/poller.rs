//! Update cursor loop driving the relay.
//!
//! One iteration fetches a batch of updates, routes private messages to the
//! command dispatcher and channel posts to the matcher, then advances the
//! cursor past the batch. Execution is strictly sequential: a batch is
//! fully dispatched before the next fetch begins.

use crate::commands;
use crate::error::Result;
use crate::matcher;
use crate::store::SubscriptionStore;
use crate::transport::Transport;
use crate::types::{ChannelRef, Cursor, Update, UpdatePayload};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

/// Tuning knobs for the polling loop.
#[derive(Clone, Debug)]
pub struct PollerOptions {
    /// Long-poll timeout handed to the transport on each fetch.
    pub fetch_timeout: Duration,

    /// Fixed delay before retrying after a fetch failure.
    pub backoff: Duration,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            backoff: Duration::from_secs(5),
        }
    }
}

/// The polling loop. Sole owner of the cursor; sole driver of the
/// dispatcher and the matcher.
pub struct Poller<T: Transport> {
    transport: T,
    store: SubscriptionStore,
    channel: ChannelRef,
    options: PollerOptions,
    cursor: Cursor,
}

impl<T: Transport> Poller<T> {
    pub fn new(transport: T, store: SubscriptionStore, channel: ChannelRef) -> Self {
        Self::with_options(transport, store, channel, PollerOptions::default())
    }

    pub fn with_options(
        transport: T,
        store: SubscriptionStore,
        channel: ChannelRef,
        options: PollerOptions,
    ) -> Self {
        Self {
            transport,
            store,
            channel,
            options,
            cursor: Cursor::unset(),
        }
    }

    /// Current cursor position.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Read access to the subscription store.
    pub fn store(&self) -> &SubscriptionStore {
        &self.store
    }

    /// Fetch one batch and dispatch every update in it. The cursor advances
    /// to one past the batch's highest id only after the whole batch has
    /// been dispatched, so a crash mid-batch re-fetches it on restart:
    /// delivery is at-least-once. Returns the number of updates handled.
    pub fn poll_once(&mut self) -> Result<usize> {
        let updates = self
            .transport
            .fetch_updates(self.cursor, self.options.fetch_timeout)?;

        let count = updates.len();
        let max_id = updates.iter().map(|u| u.id).max();

        for update in updates {
            self.dispatch(update);
        }

        if let Some(id) = max_id {
            self.cursor.advance_past(id);
        }

        Ok(count)
    }

    fn dispatch(&mut self, update: Update) {
        match update.payload {
            UpdatePayload::Message(message) => {
                commands::dispatch(&message, &mut self.store, &self.transport);
            }
            UpdatePayload::Post(post) => {
                if post.source != self.channel.id {
                    debug!("ignoring post from unmonitored source {}", post.source);
                    return;
                }
                let preview: String = post.search_text().chars().take(120).collect();
                info!("new post {} in channel {}: {}", post.message_id, post.source, preview);
                matcher::match_and_notify(&post, &self.store, &self.transport, &self.channel);
            }
            UpdatePayload::Other => {}
        }
    }

    /// Run until the process is killed. A fetch failure is logged, followed
    /// by a fixed backoff and a retry; nothing that happens after startup
    /// terminates the loop.
    pub fn run(&mut self) {
        info!("polling loop started for channel {}", self.channel.id);
        loop {
            match self.poll_once() {
                Ok(0) => {}
                Ok(count) => debug!("dispatched {} update(s)", count),
                Err(e) => {
                    error!("fetch failed: {}", e);
                    thread::sleep(self.options.backoff);
                }
            }
        }
    }
}
