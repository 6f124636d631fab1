//! # Keyword Alert Relay
//!
//! Relays posts from a single monitored broadcast channel to subscribers
//! based on per-subscriber keyword subscriptions. Subscribers manage their
//! keywords over a private-chat command protocol; each incoming post is
//! scanned against every subscription and matching subscribers receive the
//! forwarded post plus a formatted alert.
//!
//! ## Core Concepts
//!
//! - **Subscription Store**: the subscriber to keyword-set mapping and its
//!   durable JSON snapshot
//! - **Command Dispatcher**: translates private-chat commands into store
//!   operations and replies
//! - **Match & Fan-out Engine**: case-insensitive substring matching and
//!   per-subscriber notification with failure isolation
//! - **Update Cursor Loop**: fetches event batches, routes them, advances
//!   the cursor only after full dispatch (at-least-once delivery)
//!
//! ## Example
//!
//! ```ignore
//! use keyword_relay::{BotConfig, HttpTransport, Poller, PollerOptions, SubscriptionStore};
//!
//! let config = BotConfig::load(".telegram_bot_secret")?;
//! let store = SubscriptionStore::open("dados_palavras.json")?;
//! let options = PollerOptions::default();
//! let transport = HttpTransport::new(&config.token, options.fetch_timeout)?;
//!
//! let mut poller = Poller::with_options(transport, store, config.channel, options);
//! poller.run();
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod matcher;
pub mod poller;
pub mod store;
pub mod transport;
pub mod types;

// Re-exports
pub use commands::{Command, BOT_VERSION};
pub use config::{BotConfig, DEFAULT_SECRETS_PATH};
pub use error::{RelayError, Result};
pub use matcher::match_and_notify;
pub use poller::{Poller, PollerOptions};
pub use store::SubscriptionStore;
pub use transport::{http::HttpTransport, ParseMode, SendOptions, Transport};
pub use types::*;
