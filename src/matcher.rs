//! Match and fan-out engine.
//!
//! Scans every subscriber's keyword set against an incoming post and, for
//! each matching pair, forwards the post and sends a formatted alert.
//! Matching is case-insensitive literal substring containment; two keywords
//! of the same subscriber matching the same post produce two independent
//! notifications.

use crate::error::Result;
use crate::store::SubscriptionStore;
use crate::transport::{SendOptions, Transport};
use crate::types::{ChannelPost, ChannelRef, SubscriberId};
use tracing::{info, warn};

/// Keyword with a dedicated alert wording.
const SHOPEE_COUPON: &str = "cupom shopee";

/// Notify every subscriber whose keywords match `post`.
///
/// Returns the number of (subscriber, keyword) deliveries attempted. A
/// delivery failure is logged and does not stop the scan; the remaining
/// subscribers and keywords are still processed.
pub fn match_and_notify<T: Transport>(
    post: &ChannelPost,
    store: &SubscriptionStore,
    transport: &T,
    channel: &ChannelRef,
) -> usize {
    let haystack = post.search_text().to_lowercase();
    let link = channel.deep_link(post.message_id);
    let mut attempted = 0;

    for (subscriber, keywords) in store.iter() {
        for keyword in keywords {
            if !haystack.contains(keyword.as_str()) {
                continue;
            }
            attempted += 1;
            info!("keyword '{}' matched for {}, notifying", keyword, subscriber);
            if let Err(e) = notify(transport, subscriber, post, keyword, &link) {
                warn!("failed to notify {} for '{}': {}", subscriber, keyword, e);
            }
        }
    }

    attempted
}

/// Forward the original post, then send the alert with the deep link.
fn notify<T: Transport>(
    transport: &T,
    subscriber: SubscriberId,
    post: &ChannelPost,
    keyword: &str,
    link: &str,
) -> Result<()> {
    transport.forward_message(subscriber, post.source, post.message_id)?;
    transport.send_message(
        subscriber,
        &alert_text(keyword, link),
        SendOptions::markdown_with_preview(),
    )
}

fn alert_text(keyword: &str, link: &str) -> String {
    if keyword == SHOPEE_COUPON {
        format!("📢 Encontrei uma postagem com a palavra-chave cupom shopee:\n\n{link}")
    } else {
        format!("📢 Encontrei uma postagem com a palavra-chave *{keyword}:*\n\n{link}")
    }
}
