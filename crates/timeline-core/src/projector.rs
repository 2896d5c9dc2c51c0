use std::{cmp::Ordering, sync::Arc};

use crate::{timeline::MessageStore, types::Message};

/// Total order over two messages, fixed when the reducer is built.
pub type MessageComparator = Arc<dyn Fn(&Message, &Message) -> Ordering + Send + Sync>;

/// Produce a fresh ordered copy of the store's messages.
///
/// Without a comparator the hash map's iteration order is returned, which is unstable
/// between calls and across processes. The store itself never keeps an order.
pub fn project(store: &MessageStore, comparator: Option<&MessageComparator>) -> Vec<Message> {
    let mut messages: Vec<Message> = store.values().cloned().collect();
    if let Some(comparator) = comparator {
        messages.sort_by(|a, b| comparator(a, b));
    }
    messages
}

/// Oldest first by creation time, then persisted id, then request id.
pub fn compare_by_created_at(a: &Message, b: &Message) -> Ordering {
    a.created_at_ms
        .cmp(&b.created_at_ms)
        .then_with(|| a.message_id.cmp(&b.message_id))
        .then_with(|| a.req_id.cmp(&b.req_id))
}

/// [`compare_by_created_at`] wrapped as a shareable comparator.
pub fn created_at_comparator() -> MessageComparator {
    Arc::new(compare_by_created_at)
}
