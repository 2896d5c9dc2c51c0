use std::collections::HashMap;

use tracing::trace;

use crate::{
    identity::{is_my_message, message_key},
    transition::accepts_transition,
    types::{Message, MessageKey},
};

/// Counts reported by a merge, mostly for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Candidates written to the store.
    pub accepted: usize,
    /// Candidates dropped by the transition guard.
    pub rejected: usize,
}

/// Keyed message collection backing both the timeline and the new-message bucket.
///
/// Keys come from [`message_key`]; iteration order is whatever the underlying hash map
/// yields and carries no meaning. Ordering is reconstructed by the projector on read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStore {
    entries: HashMap<MessageKey, Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by its resolved key.
    pub fn get(&self, key: &str) -> Option<&Message> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &MessageKey> {
        self.entries.keys()
    }

    /// Stored messages in unspecified order.
    pub fn values(&self) -> impl Iterator<Item = &Message> {
        self.entries.values()
    }

    /// Discard every entry and insert `messages` keyed for `current_user_id`.
    pub fn replace_all(
        &mut self,
        messages: impl IntoIterator<Item = Message>,
        current_user_id: Option<&str>,
    ) {
        self.entries = messages
            .into_iter()
            .map(|message| (message_key(&message, current_user_id), message))
            .collect();
    }

    /// Merge `messages`, dropping locally authored candidates whose status change the
    /// transition guard rejects.
    ///
    /// Candidates are checked against the store as it was before the batch. Accepted
    /// candidates fully replace any previous entry at their key; within one batch the
    /// last candidate for a key wins.
    pub fn merge(&mut self, messages: Vec<Message>, current_user_id: Option<&str>) -> MergeOutcome {
        let mut rejected = 0;
        let accepted: Vec<(MessageKey, Message)> = messages
            .into_iter()
            .filter_map(|next| {
                let key = message_key(&next, current_user_id);
                if is_my_message(&next, current_user_id)
                    && let Some(previous) = self.entries.get(&key)
                    && is_my_message(previous, current_user_id)
                    && !accepts_transition(previous, &next)
                {
                    trace!(
                        key = %key,
                        previous = ?previous.send_status,
                        next = ?next.send_status,
                        "dropping send status transition"
                    );
                    rejected += 1;
                    return None;
                }
                Some((key, next))
            })
            .collect();

        let outcome = MergeOutcome {
            accepted: accepted.len(),
            rejected,
        };
        self.replace_keys(accepted);
        outcome
    }

    /// Merge `messages` without consulting the transition guard.
    pub fn merge_unguarded(
        &mut self,
        messages: Vec<Message>,
        current_user_id: Option<&str>,
    ) -> MergeOutcome {
        let keyed: Vec<(MessageKey, Message)> = messages
            .into_iter()
            .map(|message| (message_key(&message, current_user_id), message))
            .collect();
        let outcome = MergeOutcome {
            accepted: keyed.len(),
            rejected: 0,
        };
        self.replace_keys(keyed);
        outcome
    }

    /// Remove entries keyed by any of the persisted ids or request ids.
    ///
    /// Unknown keys are ignored. Returns the number of entries removed.
    pub fn delete(&mut self, message_ids: &[u64], req_ids: &[String]) -> usize {
        let before = self.entries.len();
        for message_id in message_ids {
            self.entries.remove(message_id.to_string().as_str());
        }
        for req_id in req_ids {
            self.entries.remove(req_id.as_str());
        }
        before - self.entries.len()
    }

    fn replace_keys(&mut self, keyed: Vec<(MessageKey, Message)>) {
        // Drop old copies first so an incoming message never inherits fields from them.
        for (key, _) in &keyed {
            self.entries.remove(key);
        }
        self.entries.extend(keyed);
    }
}
