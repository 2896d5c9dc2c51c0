//! Channel messages reducer: applies one action at a time to the timeline state.

use std::{fmt, sync::Arc};

use tracing::{debug, trace};

use crate::{
    identity::is_my_message,
    projector::{MessageComparator, project},
    timeline::MessageStore,
    types::{ChannelMessagesAction, ChannelMessagesSnapshot, Message},
};

/// Predicate selecting messages that belong in the new-message bucket.
pub type NewMessageFilter = Arc<dyn Fn(&Message, Option<&str>) -> bool + Send + Sync>;

/// Default new-message predicate: someone else's message that is not silent.
pub fn is_new_message(message: &Message, current_user_id: Option<&str>) -> bool {
    !is_my_message(message, current_user_id) && !message.silent
}

/// Mutable reducer state. Only [`ChannelMessagesReducer`] writes to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessagesState {
    pub(crate) loading: bool,
    pub(crate) refreshing: bool,
    pub(crate) messages: MessageStore,
    pub(crate) new_messages: MessageStore,
}

impl Default for ChannelMessagesState {
    fn default() -> Self {
        Self {
            loading: true,
            refreshing: false,
            messages: MessageStore::new(),
            new_messages: MessageStore::new(),
        }
    }
}

impl ChannelMessagesState {
    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn refreshing(&self) -> bool {
        self.refreshing
    }

    /// Confirmed timeline entries.
    pub fn message_store(&self) -> &MessageStore {
        &self.messages
    }

    /// Arrived-but-unseen entries.
    pub fn new_message_store(&self) -> &MessageStore {
        &self.new_messages
    }
}

/// Reducer configuration plus the transition function.
#[derive(Clone)]
pub struct ChannelMessagesReducer {
    sort_comparator: Option<MessageComparator>,
    new_message_filter: NewMessageFilter,
}

impl Default for ChannelMessagesReducer {
    fn default() -> Self {
        Self {
            sort_comparator: None,
            new_message_filter: Arc::new(is_new_message),
        }
    }
}

impl fmt::Debug for ChannelMessagesReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelMessagesReducer")
            .field("sorted", &self.sort_comparator.is_some())
            .finish_non_exhaustive()
    }
}

impl ChannelMessagesReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order the `messages` projection with `comparator`.
    pub fn with_sort_comparator(mut self, comparator: MessageComparator) -> Self {
        self.sort_comparator = Some(comparator);
        self
    }

    /// Replace the default new-message predicate.
    pub fn with_new_message_filter(mut self, filter: NewMessageFilter) -> Self {
        self.new_message_filter = filter;
        self
    }

    /// State for a channel that has not loaded yet.
    pub fn initial_state(&self) -> ChannelMessagesState {
        ChannelMessagesState::default()
    }

    /// Produce the next state without touching `state`.
    pub fn reduce(
        &self,
        state: &ChannelMessagesState,
        action: ChannelMessagesAction,
    ) -> ChannelMessagesState {
        let mut next = state.clone();
        self.apply(&mut next, action);
        next
    }

    /// Apply `action` in place.
    pub fn apply(&self, state: &mut ChannelMessagesState, action: ChannelMessagesAction) {
        trace!(action = action.label(), "applying channel messages action");
        match action {
            ChannelMessagesAction::UpdateLoading { status } => state.loading = status,
            ChannelMessagesAction::UpdateRefreshing { status } => state.refreshing = status,
            ChannelMessagesAction::UpdateMessages {
                messages,
                clear_before_action,
                current_user_id,
            } => {
                let user = current_user_id.as_deref();
                if clear_before_action {
                    state.messages.replace_all(messages, user);
                    debug!(count = state.messages.len(), "timeline replaced");
                } else {
                    let outcome = state.messages.merge(messages, user);
                    if outcome.rejected > 0 {
                        debug!(
                            accepted = outcome.accepted,
                            rejected = outcome.rejected,
                            "timeline merge dropped stale send status updates"
                        );
                    }
                }
            }
            ChannelMessagesAction::UpdateNewMessages {
                messages,
                clear_before_action,
                current_user_id,
            } => {
                let user = current_user_id.as_deref();
                let fresh: Vec<Message> = messages
                    .into_iter()
                    .filter(|message| (self.new_message_filter)(message, user))
                    .collect();
                if clear_before_action {
                    state.new_messages.replace_all(fresh, user);
                } else {
                    state.new_messages.merge_unguarded(fresh, user);
                }
                trace!(count = state.new_messages.len(), "new message bucket updated");
            }
            ChannelMessagesAction::DeleteMessages {
                message_ids,
                req_ids,
            } => {
                let removed = state.messages.delete(&message_ids, &req_ids);
                trace!(removed, "timeline entries deleted");
            }
            ChannelMessagesAction::DeleteNewMessages {
                message_ids,
                req_ids,
            } => {
                let removed = state.new_messages.delete(&message_ids, &req_ids);
                trace!(removed, "new message entries deleted");
            }
        }
    }

    /// Timeline ordered by the configured comparator.
    pub fn messages(&self, state: &ChannelMessagesState) -> Vec<Message> {
        project(&state.messages, self.sort_comparator.as_ref())
    }

    /// New-message bucket, unordered.
    pub fn new_messages(&self, state: &ChannelMessagesState) -> Vec<Message> {
        project(&state.new_messages, None)
    }

    /// Full read view of `state`.
    pub fn snapshot(&self, state: &ChannelMessagesState) -> ChannelMessagesSnapshot {
        ChannelMessagesSnapshot {
            loading: state.loading,
            refreshing: state.refreshing,
            messages: self.messages(state),
            new_messages: self.new_messages(state),
        }
    }
}
