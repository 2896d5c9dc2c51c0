//! Channel message reconciliation shared by chat frontends.
//!
//! This crate merges optimistic local sends, history pages and live events into one
//! deduplicated timeline, keeps a companion bucket of unseen messages, and runs the
//! reducer behind a serialized async action queue.

/// Reducer command/snapshot channel primitives.
pub mod channel;
/// Driver that turns fetches, live events and sends into actions.
pub mod driver;
/// Source and driver error types.
pub mod error;
/// Identity key resolution.
pub mod identity;
/// Send outcome normalization.
pub mod normalization;
/// Ordered read views over message stores.
pub mod projector;
/// The channel messages reducer.
pub mod reducer;
/// Backoff policy used by history fetches.
pub mod retry;
/// Serialized reducer runtime task.
pub mod runtime;
/// Paginated message source contract.
pub mod source;
/// Keyed message store with merge policy.
pub mod timeline;
/// Transition guard for locally authored messages.
pub mod transition;
/// Message, action and snapshot types.
pub mod types;

pub use channel::{ChannelError, ReducerChannels, ReducerCommand, SnapshotEvent, SnapshotStream};
pub use driver::{ChannelEvent, ChannelMessagesDriver};
pub use error::{DriverError, SourceError, SourceErrorCategory};
pub use identity::{is_my_message, message_key};
pub use normalization::{SendOutcome, classify_send_error_message, normalize_send_outcome};
pub use projector::{MessageComparator, compare_by_created_at, created_at_comparator, project};
pub use reducer::{
    ChannelMessagesReducer, ChannelMessagesState, NewMessageFilter, is_new_message,
};
pub use retry::RetryPolicy;
pub use runtime::{ReducerHandle, RuntimeConfig, spawn_reducer};
pub use source::{MessageSource, PagedMessageSource};
pub use timeline::{MergeOutcome, MessageStore};
pub use transition::accepts_transition;
pub use types::{
    ChannelMessagesAction, ChannelMessagesSnapshot, Message, MessageKey, SendStatus,
    UNASSIGNED_MESSAGE_ID,
};
