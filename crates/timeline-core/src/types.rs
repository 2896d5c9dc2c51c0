use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

/// Persisted id carried by messages the server has not acknowledged yet.
pub const UNASSIGNED_MESSAGE_ID: u64 = 0;

/// Delivery stage of a message authored by the current viewer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SendStatus {
    /// Sent optimistically, waiting for the server acknowledgement.
    Pending,
    /// Acknowledged by the server. Terminal for reconciliation purposes.
    Succeeded,
    /// Send attempt failed; the message stays visible so it can be retried or discarded.
    Failed,
    /// Send attempt was canceled before it reached the server.
    Canceled,
}

/// One message instance as seen by the channel timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned id, [`UNASSIGNED_MESSAGE_ID`] until the server acknowledges it.
    #[serde(default)]
    pub message_id: u64,
    /// Client-generated request id for locally authored messages.
    #[serde(default)]
    pub req_id: Option<String>,
    /// Author user ID. Admin/system messages have no sender.
    #[serde(default)]
    pub sender_id: Option<String>,
    /// Delivery stage.
    pub send_status: SendStatus,
    /// Silent messages never count towards unread/new-message indicators.
    #[serde(default)]
    pub silent: bool,
    /// Display-ready text body.
    #[serde(default)]
    pub body: String,
    /// Creation time in milliseconds since Unix epoch.
    #[serde(default)]
    pub created_at_ms: u64,
    /// Last edit time in milliseconds since Unix epoch.
    #[serde(default)]
    pub updated_at_ms: u64,
}

impl Message {
    /// Message delivered by the server (history page or live event).
    pub fn received(
        message_id: u64,
        sender_id: impl Into<String>,
        body: impl Into<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            message_id,
            req_id: None,
            sender_id: Some(sender_id.into()),
            send_status: SendStatus::Succeeded,
            silent: false,
            body: body.into(),
            created_at_ms,
            updated_at_ms: created_at_ms,
        }
    }

    /// Optimistic local message that has not been acknowledged yet.
    pub fn local_pending(
        req_id: impl Into<String>,
        sender_id: impl Into<String>,
        body: impl Into<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            message_id: UNASSIGNED_MESSAGE_ID,
            req_id: Some(req_id.into()),
            sender_id: Some(sender_id.into()),
            send_status: SendStatus::Pending,
            silent: false,
            body: body.into(),
            created_at_ms,
            updated_at_ms: created_at_ms,
        }
    }

    /// Copy of this message with a different delivery stage.
    pub fn with_status(mut self, send_status: SendStatus) -> Self {
        self.send_status = send_status;
        self
    }

    /// Copy of this message with the server-assigned id.
    pub fn with_message_id(mut self, message_id: u64) -> Self {
        self.message_id = message_id;
        self
    }

    /// Copy of this message with its request id set.
    pub fn with_req_id(mut self, req_id: impl Into<String>) -> Self {
        self.req_id = Some(req_id.into());
        self
    }

    /// Copy of this message with the silent flag set.
    pub fn silenced(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Whether the server has assigned a persisted id.
    pub fn is_persisted(&self) -> bool {
        self.message_id != UNASSIGNED_MESSAGE_ID
    }
}

/// Derived store key, see [`crate::identity::message_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageKey(String);

impl MessageKey {
    /// Key for a persisted message id.
    pub fn from_message_id(message_id: u64) -> Self {
        Self(message_id.to_string())
    }

    /// Key for a local request id.
    pub fn from_req_id(req_id: impl Into<String>) -> Self {
        Self(req_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MessageKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed action set accepted by the channel messages reducer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChannelMessagesAction {
    /// Set the first-load flag.
    UpdateLoading { status: bool },
    /// Set the explicit-reload flag.
    UpdateRefreshing { status: bool },
    /// Replace or merge the confirmed timeline.
    UpdateMessages {
        messages: Vec<Message>,
        /// Discard the current timeline before inserting `messages`.
        #[serde(default)]
        clear_before_action: bool,
        /// Viewer identity used for key resolution; absent in preview mode.
        #[serde(default)]
        current_user_id: Option<String>,
    },
    /// Replace or merge the new-message bucket.
    UpdateNewMessages {
        messages: Vec<Message>,
        #[serde(default)]
        clear_before_action: bool,
        #[serde(default)]
        current_user_id: Option<String>,
    },
    /// Remove timeline entries by persisted id or request id.
    DeleteMessages {
        #[serde(default)]
        message_ids: Vec<u64>,
        #[serde(default)]
        req_ids: Vec<String>,
    },
    /// Remove new-message entries by persisted id or request id.
    DeleteNewMessages {
        #[serde(default)]
        message_ids: Vec<u64>,
        #[serde(default)]
        req_ids: Vec<String>,
    },
}

impl ChannelMessagesAction {
    /// Short stable label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::UpdateLoading { .. } => "update_loading",
            Self::UpdateRefreshing { .. } => "update_refreshing",
            Self::UpdateMessages { .. } => "update_messages",
            Self::UpdateNewMessages { .. } => "update_new_messages",
            Self::DeleteMessages { .. } => "delete_messages",
            Self::DeleteNewMessages { .. } => "delete_new_messages",
        }
    }
}

/// Immutable read view published after each applied action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChannelMessagesSnapshot {
    /// Whether the first load is still running.
    pub loading: bool,
    /// Whether an explicit reload is running.
    pub refreshing: bool,
    /// Confirmed timeline, ordered by the reducer's comparator when one is configured.
    pub messages: Vec<Message>,
    /// Arrived-but-unseen messages, unordered.
    pub new_messages: Vec<Message>,
}
