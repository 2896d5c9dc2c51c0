use tracing::warn;

use crate::{
    error::{SourceError, SourceErrorCategory},
    types::{Message, SendStatus},
};

/// Result of a send attempt before it is folded back into the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Server accepted the message and assigned it an id.
    Success { message_id: u64, created_at_ms: u64 },
    /// Send failed with source error details.
    Failure { error: SourceError },
    /// Caller abandoned the send before the server answered.
    Canceled,
}

/// Turn a send outcome into the message that replaces the optimistic copy.
///
/// The request id and author are preserved so the result keys onto the same timeline
/// entry as `pending`.
pub fn normalize_send_outcome(pending: &Message, outcome: SendOutcome) -> Message {
    match outcome {
        SendOutcome::Success {
            message_id,
            created_at_ms,
        } => {
            let mut confirmed = pending
                .clone()
                .with_message_id(message_id)
                .with_status(SendStatus::Succeeded);
            confirmed.created_at_ms = created_at_ms;
            confirmed.updated_at_ms = created_at_ms;
            confirmed
        }
        SendOutcome::Failure { error } => {
            warn!(
                req_id = ?pending.req_id,
                code = %error.code,
                "local send failed"
            );
            pending.clone().with_status(SendStatus::Failed)
        }
        SendOutcome::Canceled => pending.clone().with_status(SendStatus::Canceled),
    }
}

/// Convert a generic send failure message to a default network-classified error.
pub fn classify_send_error_message(message: impl Into<String>) -> SourceError {
    SourceError::new(SourceErrorCategory::Network, "send_failed", message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::message_key;

    fn pending() -> Message {
        Message::local_pending("txn-1", "u1", "hello", 1_000)
    }

    #[test]
    fn maps_success_to_confirmed_message_on_same_key() {
        let confirmed = normalize_send_outcome(
            &pending(),
            SendOutcome::Success {
                message_id: 42,
                created_at_ms: 1_500,
            },
        );

        assert_eq!(confirmed.message_id, 42);
        assert_eq!(confirmed.send_status, SendStatus::Succeeded);
        assert_eq!(confirmed.created_at_ms, 1_500);
        assert_eq!(
            message_key(&confirmed, Some("u1")),
            message_key(&pending(), Some("u1"))
        );
    }

    #[test]
    fn maps_failure_to_failed_status_without_id() {
        let failed = normalize_send_outcome(
            &pending(),
            SendOutcome::Failure {
                error: classify_send_error_message("socket closed"),
            },
        );

        assert_eq!(failed.send_status, SendStatus::Failed);
        assert!(!failed.is_persisted());
        assert_eq!(failed.req_id.as_deref(), Some("txn-1"));
    }

    #[test]
    fn maps_cancel_to_canceled_status() {
        let canceled = normalize_send_outcome(&pending(), SendOutcome::Canceled);
        assert_eq!(canceled.send_status, SendStatus::Canceled);
    }

    #[test]
    fn generic_send_errors_are_network_classified() {
        let err = classify_send_error_message("boom");
        assert_eq!(err.category, SourceErrorCategory::Network);
        assert_eq!(err.code, "send_failed");
    }
}
