use crate::types::{Message, MessageKey};

/// Whether `message` was authored by the viewer identified by `current_user_id`.
///
/// Messages without a sender (admin/system) are never "mine", and nothing is "mine"
/// while the viewer is unknown.
pub fn is_my_message(message: &Message, current_user_id: Option<&str>) -> bool {
    match (message.sender_id.as_deref(), current_user_id) {
        (Some(sender), Some(user)) => sender == user,
        _ => false,
    }
}

/// Resolve the store key for `message`.
///
/// Locally authored messages that carry a request id are keyed by it, so the optimistic
/// copy and its server echo land on the same entry. Everything else is keyed by the
/// persisted id.
pub fn message_key(message: &Message, current_user_id: Option<&str>) -> MessageKey {
    if is_my_message(message, current_user_id)
        && let Some(req_id) = message.req_id.as_deref()
    {
        return MessageKey::from_req_id(req_id);
    }
    MessageKey::from_message_id(message.message_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SendStatus;

    #[test]
    fn own_message_with_req_id_keys_by_req_id() {
        let msg = Message::local_pending("r1", "u1", "hi", 1);
        assert_eq!(message_key(&msg, Some("u1")).as_str(), "r1");
    }

    #[test]
    fn server_echo_collides_with_optimistic_copy() {
        let pending = Message::local_pending("r1", "u1", "hi", 1);
        let echo = pending
            .clone()
            .with_message_id(991)
            .with_status(SendStatus::Succeeded);

        assert_eq!(message_key(&pending, Some("u1")), message_key(&echo, Some("u1")));
    }

    #[test]
    fn other_authors_key_by_persisted_id_even_with_req_id() {
        let msg = Message::received(55, "u2", "yo", 1).with_req_id("their-req");
        assert_eq!(message_key(&msg, Some("u1")).as_str(), "55");
    }

    #[test]
    fn unknown_viewer_falls_back_to_persisted_id() {
        let msg = Message::local_pending("r1", "u1", "hi", 1).with_message_id(3);
        assert!(!is_my_message(&msg, None));
        assert_eq!(message_key(&msg, None).as_str(), "3");
    }

    #[test]
    fn senderless_messages_are_never_mine() {
        let mut msg = Message::received(9, "u1", "admin notice", 1);
        msg.sender_id = None;
        assert!(!is_my_message(&msg, Some("u1")));
    }
}
