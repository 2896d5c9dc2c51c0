use crate::types::{Message, SendStatus};

/// Decide whether `next` may overwrite the stored copy `previous` of a locally
/// authored message.
///
/// `Succeeded` is terminal: once the server acknowledged a message, re-deliveries of the
/// same logical send are dropped. Otherwise only an actual status change is accepted.
pub fn accepts_transition(previous: &Message, next: &Message) -> bool {
    if previous.send_status == SendStatus::Succeeded {
        return false;
    }
    previous.send_status != next.send_status
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(status: SendStatus) -> Message {
        Message::local_pending("r1", "u1", "hi", 1).with_status(status)
    }

    #[test]
    fn pending_moves_to_succeeded_or_failed() {
        let pending = local(SendStatus::Pending);
        assert!(accepts_transition(&pending, &local(SendStatus::Succeeded)));
        assert!(accepts_transition(&pending, &local(SendStatus::Failed)));
        assert!(accepts_transition(&pending, &local(SendStatus::Canceled)));
    }

    #[test]
    fn succeeded_is_terminal() {
        let done = local(SendStatus::Succeeded);
        for next in [
            SendStatus::Pending,
            SendStatus::Succeeded,
            SendStatus::Failed,
            SendStatus::Canceled,
        ] {
            assert!(!accepts_transition(&done, &local(next)), "{next:?}");
        }
    }

    #[test]
    fn same_status_is_not_a_transition() {
        assert!(!accepts_transition(
            &local(SendStatus::Pending),
            &local(SendStatus::Pending)
        ));
    }

    #[test]
    fn failed_message_can_be_resent() {
        assert!(accepts_transition(
            &local(SendStatus::Failed),
            &local(SendStatus::Pending)
        ));
    }
}
