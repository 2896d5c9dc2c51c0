//! Action script format: one JSON-encoded `ChannelMessagesAction` per line.
//!
//! Blank lines and lines starting with `#` are ignored.

use thiserror::Error;
use timeline_core::ChannelMessagesAction;

/// Errors produced while parsing an action script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// A line did not decode as an action.
    #[error("line {line}: {source}")]
    InvalidAction {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse `input` into actions, filling in `default_user_id` where an update omits the viewer.
pub fn parse_script(
    input: &str,
    default_user_id: Option<&str>,
) -> Result<Vec<ChannelMessagesAction>, ScriptError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, raw)| {
            let trimmed = raw.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(index, raw)| {
            serde_json::from_str::<ChannelMessagesAction>(raw.trim())
                .map(|action| with_default_user(action, default_user_id))
                .map_err(|source| ScriptError::InvalidAction {
                    line: index + 1,
                    source,
                })
        })
        .collect()
}

fn with_default_user(
    mut action: ChannelMessagesAction,
    default_user_id: Option<&str>,
) -> ChannelMessagesAction {
    match &mut action {
        ChannelMessagesAction::UpdateMessages {
            current_user_id, ..
        }
        | ChannelMessagesAction::UpdateNewMessages {
            current_user_id, ..
        } => {
            if current_user_id.is_none() {
                *current_user_id = default_user_id.map(str::to_owned);
            }
        }
        ChannelMessagesAction::UpdateLoading { .. }
        | ChannelMessagesAction::UpdateRefreshing { .. }
        | ChannelMessagesAction::DeleteMessages { .. }
        | ChannelMessagesAction::DeleteNewMessages { .. } => {}
    }
    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use timeline_core::{ChannelMessagesReducer, SendStatus, created_at_comparator};

    const SCRIPT: &str = r#"
# open the channel
{"UpdateLoading":{"status":true}}
{"UpdateMessages":{"messages":[{"message_id":1,"req_id":"r1","sender_id":"u1","send_status":"Pending"}],"clear_before_action":true}}
{"UpdateMessages":{"messages":[],"current_user_id":"u2"}}
{"DeleteMessages":{"req_ids":["r1"]}}
"#;

    #[test]
    fn parses_actions_and_skips_comments() {
        let actions = parse_script(SCRIPT, None).expect("script should parse");
        assert_eq!(actions.len(), 4);
        assert_eq!(actions[0], ChannelMessagesAction::UpdateLoading { status: true });
        match &actions[1] {
            ChannelMessagesAction::UpdateMessages {
                messages,
                clear_before_action,
                current_user_id,
            } => {
                assert!(*clear_before_action);
                assert_eq!(current_user_id, &None);
                assert_eq!(messages[0].send_status, SendStatus::Pending);
                assert_eq!(messages[0].req_id.as_deref(), Some("r1"));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn fills_missing_viewer_only() {
        let actions = parse_script(SCRIPT, Some("u1")).expect("script should parse");
        let viewers: Vec<Option<&str>> = actions
            .iter()
            .filter_map(|action| match action {
                ChannelMessagesAction::UpdateMessages {
                    current_user_id, ..
                } => Some(current_user_id.as_deref()),
                _ => None,
            })
            .collect();
        assert_eq!(viewers, vec![Some("u1"), Some("u2")]);
    }

    #[test]
    fn bundled_fixture_replays_to_one_confirmed_send() {
        let actions = parse_script(include_str!("../fixtures/optimistic-send.jsonl"), Some("u1"))
            .expect("fixture should parse");
        assert_eq!(actions.len(), 8);

        let reducer = ChannelMessagesReducer::new().with_sort_comparator(created_at_comparator());
        let mut state = reducer.initial_state();
        for action in actions {
            reducer.apply(&mut state, action);
        }
        let snapshot = reducer.snapshot(&state);

        let ids: Vec<u64> = snapshot.messages.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![10, 12, 13]);
        assert_eq!(snapshot.messages[1].send_status, SendStatus::Succeeded);
        assert_eq!(snapshot.new_messages.len(), 1);
        assert!(!snapshot.loading);
    }

    #[test]
    fn reports_the_offending_line() {
        let err = parse_script("{\"UpdateLoading\":{\"status\":true}}\n\nnot json", None)
            .expect_err("garbage should fail");
        let ScriptError::InvalidAction { line, .. } = err;
        assert_eq!(line, 3);
    }
}
