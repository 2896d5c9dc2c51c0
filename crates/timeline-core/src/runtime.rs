//! Serialized action-application point for one channel.
//!
//! History fetches, live events and local sends may all produce actions concurrently;
//! the runtime task applies them one at a time in arrival order and publishes an
//! immutable snapshot after each.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::{
    channel::{ChannelError, ReducerChannels, ReducerCommand, SnapshotEvent, SnapshotStream},
    reducer::{ChannelMessagesReducer, ChannelMessagesState},
    types::{ChannelMessagesAction, ChannelMessagesSnapshot, Message},
};

const DEFAULT_ACTION_BUFFER: usize = 128;
const DEFAULT_EVENT_BUFFER: usize = 512;

/// Channel sizing for a reducer runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Queued actions before `dispatch` starts waiting.
    pub action_buffer: usize,
    /// Snapshot events retained for slow subscribers.
    pub event_buffer: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            action_buffer: DEFAULT_ACTION_BUFFER,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

/// Cloneable handle used by drivers to dispatch actions and by readers to observe state.
#[derive(Clone, Debug)]
pub struct ReducerHandle {
    channels: ReducerChannels,
    shutdown: CancellationToken,
}

impl ReducerHandle {
    /// Queue one action.
    pub async fn dispatch(&self, action: ChannelMessagesAction) -> Result<(), ChannelError> {
        self.channels
            .send_command(ReducerCommand::Apply(action))
            .await
    }

    pub async fn update_messages(
        &self,
        messages: Vec<Message>,
        clear_before_action: bool,
        current_user_id: Option<String>,
    ) -> Result<(), ChannelError> {
        self.dispatch(ChannelMessagesAction::UpdateMessages {
            messages,
            clear_before_action,
            current_user_id,
        })
        .await
    }

    pub async fn delete_messages(
        &self,
        message_ids: Vec<u64>,
        req_ids: Vec<String>,
    ) -> Result<(), ChannelError> {
        self.dispatch(ChannelMessagesAction::DeleteMessages {
            message_ids,
            req_ids,
        })
        .await
    }

    pub async fn update_new_messages(
        &self,
        messages: Vec<Message>,
        clear_before_action: bool,
        current_user_id: Option<String>,
    ) -> Result<(), ChannelError> {
        self.dispatch(ChannelMessagesAction::UpdateNewMessages {
            messages,
            clear_before_action,
            current_user_id,
        })
        .await
    }

    pub async fn delete_new_messages(
        &self,
        message_ids: Vec<u64>,
        req_ids: Vec<String>,
    ) -> Result<(), ChannelError> {
        self.dispatch(ChannelMessagesAction::DeleteNewMessages {
            message_ids,
            req_ids,
        })
        .await
    }

    pub async fn update_loading(&self, status: bool) -> Result<(), ChannelError> {
        self.dispatch(ChannelMessagesAction::UpdateLoading { status })
            .await
    }

    pub async fn update_refreshing(&self, status: bool) -> Result<(), ChannelError> {
        self.dispatch(ChannelMessagesAction::UpdateRefreshing { status })
            .await
    }

    /// Latest published snapshot; may lag actions that are still queued.
    pub fn snapshot(&self) -> Arc<ChannelMessagesSnapshot> {
        self.channels.latest()
    }

    /// Subscribe to every transition applied from now on.
    pub fn subscribe(&self) -> SnapshotStream {
        self.channels.subscribe()
    }

    /// Wait until every previously dispatched action is applied and return the result.
    pub async fn flush(&self) -> Result<Arc<ChannelMessagesSnapshot>, ChannelError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.channels
            .send_command(ReducerCommand::Flush(reply_tx))
            .await?;
        reply_rx.await.map_err(|_| ChannelError::RuntimeStopped)
    }

    /// Stop the runtime task. Queued actions that were not applied yet are dropped.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Spawn a runtime task owning a fresh state for `reducer`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_reducer(reducer: ChannelMessagesReducer, config: RuntimeConfig) -> ReducerHandle {
    let state = reducer.initial_state();
    let initial = reducer.snapshot(&state);
    let (channels, endpoints) =
        ReducerChannels::new(config.action_buffer, config.event_buffer, initial);
    let shutdown = CancellationToken::new();

    let runtime = ReducerRuntime {
        reducer,
        state,
        command_rx: endpoints.command_rx,
        event_tx: endpoints.event_tx,
        latest_tx: endpoints.latest_tx,
        sequence: 0,
        shutdown: shutdown.child_token(),
    };
    debug!(
        action_buffer = config.action_buffer,
        event_buffer = config.event_buffer,
        "spawning reducer runtime"
    );
    tokio::spawn(async move {
        runtime.run().await;
    });

    ReducerHandle { channels, shutdown }
}

struct ReducerRuntime {
    reducer: ChannelMessagesReducer,
    state: ChannelMessagesState,
    command_rx: mpsc::Receiver<ReducerCommand>,
    event_tx: broadcast::Sender<SnapshotEvent>,
    latest_tx: watch::Sender<Arc<ChannelMessagesSnapshot>>,
    sequence: u64,
    shutdown: CancellationToken,
}

impl ReducerRuntime {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                command = self.command_rx.recv() => match command {
                    Some(ReducerCommand::Apply(action)) => self.apply(action),
                    Some(ReducerCommand::Flush(reply)) => {
                        let _ = reply.send(self.latest_tx.borrow().clone());
                    }
                    None => break,
                },
            }
        }
        info!(applied = self.sequence, "reducer runtime stopped");
    }

    fn apply(&mut self, action: ChannelMessagesAction) {
        let label = action.label();
        self.reducer.apply(&mut self.state, action);
        self.sequence += 1;

        let snapshot = Arc::new(self.reducer.snapshot(&self.state));
        self.latest_tx.send_replace(snapshot.clone());
        trace!(
            sequence = self.sequence,
            action = label,
            messages = snapshot.messages.len(),
            new_messages = snapshot.new_messages.len(),
            "published snapshot"
        );
        // Fails only when nobody is subscribed.
        let _ = self.event_tx.send(SnapshotEvent {
            sequence: self.sequence,
            action: label,
            snapshot,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::{projector::created_at_comparator, types::SendStatus};

    fn spawn() -> ReducerHandle {
        spawn_reducer(
            ChannelMessagesReducer::new().with_sort_comparator(created_at_comparator()),
            RuntimeConfig::default(),
        )
    }

    #[tokio::test]
    async fn initial_snapshot_is_loading_and_empty() {
        let handle = spawn();
        let snapshot = handle.snapshot();
        assert!(snapshot.loading);
        assert!(snapshot.messages.is_empty());
    }

    #[tokio::test]
    async fn applies_actions_in_dispatch_order() {
        let handle = spawn();
        let user = Some("u1".to_owned());
        let pending = Message::local_pending("r1", "u1", "hi", 10);

        handle
            .update_messages(vec![pending.clone()], true, user.clone())
            .await
            .expect("dispatch");
        handle
            .update_messages(
                vec![pending.clone().with_message_id(5).with_status(SendStatus::Succeeded)],
                false,
                user.clone(),
            )
            .await
            .expect("dispatch");
        handle
            .update_messages(
                vec![pending.with_message_id(5).with_status(SendStatus::Failed)],
                false,
                user,
            )
            .await
            .expect("dispatch");

        let snapshot = handle.flush().await.expect("flush");
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].send_status, SendStatus::Succeeded);
        assert_eq!(handle.snapshot(), snapshot);
    }

    #[tokio::test]
    async fn subscribers_see_sequenced_transitions() {
        let handle = spawn();
        let mut events = handle.subscribe();

        handle.update_loading(false).await.expect("dispatch");
        handle.update_refreshing(true).await.expect("dispatch");

        let first = timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("event timeout")
            .expect("event receive");
        let second = timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("event timeout")
            .expect("event receive");

        assert_eq!((first.sequence, first.action), (1, "update_loading"));
        assert!(!first.snapshot.loading);
        assert!(!first.snapshot.refreshing);
        assert_eq!((second.sequence, second.action), (2, "update_refreshing"));
        assert!(second.snapshot.refreshing);
    }

    #[tokio::test]
    async fn published_snapshots_are_not_mutated_by_later_actions() {
        let handle = spawn();
        handle
            .update_messages(vec![Message::received(1, "u2", "a", 1)], false, None)
            .await
            .expect("dispatch");
        let before = handle.flush().await.expect("flush");

        handle
            .delete_messages(vec![1], vec![])
            .await
            .expect("dispatch");
        let after = handle.flush().await.expect("flush");

        assert_eq!(before.messages.len(), 1);
        assert!(after.messages.is_empty());
    }

    #[tokio::test]
    async fn new_message_actions_route_to_the_bucket() {
        let handle = spawn();
        let user = Some("u1".to_owned());
        handle
            .update_new_messages(vec![Message::received(7, "u2", "hey", 1)], false, user)
            .await
            .expect("dispatch");
        assert_eq!(handle.flush().await.expect("flush").new_messages.len(), 1);

        handle
            .delete_new_messages(vec![7], vec![])
            .await
            .expect("dispatch");
        assert!(handle.flush().await.expect("flush").new_messages.is_empty());
    }

    #[tokio::test]
    async fn dispatch_fails_after_shutdown() {
        let handle = spawn();
        handle.shutdown();

        let result = timeout(Duration::from_secs(2), async {
            loop {
                match handle.update_loading(false).await {
                    Err(err) => return err,
                    Ok(()) => tokio::task::yield_now().await,
                }
            }
        })
        .await
        .expect("runtime should stop accepting actions");
        assert_eq!(result, ChannelError::ActionChannelClosed);
    }
}
