use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::types::{ChannelMessagesAction, ChannelMessagesSnapshot};

/// Broadcast stream of applied transitions.
pub type SnapshotStream = broadcast::Receiver<SnapshotEvent>;

/// Errors returned by reducer channel operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The runtime dropped its command receiver.
    #[error("action channel is closed")]
    ActionChannelClosed,
    /// The runtime stopped before answering a request.
    #[error("reducer runtime stopped")]
    RuntimeStopped,
}

/// Work item consumed by the reducer runtime, in arrival order.
#[derive(Debug)]
pub enum ReducerCommand {
    /// Apply one action.
    Apply(ChannelMessagesAction),
    /// Reply with the snapshot once every earlier command has been applied.
    Flush(oneshot::Sender<Arc<ChannelMessagesSnapshot>>),
}

/// One applied action and the snapshot it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEvent {
    /// Position of the action in the runtime's total order, starting at 1.
    pub sequence: u64,
    /// Label of the applied action.
    pub action: &'static str,
    /// State after the action. Never mutated once published.
    pub snapshot: Arc<ChannelMessagesSnapshot>,
}

/// Runtime-side ends of a [`ReducerChannels`] set.
#[derive(Debug)]
pub struct RuntimeEndpoints {
    pub command_rx: mpsc::Receiver<ReducerCommand>,
    pub event_tx: broadcast::Sender<SnapshotEvent>,
    pub latest_tx: watch::Sender<Arc<ChannelMessagesSnapshot>>,
}

/// Command/snapshot channel set shared by drivers and readers.
#[derive(Clone, Debug)]
pub struct ReducerChannels {
    command_tx: mpsc::Sender<ReducerCommand>,
    event_tx: broadcast::Sender<SnapshotEvent>,
    latest_rx: watch::Receiver<Arc<ChannelMessagesSnapshot>>,
}

impl ReducerChannels {
    /// Create a new channel set seeded with `initial`, plus the runtime-side ends.
    pub fn new(
        command_buffer: usize,
        event_buffer: usize,
        initial: ChannelMessagesSnapshot,
    ) -> (Self, RuntimeEndpoints) {
        let (command_tx, command_rx) = mpsc::channel(command_buffer.max(1));
        let (event_tx, _) = broadcast::channel(event_buffer.max(1));
        let (latest_tx, latest_rx) = watch::channel(Arc::new(initial));

        (
            Self {
                command_tx,
                event_tx: event_tx.clone(),
                latest_rx,
            },
            RuntimeEndpoints {
                command_rx,
                event_tx,
                latest_tx,
            },
        )
    }

    /// Queue one command for the runtime.
    pub async fn send_command(&self, command: ReducerCommand) -> Result<(), ChannelError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ChannelError::ActionChannelClosed)
    }

    /// Subscribe to every transition applied from now on.
    pub fn subscribe(&self) -> SnapshotStream {
        self.event_tx.subscribe()
    }

    /// Most recently published snapshot. Never blocks.
    pub fn latest(&self) -> Arc<ChannelMessagesSnapshot> {
        self.latest_rx.borrow().clone()
    }
}
