//! Turns history fetches, live events and local sends into reducer actions.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    channel::ChannelError,
    error::{DriverError, SourceError},
    normalization::{SendOutcome, normalize_send_outcome},
    retry::RetryPolicy,
    runtime::ReducerHandle,
    source::MessageSource,
    types::Message,
};

/// Live channel event delivered by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// New messages pushed by the server.
    MessagesReceived(Vec<Message>),
    /// Edits or metadata changes to known messages.
    MessagesUpdated(Vec<Message>),
    /// Messages removed server-side.
    MessagesDeleted {
        message_ids: Vec<u64>,
        req_ids: Vec<String>,
    },
}

/// Drives one channel's reducer runtime on behalf of the viewer.
#[derive(Debug)]
pub struct ChannelMessagesDriver {
    handle: ReducerHandle,
    current_user_id: Option<String>,
    retry: RetryPolicy,
    viewing_latest: bool,
}

impl ChannelMessagesDriver {
    pub fn new(handle: ReducerHandle, current_user_id: Option<String>) -> Self {
        Self {
            handle,
            current_user_id,
            retry: RetryPolicy::default(),
            viewing_latest: true,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn handle(&self) -> &ReducerHandle {
        &self.handle
    }

    pub fn current_user_id(&self) -> Option<&str> {
        self.current_user_id.as_deref()
    }

    /// Switch viewer, e.g. after re-authentication. Affects subsequent actions only.
    pub fn set_current_user(&mut self, current_user_id: Option<String>) {
        info!(user = ?current_user_id, "channel viewer changed");
        self.current_user_id = current_user_id;
    }

    pub fn is_viewing_latest(&self) -> bool {
        self.viewing_latest
    }

    /// First load of the channel: fetch the newest page and replace everything.
    ///
    /// `loading` is cleared again even when the fetch fails.
    pub async fn initial_load<S>(&self, source: &mut S) -> Result<usize, DriverError>
    where
        S: MessageSource + ?Sized,
    {
        self.handle.update_loading(true).await?;
        let result = self.reload(source).await;
        self.handle.update_loading(false).await?;
        result
    }

    /// Explicit reload that discards the current timeline.
    pub async fn refresh<S>(&self, source: &mut S) -> Result<usize, DriverError>
    where
        S: MessageSource + ?Sized,
    {
        self.handle.update_refreshing(true).await?;
        let result = self.reload(source).await;
        self.handle.update_refreshing(false).await?;
        result
    }

    /// Merge the next history page, if any. Returns the number of fetched messages.
    pub async fn load_next<S>(&self, source: &mut S) -> Result<usize, DriverError>
    where
        S: MessageSource + ?Sized,
    {
        if !source.has_next() {
            return Ok(0);
        }
        let page = self.fetch_page(source).await?;
        let count = page.len();
        self.handle
            .update_messages(page, false, self.current_user_id.clone())
            .await?;
        debug!(count, "merged history page");
        Ok(count)
    }

    /// Fold one live event into the stores.
    pub async fn handle_event(&self, event: ChannelEvent) -> Result<(), ChannelError> {
        let user = self.current_user_id.clone();
        match event {
            ChannelEvent::MessagesReceived(messages) => {
                if !self.viewing_latest {
                    self.handle
                        .update_new_messages(messages.clone(), false, user.clone())
                        .await?;
                }
                self.handle.update_messages(messages, false, user).await
            }
            ChannelEvent::MessagesUpdated(messages) => {
                self.handle.update_messages(messages, false, user).await
            }
            ChannelEvent::MessagesDeleted {
                message_ids,
                req_ids,
            } => {
                self.handle
                    .delete_new_messages(message_ids.clone(), req_ids.clone())
                    .await?;
                self.handle.delete_messages(message_ids, req_ids).await
            }
        }
    }

    /// Record whether the viewer sits at the newest message.
    ///
    /// Reaching the latest position marks everything as seen.
    pub async fn set_viewing_latest(&mut self, viewing_latest: bool) -> Result<(), ChannelError> {
        if viewing_latest && !self.viewing_latest {
            self.handle
                .update_new_messages(Vec::new(), true, self.current_user_id.clone())
                .await?;
        }
        self.viewing_latest = viewing_latest;
        Ok(())
    }

    /// Insert an optimistic local message and return it for the transport to send.
    pub async fn begin_send(&self, body: impl Into<String>) -> Result<Message, DriverError> {
        let Some(user) = self.current_user_id.clone() else {
            return Err(DriverError::NotAuthenticated);
        };
        let req_id = Uuid::new_v4().to_string();
        let pending = Message::local_pending(req_id, user.clone(), body, now_ms());
        debug!(req_id = ?pending.req_id, "local send started");
        self.handle
            .update_messages(vec![pending.clone()], false, Some(user))
            .await?;
        Ok(pending)
    }

    /// Replace the optimistic copy with the send result.
    pub async fn complete_send(
        &self,
        pending: &Message,
        outcome: SendOutcome,
    ) -> Result<Message, DriverError> {
        let next = normalize_send_outcome(pending, outcome);
        self.handle
            .update_messages(vec![next.clone()], false, self.current_user_id.clone())
            .await?;
        Ok(next)
    }

    /// Drop a local message, typically a failed or canceled send.
    pub async fn discard_local(&self, message: &Message) -> Result<(), DriverError> {
        let (message_ids, req_ids) = match &message.req_id {
            Some(req_id) => (Vec::new(), vec![req_id.clone()]),
            None => (vec![message.message_id], Vec::new()),
        };
        self.handle.delete_messages(message_ids, req_ids).await?;
        Ok(())
    }

    async fn reload<S>(&self, source: &mut S) -> Result<usize, DriverError>
    where
        S: MessageSource + ?Sized,
    {
        let page = self.fetch_page(source).await?;
        let count = page.len();
        let user = self.current_user_id.clone();
        self.handle.update_messages(page, true, user.clone()).await?;
        self.handle.update_new_messages(Vec::new(), true, user).await?;
        debug!(count, "timeline reloaded");
        Ok(count)
    }

    async fn fetch_page<S>(&self, source: &mut S) -> Result<Vec<Message>, SourceError>
    where
        S: MessageSource + ?Sized,
    {
        let mut failures: u32 = 0;
        loop {
            match source.next().await {
                Ok(page) => return Ok(page),
                Err(err) => {
                    failures = failures.saturating_add(1);
                    let Some(delay) = self.retry.next_delay(failures, &err) else {
                        warn!(error = %err, failures, "message fetch failed");
                        return Err(err);
                    };
                    warn!(
                        error = %err,
                        failures,
                        delay_ms = delay.as_millis() as u64,
                        "message fetch failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
