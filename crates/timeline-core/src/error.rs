use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::channel::ChannelError;

/// Broad category of a message source failure, used to decide on retries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceErrorCategory {
    /// Invalid query parameters or unsupported channel configuration.
    Config,
    /// Viewer is not allowed to read the channel.
    Auth,
    /// Transient transport failure.
    Network,
    /// Server asked the client to slow down.
    RateLimited,
    /// Bug or broken invariant in the source implementation.
    Internal,
}

/// Failure reported by a [`crate::source::MessageSource`] or a send attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct SourceError {
    /// High-level error category.
    pub category: SourceErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional retry hint in milliseconds.
    pub retry_after_ms: Option<u64>,
}

impl SourceError {
    pub fn new(
        category: SourceErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            retry_after_ms: None,
        }
    }

    /// Attach a retry hint to the error.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after_ms = Some(retry_after.as_millis() as u64);
        self
    }

    /// Network and rate-limit failures are worth retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category,
            SourceErrorCategory::Network | SourceErrorCategory::RateLimited
        )
    }
}

/// Errors surfaced by [`crate::driver::ChannelMessagesDriver`].
#[derive(Debug, Error)]
pub enum DriverError {
    /// The message source failed and retries were exhausted or not applicable.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// The reducer runtime is no longer accepting actions.
    #[error(transparent)]
    Channel(#[from] ChannelError),
    /// A local send was attempted without a known viewer.
    #[error("cannot send without a current user")]
    NotAuthenticated,
}
