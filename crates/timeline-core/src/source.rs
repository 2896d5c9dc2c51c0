//! Paginated message source consumed by the channel driver.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::{error::SourceError, types::Message};

/// Cursor over a channel's history, newest page first.
#[async_trait]
pub trait MessageSource: Send {
    /// Whether another page can be requested.
    fn has_next(&self) -> bool;

    /// Fetch the next page.
    async fn next(&mut self) -> Result<Vec<Message>, SourceError>;
}

/// In-memory source that serves pre-built pages, optionally failing first.
#[derive(Debug, Default)]
pub struct PagedMessageSource {
    pages: VecDeque<Vec<Message>>,
    failures: VecDeque<SourceError>,
    fetches: usize,
}

impl PagedMessageSource {
    pub fn new(pages: impl IntoIterator<Item = Vec<Message>>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
            failures: VecDeque::new(),
            fetches: 0,
        }
    }

    /// Queue `error` to be returned by the next fetch before any page.
    pub fn fail_next_with(mut self, error: SourceError) -> Self {
        self.failures.push_back(error);
        self
    }

    /// Number of `next` calls served so far, failures included.
    pub fn fetches(&self) -> usize {
        self.fetches
    }
}

#[async_trait]
impl MessageSource for PagedMessageSource {
    fn has_next(&self) -> bool {
        !self.pages.is_empty()
    }

    async fn next(&mut self) -> Result<Vec<Message>, SourceError> {
        self.fetches += 1;
        if let Some(error) = self.failures.pop_front() {
            return Err(error);
        }
        Ok(self.pages.pop_front().unwrap_or_default())
    }
}
