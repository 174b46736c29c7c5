//! Single-attempt page download with retry classification.

use std::sync::Arc;

use crate::fetch::PageFetcher;
use crate::retry::{classify, RetryDecision, RetryPolicy};

use super::queue::PageRequest;

/// Outcome of one fetch attempt for one page.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Raw page content, ready for parsing.
    Success(Vec<u8>),
    /// Failed, with retry budget remaining; resubmit with `attempt + 1`.
    Retryable { reason: String },
    /// Failed past the retry budget; record and move on.
    Failed { reason: String },
}

/// Wraps a `PageFetcher` with the retry policy.
///
/// Invokes the fetcher exactly once per call and never loops: retries are
/// driven externally by resubmitting the request to the pending queue, so
/// the queue stays the single source of truth for outstanding work and the
/// pool spreads attempts fairly across pages.
pub struct RetryingDownloader {
    fetcher: Arc<dyn PageFetcher>,
    policy: RetryPolicy,
    page_size: u32,
}

impl RetryingDownloader {
    pub fn new(fetcher: Arc<dyn PageFetcher>, policy: RetryPolicy, page_size: u32) -> Self {
        Self {
            fetcher,
            policy,
            page_size,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch one page at the crawl's page size.
    pub async fn fetch(&self, req: PageRequest) -> FetchOutcome {
        self.fetch_with_size(req, self.page_size).await
    }

    /// Fetch one page at an explicit page size (total-count discovery uses
    /// a minimal size).
    pub async fn fetch_with_size(&self, req: PageRequest, page_size: u32) -> FetchOutcome {
        let fetcher = Arc::clone(&self.fetcher);
        let page = req.page;
        let result =
            tokio::task::spawn_blocking(move || fetcher.fetch_page(page, page_size)).await;

        let err = match result {
            Ok(Ok(body)) => return FetchOutcome::Success(body),
            Ok(Err(e)) => e,
            Err(join_err) => {
                return FetchOutcome::Failed {
                    reason: format!("fetch task join: {join_err}"),
                }
            }
        };

        let kind = classify(&err);
        match self.policy.decide(req.attempt) {
            RetryDecision::Requeue => {
                tracing::debug!(page, attempt = req.attempt, ?kind, error = %err, "page fetch failed, will requeue");
                FetchOutcome::Retryable {
                    reason: err.to_string(),
                }
            }
            RetryDecision::GiveUp => {
                tracing::warn!(page, attempts = req.attempt + 1, ?kind, error = %err, "page fetch failed past retry budget");
                FetchOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}
