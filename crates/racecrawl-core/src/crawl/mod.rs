//! Concurrent paginated crawl: queue, downloader, worker pool, coordinator.

mod coordinator;
mod downloader;
mod pool;
mod queue;

pub use coordinator::{CrawlError, CrawlReport, Crawler, DISCOVERY_PAGE_SIZE};
pub use downloader::{FetchOutcome, RetryingDownloader};
pub use queue::{PageQueue, PageRequest};

/// A page that exhausted its retry budget. Recorded in the crawl report,
/// never raised: the crawl completes with partial data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub page: u32,
    /// Total fetch attempts made for this page.
    pub attempts: u32,
    pub reason: String,
}
