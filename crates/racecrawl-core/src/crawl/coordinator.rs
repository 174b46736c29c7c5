//! Crawl orchestration: discover the total count, seed the page plan,
//! drive the pool to completion, funnel records through the sink.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::CrawlConfig;
use crate::fetch::PageFetcher;
use crate::parse::{self, ResultRecord};
use crate::retry::RetryPolicy;
use crate::sink::ResultSink;

use super::downloader::{FetchOutcome, RetryingDownloader};
use super::pool;
use super::queue::{PageQueue, PageRequest};
use super::PageFailure;

/// Page size for the total-count discovery fetch. The count rides on the
/// `<rows>` envelope, so one row is enough.
pub const DISCOVERY_PAGE_SIZE: u32 = 1;

#[derive(Debug, Error)]
pub enum CrawlError {
    /// The discovery fetch never yielded a usable count; without it there
    /// is no page plan, so the whole crawl fails.
    #[error("total result count unavailable: {reason}")]
    TotalCountUnavailable { reason: String },
    /// The sink rejected a record; the crawl cannot deliver its output.
    #[error("result sink failed")]
    Sink(#[source] anyhow::Error),
    /// A worker or consumer task died (panic or forced abort).
    #[error("crawl task failed")]
    Task(#[source] tokio::task::JoinError),
}

/// Everything a finished crawl produced. Record order across pages is
/// unspecified; within a page, source order is preserved.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub records: Vec<ResultRecord>,
    pub failures: Vec<PageFailure>,
}

/// Coordinates one crawl of one event's full result set.
pub struct Crawler {
    downloader: Arc<RetryingDownloader>,
    page_size: u32,
    workers: usize,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn PageFetcher>, cfg: &CrawlConfig) -> Self {
        let policy = cfg
            .retry
            .as_ref()
            .map(RetryPolicy::from)
            .unwrap_or_default();
        Self {
            downloader: Arc::new(RetryingDownloader::new(fetcher, policy, cfg.page_size)),
            page_size: cfg.page_size,
            workers: cfg.effective_workers(),
        }
    }

    /// Run the crawl to completion, streaming every parsed record through
    /// `sink` in arrival order.
    ///
    /// Steps: discover the total count, seed `ceil(total / page_size)`
    /// page requests, run the pool until the queue's join barrier settles,
    /// then shut everything down and report. Pages that exhaust their
    /// retries are listed in the report; only a missing total is fatal.
    pub async fn run<S>(&self, mut sink: S) -> Result<CrawlReport, CrawlError>
    where
        S: ResultSink + 'static,
    {
        sink.write_header()
            .map_err(CrawlError::Sink)?;

        let total = self.discover_total().await?;
        tracing::info!(total, "discovered total result count");

        if total == 0 {
            return Ok(CrawlReport::default());
        }

        let page_count = total.div_ceil(u64::from(self.page_size)) as u32;
        let queue = Arc::new(PageQueue::new());
        for page in 1..=page_count {
            queue.push(PageRequest::first(page));
        }
        tracing::debug!(page_count, workers = self.workers, "seeded page plan");

        let (records_tx, mut records_rx) = mpsc::unbounded_channel::<ResultRecord>();
        let (failures_tx, mut failures_rx) = mpsc::unbounded_channel::<PageFailure>();

        // Single consumer: the sink sees records one at a time, in the
        // order the pool delivers them.
        let consumer = tokio::spawn(async move {
            let mut records = Vec::new();
            while let Some(record) = records_rx.recv().await {
                if let Err(e) = sink.write_row(&record) {
                    return Err(e);
                }
                records.push(record);
            }
            Ok(records)
        });

        let mut workers = JoinSet::new();
        pool::spawn_workers(
            &mut workers,
            self.workers,
            Arc::clone(&queue),
            Arc::clone(&self.downloader),
            records_tx,
            failures_tx,
        );

        // Every seeded page has been acked (parsed or terminally failed)
        // once this returns; closing then lets the workers drain out.
        queue.join().await;
        queue.close();
        while let Some(joined) = workers.join_next().await {
            joined.map_err(CrawlError::Task)?;
        }

        // Workers dropped their senders; both channels now terminate.
        let records = consumer
            .await
            .map_err(CrawlError::Task)?
            .map_err(CrawlError::Sink)?;

        let mut failures = Vec::new();
        while let Ok(failure) = failures_rx.try_recv() {
            failures.push(failure);
        }
        failures.sort_by_key(|f| f.page);

        tracing::info!(
            records = records.len(),
            failed_pages = failures.len(),
            "crawl complete"
        );
        Ok(CrawlReport { records, failures })
    }

    /// Fetch page 1 at the discovery page size until the count is known or
    /// the retry budget is spent. There is no partial crawl without a
    /// known page count, so exhaustion here fails the whole run.
    async fn discover_total(&self) -> Result<u64, CrawlError> {
        let mut req = PageRequest::first(1);
        loop {
            if req.attempt > 0 {
                tokio::time::sleep(self.downloader.policy().backoff_delay(req.attempt)).await;
            }
            match self.downloader.fetch_with_size(req, DISCOVERY_PAGE_SIZE).await {
                FetchOutcome::Success(body) => {
                    return match parse::extract_total(&body) {
                        Ok(Some(total)) => Ok(total),
                        Ok(None) => Err(CrawlError::TotalCountUnavailable {
                            reason: "response carries no total_count attribute".to_string(),
                        }),
                        Err(e) => Err(CrawlError::TotalCountUnavailable {
                            reason: e.to_string(),
                        }),
                    };
                }
                FetchOutcome::Retryable { reason } => {
                    tracing::debug!(attempt = req.attempt, %reason, "discovery fetch failed, retrying");
                    req = req.next_attempt();
                }
                FetchOutcome::Failed { reason } => {
                    return Err(CrawlError::TotalCountUnavailable { reason });
                }
            }
        }
    }
}
