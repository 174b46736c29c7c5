//! Download worker pool.
//!
//! N workers on a JoinSet drain the page queue: fetch, then route the
//! outcome. Success emits parsed records to the results channel; a
//! retryable failure resubmits the page; an exhausted failure is sent to
//! the failures channel. Every dequeued request is acked exactly once,
//! and a resubmission is pushed before the ack so the queue's join
//! barrier never observes a false zero.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::parse::{self, ResultRecord};

use super::downloader::{FetchOutcome, RetryingDownloader};
use super::queue::PageQueue;
use super::PageFailure;

pub(super) fn spawn_workers(
    join_set: &mut JoinSet<()>,
    workers: usize,
    queue: Arc<PageQueue>,
    downloader: Arc<RetryingDownloader>,
    records_tx: mpsc::UnboundedSender<ResultRecord>,
    failures_tx: mpsc::UnboundedSender<PageFailure>,
) {
    for worker in 0..workers {
        join_set.spawn(run_worker(
            worker,
            Arc::clone(&queue),
            Arc::clone(&downloader),
            records_tx.clone(),
            failures_tx.clone(),
        ));
    }
}

async fn run_worker(
    worker: usize,
    queue: Arc<PageQueue>,
    downloader: Arc<RetryingDownloader>,
    records_tx: mpsc::UnboundedSender<ResultRecord>,
    failures_tx: mpsc::UnboundedSender<PageFailure>,
) {
    while let Some(req) = queue.pop().await {
        if req.attempt > 0 {
            // Backoff for a resubmitted page happens here, on dequeue, so
            // the worker that discovered the failure was free to move on.
            tokio::time::sleep(downloader.policy().backoff_delay(req.attempt)).await;
        }

        match downloader.fetch(req).await {
            FetchOutcome::Success(body) => {
                match parse::parse(&body) {
                    Ok(records) => {
                        tracing::debug!(worker, page = req.page, rows = records.len(), "page parsed");
                        for record in records {
                            let _ = records_tx.send(record);
                        }
                    }
                    Err(e) => {
                        // The transfer succeeded; refetching the same bytes
                        // won't help. Terminal for this page.
                        let _ = failures_tx.send(PageFailure {
                            page: req.page,
                            attempts: req.attempt + 1,
                            reason: format!("parse: {e}"),
                        });
                    }
                }
                queue.ack();
            }
            FetchOutcome::Retryable { reason } => {
                tracing::debug!(worker, page = req.page, attempt = req.attempt, %reason, "requeueing page");
                queue.push(req.next_attempt());
                queue.ack();
            }
            FetchOutcome::Failed { reason } => {
                let _ = failures_tx.send(PageFailure {
                    page: req.page,
                    attempts: req.attempt + 1,
                    reason,
                });
                queue.ack();
            }
        }
    }
}
