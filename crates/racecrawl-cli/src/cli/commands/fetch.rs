//! `racecrawl fetch` – crawl one event's results into a tab-separated file.

use anyhow::{Context, Result};
use racecrawl_core::config::CrawlConfig;
use racecrawl_core::crawl::Crawler;
use racecrawl_core::fetch::HttpPageFetcher;
use racecrawl_core::sink::CsvSink;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

pub async fn run_fetch(
    cfg: &CrawlConfig,
    event_id: u64,
    overwrite: bool,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let dir = match out_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let path = dir.join(format!("race-{}.csv", event_id));

    if path.exists() && !overwrite {
        println!(
            "{} already exists (use --overwrite to replace)",
            path.display()
        );
        return Ok(());
    }

    let fetcher = Arc::new(
        HttpPageFetcher::for_event(&cfg.endpoint, event_id)
            .with_context(|| format!("bad endpoint URL: {}", cfg.endpoint))?,
    );
    let crawler = Crawler::new(fetcher, cfg);

    let file = File::create(&path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    tracing::info!(event_id, path = %path.display(), "starting crawl");

    let report = crawler.run(CsvSink::new(file)).await?;

    println!(
        "event {}: {} result(s) written to {}",
        event_id,
        report.records.len(),
        path.display()
    );
    if !report.failures.is_empty() {
        println!("{} page(s) failed after retries:", report.failures.len());
        for failure in &report.failures {
            println!(
                "  page {} ({} attempts): {}",
                failure.page, failure.attempts, failure.reason
            );
        }
    }

    Ok(())
}
