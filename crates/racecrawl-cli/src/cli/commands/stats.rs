//! `racecrawl stats` – percentile statistics over a fetched result file.

use anyhow::{Context, Result};
use racecrawl_core::sink::read_results;
use racecrawl_core::stats::{create_buckets, generate_percentiles, DEFAULT_PERCENTILES};
use std::fs::File;
use std::path::Path;

pub fn run_stats(path: &Path, buckets: bool) -> Result<()> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let results = read_results(file)
        .with_context(|| format!("cannot read results from {}", path.display()))?;

    if results.is_empty() {
        println!("no results in {}", path.display());
        return Ok(());
    }

    println!("{} result(s)", results.len());
    for (percentile, time) in generate_percentiles(&results, &DEFAULT_PERCENTILES) {
        println!("{:>3}%  {}", percentile, time.format("%H:%M:%S"));
    }

    if buckets {
        println!();
        for (key, group) in create_buckets(&results) {
            println!("{}  {:>5}", key, group.len());
        }
    }

    Ok(())
}
