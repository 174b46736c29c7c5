use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of resubmissions per page after the first attempt.
    pub max_retry: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry: 3,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/racecrawl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Base URL of the results service.
    pub endpoint: String,
    /// Number of results per fetched page.
    pub page_size: u32,
    /// Number of download workers. None = 2 x available parallelism - 1,
    /// keeping one unit of concurrency free for the sink consumer.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://www.sportsystems.co.uk".to_string(),
            page_size: 20,
            workers: None,
            retry: None,
        }
    }
}

impl CrawlConfig {
    /// Worker count to use: the configured override, or the default formula.
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(default_workers).max(1)
    }
}

/// Default worker count: 2 x available parallelism - 1.
fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    (cpus * 2).saturating_sub(1).max(1)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("racecrawl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CrawlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CrawlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: CrawlConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = CrawlConfig::default();
        assert_eq!(cfg.page_size, 20);
        assert_eq!(cfg.endpoint, "http://www.sportsystems.co.uk");
        assert!(cfg.workers.is_none());
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn effective_workers_is_at_least_one() {
        let mut cfg = CrawlConfig::default();
        assert!(cfg.effective_workers() >= 1);
        cfg.workers = Some(0);
        assert_eq!(cfg.effective_workers(), 1);
        cfg.workers = Some(7);
        assert_eq!(cfg.effective_workers(), 7);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = CrawlConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: CrawlConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.endpoint, cfg.endpoint);
        assert_eq!(parsed.page_size, cfg.page_size);
        assert_eq!(parsed.workers, cfg.workers);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            endpoint = "http://results.example.net"
            page_size = 50
            workers = 4
        "#;
        let cfg: CrawlConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.endpoint, "http://results.example.net");
        assert_eq!(cfg.page_size, 50);
        assert_eq!(cfg.workers, Some(4));
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_retry_table() {
        let toml = r#"
            endpoint = "http://results.example.net"
            page_size = 20

            [retry]
            max_retry = 5
            base_delay_secs = 0.5
            max_delay_secs = 15
        "#;
        let cfg: CrawlConfig = toml::from_str(toml).unwrap();
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.max_retry, 5);
        assert!((retry.base_delay_secs - 0.5).abs() < 1e-9);
        assert_eq!(retry.max_delay_secs, 15);
    }
}
