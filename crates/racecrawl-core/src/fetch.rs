//! Page fetching over HTTP.
//!
//! One blocking curl GET per result page. The service paginates with
//! `posStart` (zero-based offset) and `count` query parameters; page N at
//! size S maps to `posStart = (N - 1) * S, count = S`.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Error from a single page fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure (timeout, connection, DNS, ...).
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),
    /// Response arrived with a non-success status.
    #[error("HTTP {0}")]
    Http(u32),
}

/// Capability for fetching one page of raw result data.
///
/// Implementations block; callers run them via `spawn_blocking`.
pub trait PageFetcher: Send + Sync {
    fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<u8>, FetchError>;
}

/// `PageFetcher` backed by the live results service.
pub struct HttpPageFetcher {
    data_url: Url,
}

impl HttpPageFetcher {
    /// Build a fetcher for one event's data endpoint.
    pub fn for_event(endpoint: &str, event_id: u64) -> Result<Self, url::ParseError> {
        let data_url = Url::parse(&format!(
            "{}/ss/results/data/{}/",
            endpoint.trim_end_matches('/'),
            event_id
        ))?;
        Ok(Self { data_url })
    }

    fn page_url(&self, page: u32, page_size: u32) -> Url {
        let pos_start = u64::from(page.saturating_sub(1)) * u64::from(page_size);
        let mut url = self.data_url.clone();
        url.query_pairs_mut()
            .append_pair("posStart", &pos_start.to_string())
            .append_pair("count", &page_size.to_string());
        url
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<u8>, FetchError> {
        let url = self.page_url(page, page_size);
        let mut body: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url.as_str())?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(Duration::from_secs(15))?;
        easy.timeout(Duration::from_secs(60))?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }
        Ok(body)
    }
}
