use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::error::ScrapeError;

/// Source of page bodies and documents. The pipeline only talks to this
/// trait so runs can be replayed against saved fixtures.
pub trait Fetch {
    fn fetch_text(&self, url: &str) -> Result<String, ScrapeError>;
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ScrapeError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("visa-stats-scraper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ScrapeError::Network {
                url: String::new(),
                source,
            })?;
        Ok(HttpFetcher { client })
    }

    fn get(&self, url: &str) -> Result<Response, ScrapeError> {
        log::debug!("GET {}", url);
        self.client
            .get(url)
            .send()
            .and_then(Response::error_for_status)
            .map_err(|source| network(url, source))
    }
}

impl Fetch for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, ScrapeError> {
        self.get(url)?.text().map_err(|source| network(url, source))
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ScrapeError> {
        let bytes = self.get(url)?.bytes().map_err(|source| network(url, source))?;
        Ok(bytes.to_vec())
    }
}

fn network(url: &str, source: reqwest::Error) -> ScrapeError {
    ScrapeError::Network {
        url: url.to_string(),
        source,
    }
}
