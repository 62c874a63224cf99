//! Page retrieval
//!
//! [`PageSource`] is the seam between the driver and the network. The HTTP
//! implementation issues one blocking GET per page with no retry; any
//! transport failure or non-success status ends the run.

use crate::error::{IngestError, Result};
use crate::ingest::types::Page;
use std::collections::HashMap;
use tracing::debug;

/// Anything that can produce the page behind a URL
pub trait PageSource {
    fn fetch(&mut self, url: &str) -> Result<Page>;
}

/// Fetches pages over HTTP with a blocking client
pub struct HttpPageSource {
    agent: ureq::Agent,
}

impl HttpPageSource {
    pub fn new() -> Self {
        // statuses are checked here so the body can be reported
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        HttpPageSource { agent }
    }
}

impl Default for HttpPageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSource for HttpPageSource {
    fn fetch(&mut self, url: &str) -> Result<Page> {
        debug!(url, "fetching page");

        let mut response = self.agent.get(url).call().map_err(|err| IngestError::Transport {
            url: url.to_string(),
            reason: err.to_string(),
        })?;

        let status = response.status();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|err| IngestError::Transport {
                url: url.to_string(),
                reason: format!("failed reading response body: {err}"),
            })?;

        if !status.is_success() {
            return Err(IngestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Page::parse(&body)
    }
}

/// Serves previously captured response bodies by URL.
///
/// Useful for replaying a recorded crawl without touching the network.
#[derive(Debug, Default)]
pub struct ReplayPageSource {
    bodies: HashMap<String, Vec<u8>>,
    fetched: Vec<String>,
}

impl ReplayPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// URLs requested so far, in request order
    pub fn fetched(&self) -> &[String] {
        &self.fetched
    }
}

impl PageSource for ReplayPageSource {
    fn fetch(&mut self, url: &str) -> Result<Page> {
        self.fetched.push(url.to_string());
        let body = self.bodies.get(url).ok_or_else(|| IngestError::Transport {
            url: url.to_string(),
            reason: "no recorded response for this URL".to_string(),
        })?;
        Page::parse(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_source_serves_recorded_pages() {
        let mut source = ReplayPageSource::new()
            .with_page("p1", r#"{"next": "p2", "results": [{"name": "a"}]}"#);

        let page = source.fetch("p1").unwrap();
        assert_eq!(page.cursor.next_url(), Some("p2"));

        let missing = source.fetch("p2");
        assert!(matches!(missing, Err(IngestError::Transport { url, .. }) if url == "p2"));
        assert_eq!(source.fetched(), &["p1".to_string(), "p2".to_string()]);
    }
}
