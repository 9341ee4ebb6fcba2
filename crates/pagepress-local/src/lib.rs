use std::time::Duration;

use futures_util::StreamExt;
use pagepress_core::{Error, Result};

pub mod chrome;
pub mod title;

/// Hard cap on HTML bytes read for title suggestion. A hostile or broken page
/// must not balloon memory; the suggestion only looks at the head of the text
/// anyway.
pub const DEFAULT_MAX_HTML_BYTES: usize = 2 * 1024 * 1024;

/// Plain HTTP GET for a page's raw HTML, following redirects.
///
/// This is the non-rendering fetch path: no browser, no script execution.
#[derive(Debug, Clone)]
pub struct HtmlFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HtmlFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("pagepress/0.1")
            .redirect(reqwest::redirect::Policy::limited(10))
            // Safety defaults: avoid "hang forever" on DNS/TLS/body stalls.
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Upstream(e.to_string()))?;
        Ok(Self {
            client,
            max_bytes: DEFAULT_MAX_HTML_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Fetch `url` and return the body decoded lossily as text.
    ///
    /// Non-success statuses are upstream failures; the body is read through a
    /// stream so the `max_bytes` bound holds before allocation, not after.
    pub async fn fetch_html(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!("GET {url} returned HTTP {status}")));
        }

        let mut bytes: Vec<u8> = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Upstream(e.to_string()))?;
            if bytes.len().saturating_add(chunk.len()) > self.max_bytes {
                let can_take = self.max_bytes.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..can_take]);
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&bytes).to_string())
    }
}
