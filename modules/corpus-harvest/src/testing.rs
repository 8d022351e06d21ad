// Test doubles for the harvest stages.
//
// MockFetcher answers from scripted pages and byte payloads, can be told to
// fail a url a fixed number of times before answering, and counts every call
// so tests can assert on what was (not) fetched. With a latency set it also
// tracks the peak number of requests in flight at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use corpus_common::Progress;
use site_client::{FetchError, Fetcher, Result};

#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    bytes: HashMap<String, Vec<u8>>,
    /// Remaining forced failures per url.
    failures: Mutex<HashMap<String, usize>>,
    calls: Mutex<HashMap<String, usize>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Holds one in-flight slot until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    pub fn on_bytes(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bytes.insert(url.to_string(), body.into());
        self
    }

    /// Fail the next `times` requests for `url` with a 503.
    pub fn failing(self, url: &str, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(url.to_string(), times);
        self
    }

    /// Hold every request open for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Most requests observed in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn record(&self, url: &str) -> Result<()> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let mut failures = self.failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::Status {
                    status: 503,
                    url: url.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        InFlight(&self.in_flight)
    }

    fn not_found(url: &str) -> FetchError {
        FetchError::Status {
            status: 404,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        let _slot = self.enter().await;
        self.record(url)?;
        self.pages.get(url).cloned().ok_or_else(|| Self::not_found(url))
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let _slot = self.enter().await;
        self.record(url)?;
        self.bytes.get(url).cloned().ok_or_else(|| Self::not_found(url))
    }
}

/// Records progress calls for assertions.
#[derive(Default)]
pub struct CountingProgress {
    pub total: AtomicUsize,
    pub advanced: AtomicUsize,
    pub finished: AtomicUsize,
}

impl Progress for CountingProgress {
    fn begin(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    fn advance(&self) {
        self.advanced.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Page builders
// ---------------------------------------------------------------------------

/// Archive page linking every given url.
pub fn archive_page(urls: &[&str]) -> String {
    let anchors: String = urls
        .iter()
        .map(|u| format!(r#"<li><a href="{u}">{u}</a></li>"#))
        .collect();
    format!("<html><body><ul>{anchors}</ul></body></html>")
}

/// Season page listing `(url, title)` pairs.
pub fn season_page(items: &[(&str, &str)]) -> String {
    let entries: String = items
        .iter()
        .map(|(url, title)| {
            format!(
                r#"<div class="seasonal-anime"><h2 class="h2_anime_title"><a href="{url}" class="link-title">{title}</a></h2></div>"#
            )
        })
        .collect();
    format!("<html><body>{entries}</body></html>")
}

/// Gallery page with one picture anchor per image url.
pub fn gallery_page(pics: &[&str]) -> String {
    let anchors: String = pics
        .iter()
        .map(|src| {
            format!(
                r#"<a href="{src}" class="js-picture-gallery" rel="gallery-anime"><img data-src="{src}" alt="pic"></a>"#
            )
        })
        .collect();
    format!("<html><body><div class=\"picSurround\">{anchors}</div></body></html>")
}
