//! Stage 1: discover every seasonal directory linked from the archive page.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::LazyLock;

use corpus_common::{Result, SeasonRef};
use regex::Regex;
use scraper::{Html, Selector};
use site_client::{FetchError, Fetcher, RetryPolicy};
use tracing::{info, warn};

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

fn season_prefix(root: &str) -> Option<Regex> {
    let pattern = format!(
        r"^{}/\d{{4}}/(spring|summer|fall|winter)",
        regex::escape(root.trim_end_matches('/'))
    );
    Regex::new(&pattern).ok()
}

/// Every `<a href>` that starts with `{root}/{year}/{season}`, in first-seen
/// order with duplicates removed.
pub fn extract_season_urls(html: &str, root: &str) -> Vec<String> {
    let Some(prefix) = season_prefix(root) else {
        warn!(root, "Season root does not form a valid pattern");
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if prefix.is_match(href) && seen.insert(href) {
            urls.push(href.to_string());
        }
    }
    urls
}

/// Stable sort: newest year first, then the fixed per-year season priority.
/// Urls without a recognisable `{year}/{season}` sink to the end.
pub fn sort_season_urls(urls: &mut [String]) {
    urls.sort_by_cached_key(|url| match SeasonRef::parse(url) {
        Some(r) => (false, r.sort_key()),
        None => (true, (Reverse(0), u8::MAX)),
    });
}

/// Fetch the archive page and return its season urls, sorted.
///
/// A fetch that exhausts its retries propagates. A page with no matching
/// anchors is an empty list.
pub async fn harvest_index(
    fetcher: &dyn Fetcher,
    retry: &RetryPolicy,
    archive_url: &str,
    root: &str,
) -> Result<Vec<String>> {
    let html = retry
        .run(
            "season_index",
            || fetcher.get_text(archive_url),
            FetchError::is_transient,
        )
        .await?;

    let mut urls = extract_season_urls(&html, root);
    sort_season_urls(&mut urls);

    info!(archive_url, seasons = urls.len(), "Season index harvested");
    Ok(urls)
}
