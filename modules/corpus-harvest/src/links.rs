//! Stage 2: incremental item-link crawl over the season pages.
//!
//! Season pages are fetched concurrently but consumed strictly in index order.
//! The first listing already present in the prior checkpoint means everything
//! after it was collected on an earlier run, so the crawl stops there.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use corpus_common::{ItemListing, Progress};
use futures::stream::{self, StreamExt};
use scraper::{ElementRef, Html, Selector};
use site_client::{FetchError, Fetcher, RetryPolicy};
use tracing::{debug, info, warn};

static TITLE_HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2.h2_anime_title").expect("valid selector"));

static TITLE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.link-title").expect("valid selector"));

/// Anchor text with each text node trimmed, then joined without separators.
fn stripped_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

/// Listings on one season page, in page order.
pub fn extract_item_listings(html: &str) -> Vec<ItemListing> {
    let document = Html::parse_document(html);
    document
        .select(&TITLE_HEADING)
        .filter_map(|heading| {
            let link = heading.select(&TITLE_LINK).next()?;
            let href = link.value().attr("href").filter(|h| !h.is_empty())?;
            Some(ItemListing::new(href, stripped_text(link)))
        })
        .collect()
}

/// Union of a run's new listings with the prior superset.
///
/// New listings come first; a listing seen twice keeps its first position.
/// The result is stably sorted by item id, highest first.
pub fn merge_superset(new: Vec<ItemListing>, prior: Vec<ItemListing>) -> Vec<ItemListing> {
    let mut seen = HashSet::new();
    let mut merged: Vec<ItemListing> = new
        .into_iter()
        .chain(prior)
        .filter(|l| seen.insert((l.url.clone(), l.title.clone())))
        .collect();
    merged.sort_by_key(|l| std::cmp::Reverse(l.id()));
    merged
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrawlOutcome {
    /// New listings merged into the prior superset.
    pub merged: Vec<ItemListing>,
    pub new_items: usize,
    pub pages_scanned: usize,
    pub failed_pages: usize,
    /// Index of the season page on which a known listing was found.
    pub stopped_at: Option<usize>,
}

/// Crawl `season_urls` in order, collecting listings until one already in
/// `prior` turns up.
///
/// At most `workers` page fetches are in flight. Once the stop trips, no
/// further pages are scheduled; fetches already running finish in the
/// background and their results are dropped. A page that fails after retries
/// contributes nothing and is counted.
pub async fn crawl_links(
    fetcher: Arc<dyn Fetcher>,
    retry: &RetryPolicy,
    season_urls: &[String],
    prior: Vec<ItemListing>,
    workers: usize,
    progress: &dyn Progress,
) -> CrawlOutcome {
    let known: HashSet<(String, String)> = prior
        .iter()
        .map(|l| (l.url.clone(), l.title.clone()))
        .collect();

    progress.begin(season_urls.len());

    let mut pages = stream::iter(season_urls.iter().cloned())
        .map(|url| {
            let fetcher = Arc::clone(&fetcher);
            let retry = retry.clone();
            tokio::spawn(async move {
                retry
                    .run(
                        "season_page",
                        || fetcher.get_text(&url),
                        FetchError::is_transient,
                    )
                    .await
                    .map(|html| extract_item_listings(&html))
            })
        })
        .buffered(workers.max(1))
        .enumerate();

    let mut new = Vec::new();
    let mut failed_pages = 0;
    let mut pages_scanned = 0;
    let mut stopped_at = None;

    'pages: while let Some((idx, joined)) = pages.next().await {
        progress.advance();
        pages_scanned += 1;
        let url = &season_urls[idx];

        let listings = match joined {
            Ok(Ok(listings)) => listings,
            Ok(Err(e)) => {
                warn!(url = %url, error = %e, "Season page failed, skipping");
                failed_pages += 1;
                continue;
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Season page task aborted");
                failed_pages += 1;
                continue;
            }
        };

        debug!(url = %url, listings = listings.len(), "Season page scanned");
        for listing in listings {
            if known.contains(&(listing.url.clone(), listing.title.clone())) {
                info!(url = %url, item = %listing.url, "Reached known listing, stopping crawl");
                stopped_at = Some(idx);
                break 'pages;
            }
            new.push(listing);
        }
    }
    drop(pages);
    progress.finish();

    let before = prior.len();
    let merged = merge_superset(new, prior);
    let new_items = merged.len().saturating_sub(before);

    info!(
        new_items,
        total = merged.len(),
        pages_scanned,
        failed_pages,
        "Link crawl finished"
    );

    CrawlOutcome {
        merged,
        new_items,
        pages_scanned,
        failed_pages,
        stopped_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: u64, title: &str) -> ItemListing {
        ItemListing::new(format!("https://myanimelist.net/anime/{id}/x"), title)
    }

    #[test]
    fn extracts_first_link_title_per_heading() {
        let html = r#"
            <div>
              <h2 class="h2_anime_title"><a class="link-title" href="https://myanimelist.net/anime/1/a">
                  Alpha
                  <span> Beta </span>
              </a><a class="link-title" href="https://myanimelist.net/anime/99/z">ignored</a></h2>
              <h2 class="h2_anime_title"><a class="link-title" href="">Empty</a></h2>
              <h2 class="h2_anime_title"><span>no link</span></h2>
              <h2 class="other"><a class="link-title" href="https://myanimelist.net/anime/3/c">Other</a></h2>
              <h2 class="h2_anime_title"><a class="link-title" href="https://myanimelist.net/anime/2/b">Gamma</a></h2>
            </div>"#;

        let listings = extract_item_listings(html);
        assert_eq!(
            listings,
            vec![
                ItemListing::new("https://myanimelist.net/anime/1/a", "AlphaBeta"),
                ItemListing::new("https://myanimelist.net/anime/2/b", "Gamma"),
            ]
        );
    }

    #[test]
    fn merge_prefers_new_and_sorts_by_id_descending() {
        let prior = vec![listing(5, "five"), listing(3, "three")];
        let new = vec![listing(4, "four"), listing(5, "five"), listing(9, "nine")];

        let merged = merge_superset(new, prior);
        let ids: Vec<u64> = merged.iter().map(ItemListing::id).collect();
        assert_eq!(ids, vec![9, 5, 4, 3]);
    }

    #[test]
    fn merge_keeps_retitled_item_as_separate_listing() {
        let merged = merge_superset(vec![listing(7, "New Title")], vec![listing(7, "Old Title")]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].title, "New Title", "stable sort keeps new first");
    }

    #[test]
    fn merge_of_prior_with_nothing_new_is_identity() {
        let prior = merge_superset(vec![listing(2, "b"), listing(8, "h")], Vec::new());
        assert_eq!(merge_superset(Vec::new(), prior.clone()), prior);
    }
}
