//! Every fan-out stage keeps at most `workers` requests in flight.

use std::sync::Arc;
use std::time::Duration;

use corpus_common::{DownloadTask, ItemListing, NullProgress};
use corpus_harvest::testing::{gallery_page, season_page, MockFetcher};
use corpus_harvest::{crawl_links, download_all, scrape_galleries};
use site_client::RetryPolicy;

const LATENCY: Duration = Duration::from_millis(20);

fn quick_retry() -> RetryPolicy {
    RetryPolicy::new(1, Duration::ZERO, 1.0)
}

fn item_url(n: usize) -> String {
    format!("https://myanimelist.net/anime/{n}/Item_{n}")
}

fn pic_url(n: usize) -> String {
    format!("https://cdn.myanimelist.net/images/anime/1/{n}.jpg")
}

#[tokio::test]
async fn link_crawl_respects_worker_cap() {
    let seasons: Vec<String> = (0..12)
        .map(|n| format!("https://myanimelist.net/anime/season/{}/fall", 2024 - n))
        .collect();
    let mut fetcher = MockFetcher::new().with_latency(LATENCY);
    for (n, season) in seasons.iter().enumerate() {
        let url = item_url(1000 - n);
        fetcher = fetcher.on_page(season, season_page(&[(url.as_str(), "Item")]));
    }
    let fetcher = Arc::new(fetcher);

    let outcome = crawl_links(
        fetcher.clone(),
        &quick_retry(),
        &seasons,
        Vec::new(),
        3,
        &NullProgress,
    )
    .await;

    assert_eq!(outcome.new_items, 12);
    let peak = fetcher.peak_in_flight();
    assert!(peak <= 3, "links peaked at {peak} with 3 workers");
    assert!(peak > 1, "pages were fetched one at a time");
}

#[tokio::test]
async fn gallery_scrape_respects_worker_cap() {
    let listings: Vec<ItemListing> = (1..=12)
        .map(|n| ItemListing::new(item_url(n), "Item"))
        .collect();
    let mut fetcher = MockFetcher::new().with_latency(LATENCY);
    for (n, listing) in listings.iter().enumerate() {
        let pic = pic_url(n + 1);
        let gallery = format!("{}/pics", listing.url);
        fetcher = fetcher.on_page(&gallery, gallery_page(&[pic.as_str()]));
    }

    let scrape = scrape_galleries(&fetcher, &quick_retry(), &listings, 5, &NullProgress).await;

    assert_eq!(scrape.results.len(), 12);
    let peak = fetcher.peak_in_flight();
    assert!(peak <= 5, "galleries peaked at {peak} with 5 workers");
    assert!(peak > 1, "galleries were fetched one at a time");
}

#[tokio::test]
async fn downloads_respect_worker_cap() {
    let store = tempfile::tempdir().unwrap();
    let mut fetcher = MockFetcher::new().with_latency(LATENCY);
    let mut tasks = Vec::new();
    for n in 1..=10 {
        let pic = pic_url(n);
        fetcher = fetcher.on_bytes(&pic, vec![n as u8; 16]);
        tasks.push(DownloadTask::from_urls(&item_url(n), &pic).unwrap());
    }

    let summary = download_all(&fetcher, &quick_retry(), store.path(), &tasks, 4, &NullProgress)
        .await
        .unwrap();

    assert_eq!(summary.fetched, 10);
    let peak = fetcher.peak_in_flight();
    assert!(peak <= 4, "downloads peaked at {peak} with 4 workers");
    assert!(peak > 1, "downloads ran one at a time");
}
