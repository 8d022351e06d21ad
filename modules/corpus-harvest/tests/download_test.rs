//! Gallery scraping and idempotent downloads against scripted responses.

use std::time::Duration;

use corpus_common::{DownloadTask, ItemListing, NullProgress};
use corpus_harvest::testing::{gallery_page, MockFetcher};
use corpus_harvest::{download_all, download_one, plan_downloads, scrape_galleries, DownloadOutcome};
use site_client::RetryPolicy;

const ITEM_1: &str = "https://myanimelist.net/anime/1/Cowboy_Bebop";
const ITEM_2: &str = "https://myanimelist.net/anime/5/Cowboy_Bebop_Movie";
const PIC_1: &str = "https://cdn.myanimelist.net/images/anime/4/19644.jpg";
const PIC_2: &str = "https://cdn.myanimelist.net/images/anime/1/1007.jpg";

fn quick_retry() -> RetryPolicy {
    RetryPolicy::new(2, Duration::ZERO, 1.0)
}

#[tokio::test]
async fn gallery_failures_are_isolated() {
    let fetcher = MockFetcher::new().on_page(
        &format!("{ITEM_1}/pics"),
        gallery_page(&[PIC_1, PIC_2, PIC_1]),
    );
    let listings = vec![
        ItemListing::new(ITEM_1, "Cowboy Bebop"),
        ItemListing::new(ITEM_2, "Cowboy Bebop: The Movie"),
    ];

    let scrape = scrape_galleries(&fetcher, &quick_retry(), &listings, 200, &NullProgress).await;

    assert_eq!(scrape.failed, 1);
    assert_eq!(scrape.results.len(), 1);
    let gallery = &scrape.results[0];
    assert_eq!(gallery.url, ITEM_1);
    assert_eq!(gallery.title, "Cowboy Bebop");
    assert_eq!(gallery.pics, vec![PIC_1, PIC_2]);
}

#[tokio::test]
async fn existing_file_is_never_fetched_again() {
    let store = tempfile::tempdir().unwrap();
    let fetcher = MockFetcher::new().on_bytes(PIC_1, b"jpeg-bytes".to_vec());
    let task = DownloadTask::from_urls(ITEM_1, PIC_1).unwrap();

    let first = download_one(&fetcher, &quick_retry(), store.path(), &task).await.unwrap();
    let second = download_one(&fetcher, &quick_retry(), store.path(), &task).await.unwrap();

    assert_eq!(first, DownloadOutcome::Fetched);
    assert_eq!(second, DownloadOutcome::Skipped);
    assert_eq!(fetcher.calls(PIC_1), 1);
    assert_eq!(
        std::fs::read(store.path().join("1_19644.jpg")).unwrap(),
        b"jpeg-bytes"
    );
}

#[tokio::test]
async fn download_all_counts_and_leaves_no_partial_files() {
    let store = tempfile::tempdir().unwrap();
    let missing = "https://cdn.myanimelist.net/images/anime/9/999.jpg";
    let fetcher = MockFetcher::new()
        .on_bytes(PIC_1, vec![1, 2, 3])
        .on_bytes(PIC_2, vec![4, 5, 6]);

    std::fs::write(store.path().join("1_1007.jpg"), b"already here").unwrap();

    let galleries = vec![corpus_common::GalleryResult {
        url: ITEM_1.to_string(),
        title: "Cowboy Bebop".to_string(),
        pics: vec![PIC_1.to_string(), PIC_2.to_string(), missing.to_string()],
    }];
    let plan = plan_downloads(&galleries);
    assert_eq!(plan.tasks.len(), 3);

    let summary = download_all(&fetcher, &quick_retry(), store.path(), &plan.tasks, 100, &NullProgress)
        .await
        .unwrap();

    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(fetcher.calls(PIC_2), 0);
    assert_eq!(fetcher.calls(missing), 2);

    let mut names: Vec<String> = std::fs::read_dir(store.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["1_1007.jpg", "1_19644.jpg"]);
    assert_eq!(
        std::fs::read(store.path().join("1_1007.jpg")).unwrap(),
        b"already here"
    );
}

#[tokio::test]
async fn store_directory_is_created_on_demand() {
    let root = tempfile::tempdir().unwrap();
    let store = root.path().join("images");
    let fetcher = MockFetcher::new().on_bytes(PIC_1, vec![0xff, 0xd8]);
    let task = DownloadTask::from_urls(ITEM_1, PIC_1).unwrap();

    let summary = download_all(&fetcher, &quick_retry(), &store, &[task], 4, &NullProgress)
        .await
        .unwrap();

    assert_eq!(summary.fetched, 1);
    assert!(store.join("1_19644.jpg").is_file());
}
