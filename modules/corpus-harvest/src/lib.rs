//! Network-facing stages of the corpus pipeline: season index, item links,
//! galleries and image downloads.

pub mod download;
pub mod gallery;
pub mod index;
pub mod links;
pub mod runner;
#[cfg(feature = "test-support")]
pub mod testing;

pub use download::{download_all, download_one, plan_downloads, DownloadOutcome, DownloadPlan};
pub use gallery::{extract_gallery_images, gallery_url, scrape_galleries, GalleryPage, GalleryScrape};
pub use index::{extract_season_urls, harvest_index, sort_season_urls};
pub use links::{crawl_links, extract_item_listings, merge_superset, CrawlOutcome};
pub use runner::StageRunner;
