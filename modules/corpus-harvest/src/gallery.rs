//! Stage 3: per-item picture galleries.

use std::collections::HashSet;
use std::sync::LazyLock;

use corpus_common::{GalleryResult, ItemListing, Progress};
use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use site_client::{FetchError, Fetcher, RetryPolicy};
use tracing::{debug, info, warn};

static GALLERY_ANCHOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a.js-picture-gallery[rel~="gallery-anime"]"#).expect("valid selector")
});

static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("valid selector"));

pub fn gallery_url(item_url: &str) -> String {
    format!("{}/pics", item_url.trim_end_matches('/'))
}

/// Image urls found on one gallery page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryPage {
    pub pics: Vec<String>,
    /// Gallery anchors without an `img` or without `data-src`.
    pub malformed: usize,
}

pub fn extract_gallery_images(html: &str) -> GalleryPage {
    let document = Html::parse_document(html);
    let mut page = GalleryPage::default();
    let mut seen = HashSet::new();

    for anchor in document.select(&GALLERY_ANCHOR) {
        let src = anchor
            .select(&IMG)
            .next()
            .and_then(|img| img.value().attr("data-src"))
            .filter(|src| !src.is_empty());
        match src {
            Some(src) => {
                if seen.insert(src) {
                    page.pics.push(src.to_string());
                }
            }
            None => page.malformed += 1,
        }
    }
    page
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GalleryScrape {
    /// One entry per item whose gallery was fetched, in completion order.
    pub results: Vec<GalleryResult>,
    pub failed: usize,
    pub malformed: usize,
}

async fn scrape_one(
    fetcher: &dyn Fetcher,
    retry: &RetryPolicy,
    listing: &ItemListing,
) -> Result<GalleryPage, FetchError> {
    let url = gallery_url(&listing.url);
    let html = retry
        .run("gallery_page", || fetcher.get_text(&url), FetchError::is_transient)
        .await?;
    let page = extract_gallery_images(&html);
    debug!(url = %url, pics = page.pics.len(), "Gallery scraped");
    Ok(page)
}

/// Fetch every item's gallery with up to `workers` requests in flight.
/// A failing item is logged and counted; its siblings are unaffected.
pub async fn scrape_galleries(
    fetcher: &dyn Fetcher,
    retry: &RetryPolicy,
    listings: &[ItemListing],
    workers: usize,
    progress: &dyn Progress,
) -> GalleryScrape {
    progress.begin(listings.len());

    let mut completions = stream::iter(listings)
        .map(|listing| async move { (listing, scrape_one(fetcher, retry, listing).await) })
        .buffer_unordered(workers.max(1));

    let mut scrape = GalleryScrape::default();
    while let Some((listing, outcome)) = completions.next().await {
        progress.advance();
        match outcome {
            Ok(page) => {
                scrape.malformed += page.malformed;
                scrape.results.push(GalleryResult {
                    url: listing.url.clone(),
                    title: listing.title.clone(),
                    pics: page.pics,
                });
            }
            Err(e) => {
                warn!(url = %listing.url, error = %e, "Gallery fetch failed");
                scrape.failed += 1;
            }
        }
    }
    progress.finish();

    info!(
        items = scrape.results.len(),
        failed = scrape.failed,
        malformed = scrape.malformed,
        "Gallery scrape finished"
    );
    scrape
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_url_appends_pics_once() {
        assert_eq!(
            gallery_url("https://myanimelist.net/anime/1/Cowboy_Bebop/"),
            "https://myanimelist.net/anime/1/Cowboy_Bebop/pics"
        );
        assert_eq!(
            gallery_url("https://myanimelist.net/anime/1/Cowboy_Bebop"),
            "https://myanimelist.net/anime/1/Cowboy_Bebop/pics"
        );
    }

    #[test]
    fn extracts_data_src_in_order_without_duplicates() {
        let html = r##"
            <a class="js-picture-gallery" rel="gallery-anime" href="#"><img data-src="https://cdn/images/anime/1/10.jpg"></a>
            <a class="js-picture-gallery" rel="gallery-anime" href="#"><img data-src="https://cdn/images/anime/1/11.jpg"></a>
            <a class="js-picture-gallery" rel="gallery-anime" href="#"><img data-src="https://cdn/images/anime/1/10.jpg"></a>
            <a class="js-picture-gallery other" rel="nofollow gallery-anime" href="#"><img data-src="https://cdn/images/anime/1/12.jpg"></a>
            <a class="js-picture-gallery" rel="gallery-manga" href="#"><img data-src="https://cdn/images/manga/1/13.jpg"></a>
            <a class="js-picture-gallery" rel="gallery-anime" href="#"><img src="https://cdn/no-data-src.jpg"></a>
            <a class="js-picture-gallery" rel="gallery-anime" href="#">no image</a>
        "##;
        let page = extract_gallery_images(html);
        assert_eq!(
            page.pics,
            vec![
                "https://cdn/images/anime/1/10.jpg",
                "https://cdn/images/anime/1/11.jpg",
                "https://cdn/images/anime/1/12.jpg",
            ]
        );
        assert_eq!(page.malformed, 2);
    }

    #[test]
    fn page_without_gallery_is_empty_not_an_error() {
        let page = extract_gallery_images("<html><body><p>No pictures</p></body></html>");
        assert_eq!(page, GalleryPage::default());
    }
}
