//! Checkpoint-to-checkpoint execution of stages 1–4.
//!
//! Each stage reads its input checkpoint, runs its worker pool to completion,
//! and writes its output checkpoint exactly once afterwards.

use std::sync::Arc;

use corpus_common::{
    read_checkpoint, read_checkpoint_or_default, write_checkpoint, GalleryResult, ItemListing,
    PipelineConfig, Progress, Result, StageReport,
};
use site_client::{Fetcher, RetryPolicy};
use tracing::info;

use crate::{crawl_links, download_all, harvest_index, plan_downloads, scrape_galleries};

pub struct StageRunner {
    config: PipelineConfig,
    fetcher: Arc<dyn Fetcher>,
    retry: RetryPolicy,
}

impl StageRunner {
    pub fn new(config: PipelineConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let retry = config.retry_policy();
        Self {
            config,
            fetcher,
            retry,
        }
    }

    /// Override the retry policy taken from config.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stage 1: archive page to sorted season urls.
    pub async fn index(&self, progress: &dyn Progress) -> Result<StageReport> {
        let site = &self.config.site;
        progress.begin(1);
        let urls = harvest_index(
            self.fetcher.as_ref(),
            &self.retry,
            &site.archive_url,
            &site.season_root,
        )
        .await?;
        progress.advance();
        progress.finish();

        write_checkpoint(&self.config.paths.index, &urls)?;

        let mut report = StageReport::new("index");
        report.discovered = urls.len();
        report.log();
        Ok(report)
    }

    /// Stage 2: season urls to the merged listing superset.
    pub async fn links(&self, progress: &dyn Progress) -> Result<StageReport> {
        let paths = &self.config.paths;
        let season_urls: Vec<String> = read_checkpoint(&paths.index)?;
        let prior: Vec<ItemListing> = read_checkpoint_or_default(&paths.links)?;
        info!(seasons = season_urls.len(), known = prior.len(), "Starting link crawl");

        let outcome = crawl_links(
            Arc::clone(&self.fetcher),
            &self.retry,
            &season_urls,
            prior,
            self.config.workers.links,
            progress,
        )
        .await;

        write_checkpoint(&paths.links, &outcome.merged)?;

        let mut report = StageReport::new("links");
        report.discovered = outcome.new_items;
        report.skipped = season_urls.len().saturating_sub(outcome.pages_scanned);
        report.failed = outcome.failed_pages;
        report.log();
        Ok(report)
    }

    /// Stage 3: listings to gallery image urls.
    pub async fn galleries(&self, progress: &dyn Progress) -> Result<StageReport> {
        let paths = &self.config.paths;
        let listings: Vec<ItemListing> = read_checkpoint(&paths.links)?;

        let scrape = scrape_galleries(
            self.fetcher.as_ref(),
            &self.retry,
            &listings,
            self.config.workers.galleries,
            progress,
        )
        .await;

        write_checkpoint(&paths.galleries, &scrape.results)?;

        let mut report = StageReport::new("galleries");
        report.discovered = scrape.results.iter().map(|g| g.pics.len()).sum();
        report.skipped = scrape.malformed;
        report.failed = scrape.failed;
        report.log();
        Ok(report)
    }

    /// Stage 4: gallery urls to files in the image store.
    pub async fn download(&self, progress: &dyn Progress) -> Result<StageReport> {
        let paths = &self.config.paths;
        let galleries: Vec<GalleryResult> = read_checkpoint(&paths.galleries)?;

        let plan = plan_downloads(&galleries);
        info!(
            tasks = plan.tasks.len(),
            dropped = plan.dropped,
            collapsed = plan.collapsed,
            "Download plan ready"
        );

        let summary = download_all(
            self.fetcher.as_ref(),
            &self.retry,
            &paths.image_store,
            &plan.tasks,
            self.config.workers.downloads,
            progress,
        )
        .await?;

        let mut report = StageReport::new("download");
        report.discovered = summary.fetched;
        report.skipped = summary.skipped + plan.dropped + plan.collapsed;
        report.failed = summary.failed;
        report.log();
        Ok(report)
    }

    /// Stages 1–4 in order. `progress_for` supplies a reporter per stage.
    pub async fn run_all<F>(&self, progress_for: F) -> Result<Vec<StageReport>>
    where
        F: Fn(&'static str) -> Box<dyn Progress>,
    {
        let mut reports = Vec::with_capacity(4);
        reports.push(self.index(progress_for("index").as_ref()).await?);
        reports.push(self.links(progress_for("links").as_ref()).await?);
        reports.push(self.galleries(progress_for("galleries").as_ref()).await?);
        reports.push(self.download(progress_for("download").as_ref()).await?);
        Ok(reports)
    }
}
