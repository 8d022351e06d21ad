//! Stage 4: idempotent image downloads into a flat store directory.
//!
//! The filename `{item_id}_{image_id}.jpg` is the identity of a stored image.
//! A file that exists is never fetched again. Tasks are collapsed per filename
//! before any worker starts, and bytes land under a temp name that is renamed
//! into place, so the final name only ever holds a complete download.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use corpus_common::{item_id, CorpusError, DownloadTask, GalleryResult, Progress, Result};
use futures::stream::{self, StreamExt};
use site_client::{FetchError, Fetcher, RetryPolicy};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadPlan {
    pub tasks: Vec<DownloadTask>,
    /// Image urls whose item or image id could not be extracted.
    pub dropped: usize,
    /// Tasks that mapped onto a filename already planned.
    pub collapsed: usize,
}

/// Turn gallery results into one task per distinct target filename.
pub fn plan_downloads(galleries: &[GalleryResult]) -> DownloadPlan {
    let mut plan = DownloadPlan::default();
    let mut filenames = HashSet::new();

    for gallery in galleries {
        if item_id(&gallery.url).is_none() {
            debug!(url = %gallery.url, pics = gallery.pics.len(), "Item url has no id");
            plan.dropped += gallery.pics.len();
            continue;
        }
        for pic in &gallery.pics {
            let Some(task) = DownloadTask::from_urls(&gallery.url, pic) else {
                plan.dropped += 1;
                continue;
            };
            if filenames.insert(task.filename.clone()) {
                plan.tasks.push(task);
            } else {
                plan.collapsed += 1;
            }
        }
    }
    plan
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Fetched,
    Skipped,
}

fn persist_atomically(store: PathBuf, target: PathBuf, bytes: Vec<u8>) -> std::io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".partial-")
        .tempfile_in(&store)?;
    tmp.write_all(&bytes)?;
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(())
}

/// Download one image unless its file already exists in `store`.
pub async fn download_one(
    fetcher: &dyn Fetcher,
    retry: &RetryPolicy,
    store: &Path,
    task: &DownloadTask,
) -> Result<DownloadOutcome> {
    let target = store.join(&task.filename);
    if tokio::fs::try_exists(&target).await? {
        return Ok(DownloadOutcome::Skipped);
    }

    let bytes = retry
        .run(
            "image_download",
            || fetcher.get_bytes(&task.image_url),
            FetchError::is_transient,
        )
        .await?;

    let size = bytes.len();
    let store = store.to_path_buf();
    let written = target.clone();
    tokio::task::spawn_blocking(move || persist_atomically(store, written, bytes))
        .await
        .map_err(std::io::Error::other)??;

    debug!(file = %target.display(), bytes = size, "Image stored");
    Ok(DownloadOutcome::Fetched)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Run every task with up to `workers` downloads in flight. Per-task failures
/// are logged and counted; only failing to create `store` is an error.
pub async fn download_all(
    fetcher: &dyn Fetcher,
    retry: &RetryPolicy,
    store: &Path,
    tasks: &[DownloadTask],
    workers: usize,
    progress: &dyn Progress,
) -> Result<DownloadSummary> {
    tokio::fs::create_dir_all(store)
        .await
        .map_err(CorpusError::Io)?;

    progress.begin(tasks.len());

    let mut completions = stream::iter(tasks)
        .map(|task| async move { (task, download_one(fetcher, retry, store, task).await) })
        .buffer_unordered(workers.max(1));

    let mut summary = DownloadSummary::default();
    while let Some((task, outcome)) = completions.next().await {
        progress.advance();
        match outcome {
            Ok(DownloadOutcome::Fetched) => summary.fetched += 1,
            Ok(DownloadOutcome::Skipped) => summary.skipped += 1,
            Err(e) => {
                warn!(url = %task.image_url, file = %task.filename, error = %e, "Download failed");
                summary.failed += 1;
            }
        }
    }
    progress.finish();

    info!(
        fetched = summary.fetched,
        skipped = summary.skipped,
        failed = summary.failed,
        "Downloads finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery(url: &str, pics: &[&str]) -> GalleryResult {
        GalleryResult {
            url: url.to_string(),
            title: "t".to_string(),
            pics: pics.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn plan_drops_unidentifiable_urls() {
        let galleries = vec![
            gallery(
                "https://myanimelist.net/anime/21/One_Piece",
                &[
                    "https://cdn.myanimelist.net/images/anime/6/73245.jpg",
                    "https://cdn.myanimelist.net/images/anime/6/banner.png",
                ],
            ),
            gallery(
                "https://myanimelist.net/manga/13/One_Piece",
                &["https://cdn.myanimelist.net/images/manga/3/55539.jpg"],
            ),
        ];

        let plan = plan_downloads(&galleries);
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].filename, "21_73245.jpg");
        assert_eq!(plan.dropped, 2);
        assert_eq!(plan.collapsed, 0);
    }

    #[test]
    fn plan_collapses_same_filename_first_wins() {
        let galleries = vec![
            gallery(
                "https://myanimelist.net/anime/21/One_Piece",
                &["https://cdn.myanimelist.net/images/anime/6/73245.jpg"],
            ),
            gallery(
                "https://myanimelist.net/anime/21/One_Piece_retitled",
                &["https://cdn.myanimelist.net/images/anime/6/73245l.jpg?x=/73245.jpg"],
            ),
        ];

        let plan = plan_downloads(&galleries);
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(
            plan.tasks[0].image_url,
            "https://cdn.myanimelist.net/images/anime/6/73245.jpg"
        );
        assert_eq!(plan.collapsed, 1);
    }
}
