//! Batch production of labeled composites from the downloaded image store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use corpus_common::config::SynthConfig;
use corpus_common::{Progress, StageReport};
use futures::stream::{self, StreamExt};
use image::{DynamicImage, RgbImage};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::annotation::{write_label, BoundingBox};
use crate::compose::{compose, Layout};
use crate::error::{Result, SynthError};
use crate::geometry::circle_box;
use crate::overlay::{Caption, Captioner, Circle};

const SOURCE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// Image files directly inside `dir`, sorted by path.
pub fn list_source_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SOURCE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_image && path.is_file() {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Geometry knobs for a synthesis run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthSettings {
    pub target_width: u32,
    pub radius_min: u32,
    pub radius_max: u32,
}

impl Default for SynthSettings {
    fn default() -> Self {
        Self::from(&SynthConfig::default())
    }
}

impl From<&SynthConfig> for SynthSettings {
    fn from(config: &SynthConfig) -> Self {
        Self {
            target_width: config.target_width,
            radius_min: config.radius_min,
            radius_max: config.radius_max,
        }
    }
}

/// A rendered composite: the image plus boxes for the first source image,
/// the second, and the circle, in that order.
pub struct Rendered {
    pub image: RgbImage,
    pub layout: Layout,
    pub boxes: [BoundingBox; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeSample {
    pub index: usize,
    pub image_path: PathBuf,
    pub label_path: PathBuf,
    pub annotations: [BoundingBox; 3],
}

pub struct Synthesizer {
    sources: Vec<PathBuf>,
    captioner: Arc<dyn Captioner>,
    settings: SynthSettings,
    image_dir: PathBuf,
    label_dir: PathBuf,
}

impl Synthesizer {
    pub fn new(
        sources: Vec<PathBuf>,
        captioner: Arc<dyn Captioner>,
        settings: SynthSettings,
        image_dir: impl Into<PathBuf>,
        label_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        if sources.len() < 2 {
            return Err(SynthError::NotEnoughImages {
                found: sources.len(),
            });
        }
        Ok(Self {
            sources,
            captioner,
            settings,
            image_dir: image_dir.into(),
            label_dir: label_dir.into(),
        })
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Compose, caption and mark one pair of already-decoded images.
    pub fn render<R: Rng, Tz: TimeZone>(
        &self,
        layout: Layout,
        first: &RgbImage,
        second: &RgbImage,
        rng: &mut R,
        now: &DateTime<Tz>,
    ) -> Result<Rendered>
    where
        Tz::Offset: std::fmt::Display,
    {
        let composite = compose(layout, first, second, self.settings.target_width)?;

        let mut canvas = DynamicImage::ImageRgb8(composite.image).into_rgba8();
        let caption = Caption::random(rng, now);
        self.captioner.draw(&mut canvas, &caption);

        let dims = canvas.dimensions();
        let circle = Circle::random(
            rng,
            dims,
            (self.settings.radius_min, self.settings.radius_max),
        )?;
        let canvas = circle.draw(canvas);
        let circle_label = circle_box(circle.x, circle.y, circle.radius, dims);

        let [first_box, second_box] = composite.boxes;
        Ok(Rendered {
            image: DynamicImage::ImageRgba8(canvas).into_rgb8(),
            layout,
            boxes: [first_box, second_box, circle_label],
        })
    }

    /// Produce sample `index`: pick a layout and two distinct sources, render,
    /// and write `{index:05}.jpg` plus `{index:05}.txt`.
    pub fn generate_sample<R: Rng>(&self, index: usize, rng: &mut R) -> Result<CompositeSample> {
        let layout = if rng.random_bool(0.5) {
            Layout::Horizontal
        } else {
            Layout::Vertical
        };
        let picks = rand::seq::index::sample(rng, self.sources.len(), 2);
        let first_path = &self.sources[picks.index(0)];
        let second_path = &self.sources[picks.index(1)];

        let first = image::open(first_path)?.into_rgb8();
        let second = image::open(second_path)?.into_rgb8();

        let rendered = self.render(layout, &first, &second, rng, &Local::now())?;

        let stem = format!("{index:05}");
        let image_path = self.image_dir.join(format!("{stem}.jpg"));
        let label_path = self.label_dir.join(format!("{stem}.txt"));
        rendered.image.save(&image_path)?;
        write_label(&label_path, &rendered.boxes)?;

        debug!(
            index,
            layout = layout.as_str(),
            first = %first_path.display(),
            second = %second_path.display(),
            "Sample written"
        );
        Ok(CompositeSample {
            index,
            image_path,
            label_path,
            annotations: rendered.boxes,
        })
    }
}

/// Generate samples `1..=count` with at most `workers` rendering at once.
///
/// Each sample runs on the blocking pool with its own random source. A failed
/// sample is logged and counted; the batch carries on.
pub async fn generate_batch(
    synth: Arc<Synthesizer>,
    count: usize,
    workers: usize,
    progress: &dyn Progress,
) -> Result<StageReport> {
    tokio::fs::create_dir_all(&synth.image_dir).await?;
    tokio::fs::create_dir_all(&synth.label_dir).await?;

    info!(
        count,
        workers,
        sources = synth.source_count(),
        "Starting composite synthesis"
    );
    progress.begin(count);

    let mut completions = stream::iter(1..=count)
        .map(|index| {
            let synth = Arc::clone(&synth);
            let handle = tokio::task::spawn_blocking(move || {
                let mut rng = rand::rng();
                synth.generate_sample(index, &mut rng)
            });
            async move { (index, handle.await) }
        })
        .buffer_unordered(workers.max(1));

    let mut report = StageReport::new("generate");
    while let Some((index, joined)) = completions.next().await {
        progress.advance();
        match joined {
            Ok(Ok(_)) => report.discovered += 1,
            Ok(Err(e)) => {
                warn!(index, error = %e, "Sample failed");
                report.failed += 1;
            }
            Err(e) => {
                warn!(index, error = %e, "Sample task panicked");
                report.failed += 1;
            }
        }
    }
    progress.finish();

    report.log();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_image_files_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.JPG", "a.png", "notes.txt", "c.jpeg", "d.webp"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.jpg")).unwrap();

        let names: Vec<String> = list_source_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.JPG", "c.jpeg"]);
    }

    #[test]
    fn settings_follow_config() {
        let settings = SynthSettings::default();
        assert_eq!(settings.target_width, 500);
        assert_eq!((settings.radius_min, settings.radius_max), (15, 50));
    }
}
