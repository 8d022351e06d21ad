//! Pixel work for the two composite layouts.

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::annotation::BoundingBox;
use crate::error::{Result, SynthError};
use crate::geometry::{horizontal_layout, vertical_layout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Side by side, top-aligned, then scaled to the target width.
    Horizontal,
    /// Each scaled to the target width, then stacked.
    Vertical,
}

impl Layout {
    pub fn as_str(self) -> &'static str {
        match self {
            Layout::Horizontal => "horizontal",
            Layout::Vertical => "vertical",
        }
    }
}

/// Composed pair with the boxes of both source images.
pub struct Composite {
    pub image: RgbImage,
    pub boxes: [BoundingBox; 2],
}

fn ensure_nonempty(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(SynthError::Degenerate { width, height });
    }
    Ok(())
}

pub fn compose(layout: Layout, first: &RgbImage, second: &RgbImage, target_width: u32) -> Result<Composite> {
    ensure_nonempty(first.width(), first.height())?;
    ensure_nonempty(second.width(), second.height())?;
    match layout {
        Layout::Horizontal => compose_horizontal(first, second, target_width),
        Layout::Vertical => compose_vertical(first, second, target_width),
    }
}

fn compose_horizontal(first: &RgbImage, second: &RgbImage, target_width: u32) -> Result<Composite> {
    let geometry = horizontal_layout(first.dimensions(), second.dimensions(), target_width);
    let (cw, ch) = geometry.canvas;
    let (sw, sh) = geometry.scaled;
    ensure_nonempty(sw, sh)?;

    // Zeroed buffer is black.
    let mut canvas = RgbImage::new(cw, ch);
    imageops::replace(&mut canvas, first, 0, 0);
    imageops::replace(&mut canvas, second, i64::from(first.width()), 0);

    let image = imageops::resize(&canvas, sw, sh, FilterType::Lanczos3);
    Ok(Composite {
        image,
        boxes: [geometry.left, geometry.right],
    })
}

fn compose_vertical(first: &RgbImage, second: &RgbImage, target_width: u32) -> Result<Composite> {
    let geometry = vertical_layout(first.dimensions(), second.dimensions(), target_width);
    let (h1, h2) = geometry.heights;
    ensure_nonempty(target_width, h1)?;
    ensure_nonempty(target_width, h2)?;

    let top = imageops::resize(first, target_width, h1, FilterType::Lanczos3);
    let bottom = imageops::resize(second, target_width, h2, FilterType::Lanczos3);

    let (cw, ch) = geometry.canvas;
    let mut canvas = RgbImage::new(cw, ch);
    imageops::replace(&mut canvas, &top, 0, 0);
    imageops::replace(&mut canvas, &bottom, 0, i64::from(h1));

    Ok(Composite {
        image: canvas,
        boxes: [geometry.top, geometry.bottom],
    })
}
