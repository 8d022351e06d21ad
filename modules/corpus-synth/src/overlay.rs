//! Caption text and the translucent circle drawn over each composite.

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, PxScale};
use chrono::{DateTime, Datelike, TimeZone};
use image::{Rgb, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use rand::Rng;
use tracing::info;

use crate::error::{Result, SynthError};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";
const HEX_LINE_LEN: usize = 40;

const MARGIN_X: i32 = 5;
const MARGIN_BOTTOM: i32 = 3;
const LINE_SPACING: i32 = 7;
/// The white plate behind the validity label is raised by these amounts at
/// its top and bottom edges.
const PLATE_RAISE_TOP: i32 = 3;
const PLATE_RAISE_BOTTOM: i32 = 6;

const CIRCLE_ALPHA: u8 = 128;

/// Ordinal suffix for a day of the month.
pub fn day_suffix(day: u32) -> &'static str {
    match (day % 10, day) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// `VALID   BEFORE   HH:MM:SS` and the full first caption line.
pub fn timestamp_lines<Tz: TimeZone>(now: &DateTime<Tz>) -> (String, String)
where
    Tz::Offset: std::fmt::Display,
{
    let label = format!("VALID   BEFORE   {}", now.format("%H:%M:%S"));
    let line = format!(
        "{label}   {}   {}{}   CST",
        now.format("%b"),
        now.format("%d"),
        day_suffix(now.day())
    );
    (label, line)
}

pub fn random_hex<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| HEX_DIGITS[rng.random_range(0..HEX_DIGITS.len())] as char)
        .collect()
}

pub fn random_rgb<R: Rng>(rng: &mut R) -> Rgb<u8> {
    Rgb([rng.random(), rng.random(), rng.random()])
}

/// Everything random about one caption, decided before drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    /// Part of `first_line` that sits on the white plate.
    pub plate_text: String,
    pub first_line: String,
    pub second_line: String,
    pub first_color: Rgb<u8>,
    pub second_color: Rgb<u8>,
}

impl Caption {
    pub fn random<R: Rng, Tz: TimeZone>(rng: &mut R, now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let (plate_text, first_line) = timestamp_lines(now);
        let second_line = random_hex(rng, HEX_LINE_LEN);
        let first_color = random_rgb(rng);
        let second_color = random_rgb(rng);
        Self {
            plate_text,
            first_line,
            second_line,
            first_color,
            second_color,
        }
    }
}

/// Renders a caption into the bottom-left corner of a canvas.
pub trait Captioner: Send + Sync {
    fn draw(&self, canvas: &mut RgbaImage, caption: &Caption);
}

/// Font loaded once and drawn at the two caption sizes.
pub struct FontCaptioner {
    font: FontVec,
    first_px: f32,
    second_px: f32,
}

impl FontCaptioner {
    /// Read a TrueType/OpenType font. Failure here is fatal for synthesis.
    pub fn load(path: &Path, first_px: f32, second_px: f32) -> Result<Self> {
        let asset_err = |reason: String| SynthError::AssetLoad {
            path: PathBuf::from(path),
            reason,
        };
        let data = std::fs::read(path).map_err(|e| asset_err(e.to_string()))?;
        let font = FontVec::try_from_vec(data).map_err(|e| asset_err(e.to_string()))?;
        info!(font = %path.display(), "Caption font loaded");
        Ok(Self {
            font,
            first_px,
            second_px,
        })
    }

    /// Scale whose em square is `px` pixels, the way point sizes are usually
    /// interpreted.
    fn scale(&self, px: f32) -> PxScale {
        let upem = self.font.units_per_em().unwrap_or(1.0);
        PxScale::from(px * self.font.height_unscaled() / upem)
    }
}

impl Captioner for FontCaptioner {
    fn draw(&self, canvas: &mut RgbaImage, caption: &Caption) {
        let (y1, y2) = caption_rows(canvas.height(), self.first_px, self.second_px);

        let first_scale = self.scale(self.first_px);
        let second_scale = self.scale(self.second_px);

        let (plate_w, plate_h) = text_size(first_scale, &self.font, &caption.plate_text);
        if let Some(rect) = plate_rect(y1, plate_w, plate_h) {
            draw_filled_rect_mut(canvas, rect, Rgba([255, 255, 255, 255]));
        }

        draw_text_mut(
            canvas,
            opaque(caption.first_color),
            MARGIN_X,
            y1,
            first_scale,
            &self.font,
            &caption.first_line,
        );
        draw_text_mut(
            canvas,
            opaque(caption.second_color),
            MARGIN_X,
            y2,
            second_scale,
            &self.font,
            &caption.second_line,
        );
    }
}

/// Top rows of the two caption lines on a canvas `height` pixels tall.
pub fn caption_rows(height: u32, first_px: f32, second_px: f32) -> (i32, i32) {
    let y2 = height as i32 - second_px as i32 - MARGIN_BOTTOM;
    let y1 = y2 - LINE_SPACING - first_px as i32;
    (y1, y2)
}

/// White plate behind a `text_w` x `text_h` label drawn at row `y1`. Both
/// corners are inclusive, so the plate is one pixel wider than the text.
/// `None` when the raised edges leave nothing to fill.
pub fn plate_rect(y1: i32, text_w: u32, text_h: u32) -> Option<Rect> {
    let top = y1 - PLATE_RAISE_TOP;
    let bottom = y1 + text_h as i32 - PLATE_RAISE_BOTTOM;
    if text_w == 0 || bottom < top {
        return None;
    }
    Some(Rect::at(MARGIN_X, top).of_size(text_w + 1, (bottom - top + 1) as u32))
}

fn opaque(Rgb([r, g, b]): Rgb<u8>) -> Rgba<u8> {
    Rgba([r, g, b, 255])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Circle {
    pub x: u32,
    pub y: u32,
    pub radius: u32,
    pub color: Rgb<u8>,
}

impl Circle {
    /// Radius uniform in `radius_range`, centre uniform over the positions that
    /// keep the whole circle on a `canvas`-sized image.
    pub fn random<R: Rng>(
        rng: &mut R,
        canvas: (u32, u32),
        radius_range: (u32, u32),
    ) -> Result<Self> {
        let (width, height) = canvas;
        let radius = rng.random_range(radius_range.0..=radius_range.1);
        if width < 2 * radius || height < 2 * radius {
            return Err(SynthError::CanvasTooSmall {
                width,
                height,
                radius,
            });
        }
        let x = rng.random_range(radius..=width - radius);
        let y = rng.random_range(radius..=height - radius);
        let color = random_rgb(rng);
        Ok(Self {
            x,
            y,
            radius,
            color,
        })
    }

    /// Alpha-blend the circle onto `canvas` at half opacity. Every pixel within
    /// `radius` of the centre is blended exactly once.
    pub fn draw(&self, mut canvas: RgbaImage) -> RgbaImage {
        let (width, height) = canvas.dimensions();
        let r = i64::from(self.radius);
        let (cx, cy) = (i64::from(self.x), i64::from(self.y));
        let x_range = (cx - r).max(0)..=(cx + r).min(i64::from(width) - 1);
        let y_range = (cy - r).max(0)..=(cy + r).min(i64::from(height) - 1);

        for y in y_range {
            for x in x_range.clone() {
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                *pixel = blend_over(*pixel, self.color, CIRCLE_ALPHA);
            }
        }
        canvas
    }
}

/// Source-over compositing of `color` at `alpha` onto `dst`.
fn blend_over(dst: Rgba<u8>, color: Rgb<u8>, alpha: u8) -> Rgba<u8> {
    let a = u32::from(alpha);
    let mix = |src: u8, dst: u8| {
        ((u32::from(src) * a + u32::from(dst) * (255 - a) + 127) / 255) as u8
    };
    let Rgba([dr, dg, db, da]) = dst;
    let Rgb([sr, sg, sb]) = color;
    let out_alpha = a + u32::from(da) * (255 - a) / 255;
    Rgba([mix(sr, dr), mix(sg, dg), mix(sb, db), out_alpha.min(255) as u8])
}
