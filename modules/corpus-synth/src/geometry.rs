//! Canvas sizes and box fractions for the two layouts and the circle overlay.
//!
//! Horizontal boxes are measured on the full-resolution side-by-side canvas,
//! before it is scaled; uniform scaling leaves the fractions unchanged.
//! Vertical boxes are measured on the stacked canvas after each image was
//! scaled to the target width. The circle is measured on the final canvas.

use crate::annotation::{BoundingBox, CLASS_CIRCLE, CLASS_FIRST, CLASS_SECOND};

/// Height after scaling `(width, height)` to `target_width`, truncated.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    (height as f64 * (target_width as f64 / width as f64)) as u32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalLayout {
    /// Side-by-side canvas before scaling.
    pub canvas: (u32, u32),
    /// Canvas after uniform scaling to the target width.
    pub scaled: (u32, u32),
    pub left: BoundingBox,
    pub right: BoundingBox,
}

pub fn horizontal_layout(first: (u32, u32), second: (u32, u32), target_width: u32) -> HorizontalLayout {
    let (w1, h1) = first;
    let (w2, h2) = second;
    let canvas_w = w1 + w2;
    let canvas_h = h1.max(h2);
    let (cw, ch) = (canvas_w as f64, canvas_h as f64);
    let (w1f, h1f, w2f, h2f) = (w1 as f64, h1 as f64, w2 as f64, h2 as f64);

    HorizontalLayout {
        canvas: (canvas_w, canvas_h),
        scaled: (target_width, scaled_height(canvas_w, canvas_h, target_width)),
        left: BoundingBox::new(
            CLASS_FIRST,
            (w1f / 2.0) / cw,
            (h1f / 2.0) / ch,
            w1f / cw,
            h1f / ch,
        ),
        right: BoundingBox::new(
            CLASS_SECOND,
            (w1f + w2f / 2.0) / cw,
            (h2f / 2.0) / ch,
            w2f / cw,
            h2f / ch,
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalLayout {
    /// Heights of the two images once scaled to the target width.
    pub heights: (u32, u32),
    pub canvas: (u32, u32),
    pub top: BoundingBox,
    pub bottom: BoundingBox,
}

pub fn vertical_layout(first: (u32, u32), second: (u32, u32), target_width: u32) -> VerticalLayout {
    let h1 = scaled_height(first.0, first.1, target_width);
    let h2 = scaled_height(second.0, second.1, target_width);
    let total = h1 + h2;
    let (h1f, h2f, tf) = (h1 as f64, h2 as f64, total as f64);

    VerticalLayout {
        heights: (h1, h2),
        canvas: (target_width, total),
        top: BoundingBox::new(CLASS_FIRST, 0.5, (h1f / 2.0) / tf, 1.0, h1f / tf),
        bottom: BoundingBox::new(CLASS_SECOND, 0.5, (h1f + h2f / 2.0) / tf, 1.0, h2f / tf),
    }
}

/// Bounding square of a circle centred at `(x, y)` on a `canvas`-sized image.
pub fn circle_box(x: u32, y: u32, radius: u32, canvas: (u32, u32)) -> BoundingBox {
    let (w, h) = (canvas.0 as f64, canvas.1 as f64);
    let d = 2.0 * radius as f64;
    BoundingBox::new(CLASS_CIRCLE, x as f64 / w, y as f64 / h, d / w, d / h)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn horizontal_boxes_partition_the_width() {
        let layout = horizontal_layout((500, 300), (300, 600), 500);
        assert_eq!(layout.canvas, (800, 600));
        assert_eq!(layout.scaled, (500, 375));

        assert!((layout.left.right() - 500.0 / 800.0).abs() < EPS);
        assert!((layout.right.left() - 500.0 / 800.0).abs() < EPS);
        assert!((layout.left.width + layout.right.width - 1.0).abs() < EPS);
        assert_eq!(layout.left.to_string(), "1 0.312500 0.250000 0.625000 0.500000");
        assert_eq!(layout.right.to_string(), "2 0.812500 0.500000 0.375000 1.000000");
    }

    #[test]
    fn horizontal_partition_survives_scaling() {
        let layout = horizontal_layout((123, 77), (456, 311), 500);
        let (sw, _) = layout.scaled;
        let boundary_px = layout.left.right() * sw as f64;
        let expected_px = 123.0 * (500.0 / (123.0 + 456.0));
        assert!((boundary_px - expected_px).abs() < 1e-9);
    }

    #[test]
    fn vertical_boxes_span_full_width_and_stack() {
        let layout = vertical_layout((500, 300), (300, 600), 500);
        assert_eq!(layout.heights, (300, 1000));
        assert_eq!(layout.canvas, (500, 1300));

        for b in [layout.top, layout.bottom] {
            assert_eq!(b.center_x, 0.5);
            assert_eq!(b.width, 1.0);
        }
        assert!((layout.top.bottom() - layout.bottom.top()).abs() < EPS);
        assert!((layout.top.bottom() - 300.0 / 1300.0).abs() < EPS);
        assert!((layout.top.height + layout.bottom.height - 1.0).abs() < EPS);
    }

    #[test]
    fn scaled_height_truncates() {
        assert_eq!(scaled_height(300, 301, 500), 501);
        assert_eq!(scaled_height(3, 1, 500), 166);
    }

    #[test]
    fn circle_box_is_bounding_square() {
        let b = circle_box(100, 50, 20, (500, 375));
        assert_eq!(b.class_id, 0);
        assert!((b.center_x - 0.2).abs() < EPS);
        assert!((b.width - 40.0 / 500.0).abs() < EPS);
        assert!((b.height - 40.0 / 375.0).abs() < EPS);
        assert!(b.left() >= 0.0 && b.right() <= 1.0);
        assert!(b.top() >= 0.0 && b.bottom() <= 1.0);
    }
}
