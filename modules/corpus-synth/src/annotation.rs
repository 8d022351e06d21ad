//! Detection labels in normalized center/size form.

use std::fmt;
use std::path::Path;

use crate::error::Result;

/// Class of the left (horizontal) or top (vertical) source image.
pub const CLASS_FIRST: u8 = 1;
/// Class of the right or bottom source image.
pub const CLASS_SECOND: u8 = 2;
/// Class of the overlaid circle.
pub const CLASS_CIRCLE: u8 = 0;

/// Box with every geometric field expressed as a fraction of the image it was
/// measured on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub class_id: u8,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(class_id: u8, center_x: f64, center_y: f64, width: f64, height: f64) -> Self {
        Self {
            class_id,
            center_x,
            center_y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.center_x - self.width / 2.0
    }

    pub fn right(&self) -> f64 {
        self.center_x + self.width / 2.0
    }

    pub fn top(&self) -> f64 {
        self.center_y - self.height / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.center_y + self.height / 2.0
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.center_x, self.center_y, self.width, self.height
        )
    }
}

/// One line per box, each newline-terminated.
pub fn label_text(boxes: &[BoundingBox]) -> String {
    boxes.iter().map(|b| format!("{b}\n")).collect()
}

pub fn write_label(path: &Path, boxes: &[BoundingBox]) -> Result<()> {
    std::fs::write(path, label_text(boxes))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_six_decimals() {
        let b = BoundingBox::new(2, 0.8125, 1.0 / 3.0, 0.375, 1.0);
        assert_eq!(b.to_string(), "2 0.812500 0.333333 0.375000 1.000000");
    }

    #[test]
    fn label_has_one_terminated_line_per_box() {
        let boxes = [
            BoundingBox::new(1, 0.5, 0.25, 1.0, 0.5),
            BoundingBox::new(2, 0.5, 0.75, 1.0, 0.5),
            BoundingBox::new(0, 0.1, 0.2, 0.06, 0.1),
        ];
        let text = label_text(&boxes);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "1 0.500000 0.250000 1.000000 0.500000",
                "2 0.500000 0.750000 1.000000 0.500000",
                "0 0.100000 0.200000 0.060000 0.100000",
            ]
        );
        assert!(text.ends_with('\n'));
    }
}
