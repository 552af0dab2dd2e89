pub mod cascade_detector;
pub mod region_processor;
pub mod tess_ocr;
pub mod video_reader;

use opencv::core::Rect;
use opencv::prelude::Mat;

use crate::error::Result;

/// Candidate plate box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The box shrunk by `margin` on every side, or `None` when nothing is
    /// left or the coordinates overflow.
    pub fn inset(&self, margin: i32) -> Option<Rect> {
        let trim = margin.checked_mul(2)?;
        let width = self.width.checked_sub(trim)?;
        let height = self.height.checked_sub(trim)?;
        if width <= 0 || height <= 0 {
            return None;
        }
        let x = self.x.checked_add(margin)?;
        let y = self.y.checked_add(margin)?;
        Some(Rect::new(x, y, width, height))
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Self::new(rect.x, rect.y, rect.width, rect.height)
    }
}

/// Sequence of frames. `Ok(None)` marks the end of the stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Mat>>;
}

/// Finds candidate plate boxes in a frame. No ordering is promised.
pub trait RegionDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Region>>;
}

/// Recognizes the text in a preprocessed plate crop. May return an empty
/// string.
pub trait TextExtractor {
    fn extract(&mut self, image: &Mat) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inset_trims_every_side() {
        let rect = Region::new(100, 50, 160, 40).inset(10).unwrap();
        assert_eq!(rect, Rect::new(110, 60, 140, 20));
    }

    #[test]
    fn test_inset_of_small_box_is_empty() {
        assert_eq!(Region::new(0, 0, 20, 40).inset(10), None);
        assert_eq!(Region::new(0, 0, 15, 15).inset(10), None);
    }

    #[test]
    fn test_inset_overflow_is_none() {
        assert_eq!(Region::new(i32::MAX - 5, 0, 100, 100).inset(10), None);
        assert_eq!(Region::new(0, 0, i32::MIN, 100).inset(10), None);
        assert_eq!(Region::new(0, 0, 100, 100).inset(i32::MAX), None);
    }
}
