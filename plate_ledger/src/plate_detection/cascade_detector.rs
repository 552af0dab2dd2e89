use std::path::Path;

use opencv::core::Rect;
use opencv::core::Size;
use opencv::core::Vector;
use opencv::imgproc::cvt_color;
use opencv::imgproc::COLOR_BGR2GRAY;
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::CascadeClassifierTrait;
use opencv::prelude::CascadeClassifierTraitConst;
use opencv::prelude::Mat;

use super::{Region, RegionDetector};
use crate::error::{PlateError, Result};

/// Haar cascade plate detector.
pub struct CascadeDetector {
    classifier: CascadeClassifier,
    scale_factor: f64,
    min_neighbors: i32,
}

impl CascadeDetector {
    pub fn load(path: &Path, scale_factor: f64, min_neighbors: i32) -> Result<Self> {
        if !path.is_file() {
            return Err(PlateError::ResourceNotFound(path.to_path_buf()));
        }
        let classifier = CascadeClassifier::new(&path.to_string_lossy())?;
        if classifier.empty()? {
            return Err(PlateError::CascadeEmpty(path.to_path_buf()));
        }

        Ok(Self {
            classifier,
            scale_factor,
            min_neighbors,
        })
    }
}

impl RegionDetector for CascadeDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Region>> {
        let mut grey = Mat::default();
        cvt_color(frame, &mut grey, COLOR_BGR2GRAY, 0)?;

        let mut plates = Vector::<Rect>::default();
        self.classifier.detect_multi_scale(
            &grey,
            &mut plates,
            self.scale_factor,
            self.min_neighbors,
            0,
            Size::default(),
            Size::default(),
        )?;

        Ok(plates.iter().map(Region::from).collect())
    }
}
