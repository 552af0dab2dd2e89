use std::path::{Path, PathBuf};

use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;
use opencv::prelude::VideoCaptureTrait;
use opencv::prelude::VideoCaptureTraitConst;
use opencv::videoio::VideoCapture;
use opencv::videoio::CAP_ANY;
use tracing::{debug, warn};

use super::FrameSource;
use crate::error::{PlateError, Result};

pub struct VideoReader {
    capture: VideoCapture,
    path: PathBuf,
    frames: u64,
}

impl VideoReader {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PlateError::ResourceNotFound(path.to_path_buf()));
        }
        let capture = VideoCapture::from_file(&path.to_string_lossy(), CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(PlateError::SourceNotOpened(path.to_path_buf()));
        }

        Ok(Self {
            capture,
            path: path.to_path_buf(),
            frames: 0,
        })
    }
}

impl FrameSource for VideoReader {
    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut image = Mat::default();
        let grabbed = match self.capture.read(&mut image) {
            Ok(grabbed) => grabbed,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "frame read failed");
                false
            }
        };

        if !grabbed || image.empty() {
            debug!(path = %self.path.display(), frames = self.frames, "end of video");
            return Ok(None);
        }

        self.frames += 1;
        Ok(Some(image))
    }
}
