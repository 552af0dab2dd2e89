use std::ffi::CString;
use std::path::Path;

use leptess::tesseract;
use leptess::tesseract::TessApi;
use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;
use opencv::prelude::MatTraitConstManual;

use super::TextExtractor;
use crate::error::{PlateError, Result};

/// Tesseract page segmentation mode: treat the image as a single word.
const PSM_SINGLE_WORD: &str = "8";

pub struct TessOcrReader {
    ocr: TessApi,
}

fn ocr_err(e: impl std::fmt::Debug) -> PlateError {
    PlateError::Ocr(format!("{e:?}"))
}

impl TessOcrReader {
    pub fn new(data_path: Option<&Path>, language: &str) -> Result<Self> {
        let data_path = data_path.map(|p| p.to_string_lossy().into_owned());
        let mut api = tesseract::TessApi::new(data_path.as_deref(), language).map_err(ocr_err)?;

        let name = CString::new("tessedit_pageseg_mode").map_err(ocr_err)?;
        let value = CString::new(PSM_SINGLE_WORD).map_err(ocr_err)?;
        api.raw.set_variable(&name, &value).map_err(ocr_err)?;

        Ok(Self { ocr: api })
    }
}

impl TextExtractor for TessOcrReader {
    /// Expects a continuous single channel 8 bit image.
    fn extract(&mut self, image: &Mat) -> Result<String> {
        let cols = image.cols();
        let rows = image.rows();
        let bytes = image.data_bytes()?;
        self.ocr
            .raw
            .set_image(bytes, cols, rows, 1, cols)
            .map_err(ocr_err)?;
        let text = self.ocr.get_utf8_text().map_err(ocr_err)?;
        Ok(text.trim().to_string())
    }
}
