use chrono::Local;
use opencv::core::Point;
use opencv::core::Rect;
use opencv::core::Scalar;
use opencv::core::Size;
use opencv::core::BORDER_CONSTANT;
use opencv::core::BORDER_DEFAULT;
use opencv::core::CV_8UC1;
use opencv::imgproc::cvt_color;
use opencv::imgproc::dilate;
use opencv::imgproc::erode;
use opencv::imgproc::gaussian_blur;
use opencv::imgproc::morphology_default_border_value;
use opencv::imgproc::COLOR_BGR2GRAY;
use opencv::prelude::Mat;
use opencv::prelude::MatTraitConst;
use tracing::{info, warn};

use super::{Region, TextExtractor};
use crate::error::Result;
use crate::ledger::dedup::{Duplicate, DuplicateTracker, SeenPlates};
use crate::ledger::{LedgerRow, LedgerStore};
use crate::plate_text::{is_valid_plate, normalize};

/// Pixels trimmed from every side of a detected box before recognition.
pub const REGION_INSET: i32 = 10;

const BLUR_KERNEL: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionOutcome {
    Recorded(String),
    DuplicateInSession(String),
    DuplicateInLedger(String),
    InvalidPlate(String),
    EmptyRegion,
    SkippedInvalidRegion,
}

impl RegionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RegionOutcome::Recorded(_) => "recorded",
            RegionOutcome::DuplicateInSession(_) => "duplicate_in_session",
            RegionOutcome::DuplicateInLedger(_) => "duplicate_in_ledger",
            RegionOutcome::InvalidPlate(_) => "invalid_plate",
            RegionOutcome::EmptyRegion => "empty_region",
            RegionOutcome::SkippedInvalidRegion => "skipped_invalid_region",
        }
    }
}

/// Runs one detected region through crop, preprocessing, recognition,
/// validation, dedup and the ledger write.
pub struct RegionProcessor {
    extractor: Box<dyn TextExtractor>,
    ledger: LedgerStore,
    append_retries: u32,
}

impl RegionProcessor {
    pub fn new(extractor: Box<dyn TextExtractor>, ledger: LedgerStore) -> Self {
        Self {
            extractor,
            ledger,
            append_retries: 0,
        }
    }

    pub fn with_append_retries(mut self, retries: u32) -> Self {
        self.append_retries = retries;
        self
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    /// `Err` is a per-region failure (recognition or ledger IO); the caller
    /// drops the region and carries on.
    pub fn process(
        &mut self,
        count: u64,
        frame: &Mat,
        region: Region,
        seen: &mut SeenPlates,
    ) -> Result<RegionOutcome> {
        let Some(rect) = inset_within(frame, region) else {
            return Ok(RegionOutcome::SkippedInvalidRegion);
        };

        let plate_img = Mat::roi(frame, rect)?.try_clone()?;
        if plate_img.empty() {
            return Ok(RegionOutcome::EmptyRegion);
        }

        let prepared = preprocess_plate(&plate_img)?;
        let raw = self.extractor.extract(&prepared)?;
        let plate = normalize(&raw);

        if !is_valid_plate(&plate) {
            return Ok(RegionOutcome::InvalidPlate(plate));
        }

        match DuplicateTracker::check(&plate, seen, &self.ledger)? {
            Some(Duplicate::InSession) => return Ok(RegionOutcome::DuplicateInSession(plate)),
            Some(Duplicate::InLedger) => return Ok(RegionOutcome::DuplicateInLedger(plate)),
            None => {}
        }

        let row = LedgerRow::stamped(&plate, Local::now().naive_local());
        self.append_with_retry(&row)?;
        seen.record_accepted(&plate);
        info!(count, plate = %plate, date = %row.date, time = %row.time, "plate recorded");

        Ok(RegionOutcome::Recorded(plate))
    }

    fn append_with_retry(&self, row: &LedgerRow) -> Result<()> {
        retry(self.append_retries, |_| self.ledger.append(row))
    }
}

/// Runs `op` until it succeeds, at most `retries + 1` times. `op` gets the
/// zero based attempt number; the last error is returned.
pub fn retry<T>(retries: u32, mut op: impl FnMut(u32) -> Result<T>) -> Result<T> {
    let mut attempt = 0;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < retries => {
                warn!(attempt, error = %e, "attempt failed, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// The inset box, provided it is non-empty and lies inside the frame.
fn inset_within(frame: &Mat, region: Region) -> Option<Rect> {
    let rect = region.inset(REGION_INSET)?;
    let right = rect.x.checked_add(rect.width)?;
    let bottom = rect.y.checked_add(rect.height)?;
    let inside = rect.x >= 0 && rect.y >= 0 && right <= frame.cols() && bottom <= frame.rows();
    inside.then_some(rect)
}

/// Grey, a 1x1 dilate/erode pass and a small gaussian blur.
pub fn preprocess_plate(plate_img: &Mat) -> Result<Mat> {
    let mut grey = Mat::default();
    cvt_color(plate_img, &mut grey, COLOR_BGR2GRAY, 0)?;

    let kernel = Mat::new_rows_cols_with_default(1, 1, CV_8UC1, Scalar::all(1.0))?;
    let anchor = Point::new(-1, -1);

    let mut dilated = Mat::default();
    dilate(
        &grey,
        &mut dilated,
        &kernel,
        anchor,
        1,
        BORDER_CONSTANT,
        morphology_default_border_value()?,
    )?;

    let mut eroded = Mat::default();
    erode(
        &dilated,
        &mut eroded,
        &kernel,
        anchor,
        1,
        BORDER_CONSTANT,
        morphology_default_border_value()?,
    )?;

    let mut blurred = Mat::default();
    gaussian_blur(
        &eroded,
        &mut blurred,
        Size::new(BLUR_KERNEL, BLUR_KERNEL),
        0.0,
        0.0,
        BORDER_DEFAULT,
    )?;

    Ok(blurred)
}
