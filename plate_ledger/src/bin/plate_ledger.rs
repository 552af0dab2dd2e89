use std::fs;
use std::path::Path;
use std::process;
use std::time::Duration;

use chrono::Local;
use plate_ledger::config::{Config, CONFIG_FILE};
use plate_ledger::ledger::workbook::export_workbook;
use plate_ledger::ledger::{ledger_file_name, LedgerInit, LedgerStore};
use plate_ledger::metrics;
use plate_ledger::pipeline::PipelineDriver;
use plate_ledger::plate_detection::cascade_detector::CascadeDetector;
use plate_ledger::plate_detection::region_processor::RegionProcessor;
use plate_ledger::plate_detection::tess_ocr::TessOcrReader;
use plate_ledger::plate_detection::video_reader::VideoReader;
use plate_ledger::Result;
use tracing::{error, info, warn};

fn setup(config: &Config) -> Result<PipelineDriver> {
    config.validate()?;

    // Plate box detector
    let detector = CascadeDetector::load(&config.cascade_path, config.scale_factor, config.min_neighbors)?;

    // Frames from the input file
    let source = VideoReader::open(&config.video_path)?;

    // Single word OCR on plate crops
    let ocr = TessOcrReader::new(config.tessdata_path.as_deref(), &config.ocr_language)?;

    // Ledger name is fixed for the whole run
    let start_day = Local::now().date_naive();
    fs::create_dir_all(&config.ledger_dir)?;
    let ledger = LedgerStore::for_day(&config.ledger_dir, start_day);
    match ledger.ensure_initialized()? {
        LedgerInit::Created => info!(path = %ledger.path().display(), "created new ledger"),
        LedgerInit::Existing => info!(path = %ledger.path().display(), "using existing ledger"),
    }

    let processor = RegionProcessor::new(Box::new(ocr), ledger).with_append_retries(config.append_retries);

    Ok(PipelineDriver::new(
        Box::new(source),
        Box::new(detector),
        processor,
        crossbeam::channel::never(),
    )
    .with_frame_delay(Duration::from_millis(config.frame_delay_ms)))
}

fn shutdown(config: &Config, driver: &PipelineDriver) {
    let ledger = driver.processor().ledger();
    if config.export_workbook {
        let name = ledger
            .path()
            .file_stem()
            .map(|stem| format!("{}.xlsx", stem.to_string_lossy()))
            .unwrap_or_else(|| ledger_file_name(Local::now().date_naive(), "xlsx"));
        let out = config.ledger_dir.join(name);
        match ledger.scan().and_then(|rows| export_workbook(&rows, &out)) {
            Ok(()) => info!(path = %out.display(), "workbook exported"),
            Err(e) => warn!(error = %e, "workbook export failed"),
        }
    }

    if let Some(path) = &config.metrics_path {
        if let Err(e) = fs::write(path, metrics::render()) {
            warn!(path = %path.display(), error = %e, "could not write metrics");
        }
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let config = match Config::load(Path::new(CONFIG_FILE)) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            process::exit(1);
        }
    };

    let mut driver = match setup(&config) {
        Ok(driver) => driver,
        Err(e) => {
            error!(error = %e, "startup failed");
            process::exit(1);
        }
    };

    info!(video = %config.video_path.display(), "starting, waiting for video to end");
    let summary = driver.run();
    info!(
        frames = summary.frames,
        regions = summary.regions,
        recorded = summary.recorded.len(),
        region_errors = summary.region_errors,
        stop = ?summary.stop,
        "done"
    );

    shutdown(&config, &driver);
}
