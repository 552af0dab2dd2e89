//! Runtime configuration.
//!
//! Read from `plate_ledger.toml` in the working directory when present,
//! otherwise every field takes its default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PlateError, Result};

pub const CONFIG_FILE: &str = "plate_ledger.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Haar cascade used to find plates
    pub cascade_path: PathBuf,

    /// Video file to read frames from
    pub video_path: PathBuf,

    /// Directory holding the `D.M.YYYY.csv` ledgers
    pub ledger_dir: PathBuf,

    /// Tesseract data directory, system default when unset
    pub tessdata_path: Option<PathBuf>,

    pub ocr_language: String,

    pub scale_factor: f64,
    pub min_neighbors: i32,

    /// Pause after each frame
    pub frame_delay_ms: u64,

    /// Extra attempts for a failed ledger append
    pub append_retries: u32,

    /// Write an `.xlsx` copy of the ledger on shutdown
    pub export_workbook: bool,

    /// Prometheus text dump written on shutdown
    pub metrics_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cascade_path: PathBuf::from("licenceplate.xml"),
            video_path: PathBuf::from("video2.mov"),
            ledger_dir: PathBuf::from("."),
            tessdata_path: None,
            ocr_language: "eng".to_string(),
            scale_factor: 1.3,
            min_neighbors: 5,
            frame_delay_ms: 1,
            append_retries: 0,
            export_workbook: false,
            metrics_path: None,
        }
    }
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| PlateError::Config(e.to_string()))?;
        if config.scale_factor <= 1.0 {
            return Err(PlateError::Config(format!(
                "scale_factor must be greater than 1.0, got {}",
                config.scale_factor
            )));
        }
        Ok(config)
    }

    /// Both input resources must exist before anything is initialized.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.cascade_path, &self.video_path] {
            if !path.is_file() {
                return Err(PlateError::ResourceNotFound(path.clone()));
            }
        }
        Ok(())
    }
}
