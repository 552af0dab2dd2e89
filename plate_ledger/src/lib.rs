pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod pipeline;
pub mod plate_detection;
pub mod plate_text;

pub use error::{PlateError, Result};
