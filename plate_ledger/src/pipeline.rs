//! Frame loop: read a frame, detect regions, process each region in order.
//!
//! Everything runs on the calling thread. The driver owns the session state
//! (seen plates, counters) and the processor owns the ledger, so the
//! dedup-check-then-append sequence is never interleaved with another writer.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, TryRecvError};
use tracing::{debug, info, warn};

use crate::ledger::dedup::SeenPlates;
use crate::metrics;
use crate::plate_detection::region_processor::{RegionOutcome, RegionProcessor};
use crate::plate_detection::{FrameSource, RegionDetector};

/// Keeps at least `frame_wait` between consecutive frames.
pub struct FramePacer {
    frame_control: Instant,
    frame_wait: Duration,
}

impl FramePacer {
    pub fn new(frame_wait: Duration) -> Self {
        Self {
            frame_control: Instant::now(),
            frame_wait,
        }
    }

    pub fn wait(&mut self) {
        let elapsed = self.frame_control.elapsed();
        if self.frame_wait > elapsed {
            spin_sleep::sleep(self.frame_wait - elapsed);
        }
        self.frame_control = Instant::now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub regions: u64,
    pub region_errors: u64,
    pub outcomes: BTreeMap<&'static str, u64>,
    pub recorded: Vec<String>,
    pub stop: StopReason,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            frames: 0,
            regions: 0,
            region_errors: 0,
            outcomes: BTreeMap::new(),
            recorded: Vec::new(),
            stop: StopReason::EndOfStream,
        }
    }

    pub fn count(&self, label: &str) -> u64 {
        self.outcomes.get(label).copied().unwrap_or(0)
    }
}

pub struct PipelineDriver {
    source: Box<dyn FrameSource>,
    detector: Box<dyn RegionDetector>,
    processor: RegionProcessor,
    seen: SeenPlates,
    cancel: Receiver<()>,
    pacer: FramePacer,
    frame_count: u64,
    region_count: u64,
}

impl PipelineDriver {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn RegionDetector>,
        processor: RegionProcessor,
        cancel: Receiver<()>,
    ) -> Self {
        Self {
            source,
            detector,
            processor,
            seen: SeenPlates::new(),
            cancel,
            pacer: FramePacer::new(Duration::ZERO),
            frame_count: 0,
            region_count: 0,
        }
    }

    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.pacer = FramePacer::new(delay);
        self
    }

    pub fn seen(&self) -> &SeenPlates {
        &self.seen
    }

    pub fn processor(&self) -> &RegionProcessor {
        &self.processor
    }

    /// Runs until the source is exhausted or cancellation is signalled.
    pub fn run(&mut self) -> RunSummary {
        let mut summary = RunSummary::new();

        loop {
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!(frames = self.frame_count, "video finished");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "could not read frame from video");
                    break;
                }
            };
            self.frame_count += 1;
            summary.frames += 1;
            metrics::FRAMES.inc();

            match self.detector.detect(&frame) {
                Ok(regions) => {
                    for region in regions {
                        self.region_count += 1;
                        summary.regions += 1;
                        let count = self.region_count;

                        match self.processor.process(count, &frame, region, &mut self.seen) {
                            Ok(outcome) => {
                                debug!(
                                    frame = self.frame_count,
                                    count,
                                    ?region,
                                    outcome = outcome.label(),
                                    "region processed"
                                );
                                metrics::REGIONS.with_label_values(&[outcome.label()]).inc();
                                *summary.outcomes.entry(outcome.label()).or_insert(0) += 1;
                                if let RegionOutcome::Recorded(plate) = outcome {
                                    summary.recorded.push(plate);
                                }
                            }
                            Err(e) => {
                                warn!(frame = self.frame_count, count, ?region, error = %e, "region dropped");
                                metrics::REGION_ERRORS.inc();
                                summary.region_errors += 1;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(frame = self.frame_count, error = %e, "detection failed, skipping frame");
                }
            }

            self.pacer.wait();

            if self.cancelled() {
                info!(frames = self.frame_count, "cancelled");
                summary.stop = StopReason::Cancelled;
                break;
            }
        }

        summary
    }

    fn cancelled(&self) -> bool {
        match self.cancel.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacer_waits_out_the_interval() {
        let mut pacer = FramePacer::new(Duration::from_millis(20));
        let start = Instant::now();
        pacer.wait();
        assert!(start.elapsed() >= Duration::from_millis(19));
    }

    #[test]
    fn test_zero_pacer_does_not_block() {
        let mut pacer = FramePacer::new(Duration::ZERO);
        let start = Instant::now();
        pacer.wait();
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
