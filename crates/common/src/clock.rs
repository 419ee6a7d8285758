//! Frame cadence and run timing utilities.
//!
//! The capture loop draws frames at a fixed cadence derived from the target
//! frame rate. This module provides:
//! - Frame interval / frame index conversions
//! - A tick gate that admits one frame per slot
//! - A stopwatch anchored to a wall-clock epoch for run bookkeeping

use std::time::{Duration, Instant};

/// Fixed frame cadence derived from a target frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCadence {
    fps: u32,
}

impl FrameCadence {
    /// Create a cadence for the given frame rate (clamped to at least 1 fps).
    pub fn new(fps: u32) -> Self {
        Self { fps: fps.max(1) }
    }

    /// Frames per second.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Interval between two frames.
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.fps as u64)
    }

    /// Interval between two frames in seconds.
    pub fn interval_secs(&self) -> f64 {
        1.0 / self.fps as f64
    }

    /// Presentation time of a frame index.
    pub fn frame_time(&self, index: u64) -> f64 {
        index as f64 / self.fps as f64
    }

    /// Frame index containing a presentation time (floor).
    pub fn frame_index(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.fps as f64 + 1e-9).floor() as u64
    }

    /// Number of frames needed to cover a duration.
    pub fn frame_count(&self, duration_secs: f64) -> u64 {
        (duration_secs.max(0.0) * self.fps as f64).ceil() as u64
    }
}

/// Gate that lets at most one tick through per frame slot.
#[derive(Debug)]
pub struct TickGate {
    cadence: FrameCadence,
    last_slot: Option<u64>,
}

impl TickGate {
    pub fn new(cadence: FrameCadence) -> Self {
        Self {
            cadence,
            last_slot: None,
        }
    }

    /// Returns true and records the tick if `now_secs` falls in a later frame
    /// slot than the previous accepted tick. The first call always passes.
    pub fn should_tick(&mut self, now_secs: f64) -> bool {
        let slot = self.cadence.frame_index(now_secs);
        match self.last_slot {
            Some(last) if slot <= last => false,
            _ => {
                self.last_slot = Some(slot);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_slot = None;
    }
}

/// Stopwatch anchored to the moment a run started.
#[derive(Debug, Clone)]
pub struct RunStopwatch {
    epoch: Instant,
    epoch_wall: chrono::DateTime<chrono::Utc>,
}

impl RunStopwatch {
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock start as RFC 3339.
    pub fn epoch_wall(&self) -> String {
        self.epoch_wall.to_rfc3339()
    }

    /// Compact wall-clock stamp suitable for filenames (`20240131-154502`).
    pub fn file_stamp(&self) -> String {
        self.epoch_wall.format("%Y%m%d-%H%M%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadence_conversions() {
        let cadence = FrameCadence::new(30);
        assert_eq!(cadence.interval(), Duration::from_nanos(33_333_333));
        assert_eq!(cadence.frame_count(10.0), 300);
        assert_eq!(cadence.frame_index(1.0), 30);
        assert!((cadence.frame_time(45) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_fps_is_clamped() {
        let cadence = FrameCadence::new(0);
        assert_eq!(cadence.fps(), 1);
        assert_eq!(cadence.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_tick_gate() {
        let mut gate = TickGate::new(FrameCadence::new(60));
        assert!(gate.should_tick(0.0));
        assert!(!gate.should_tick(0.001));
        assert!(gate.should_tick(0.017));
        // Late ticks still land in their own slot.
        assert!(gate.should_tick(0.0334));
        assert!(!gate.should_tick(0.049));
        gate.reset();
        assert!(gate.should_tick(0.017));
    }

    #[test]
    fn test_file_stamp_shape() {
        let watch = RunStopwatch::start();
        let stamp = watch.file_stamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(&stamp[8..9], "-");
    }
}
