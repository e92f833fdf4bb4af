//! Fixed-rate frame pacing
//!
//! Each frame's encode+send time is measured against the target period. An
//! on-time frame sleeps the remainder; a late frame is sent anyway and the
//! next frame starts immediately, so the effective rate degrades instead of
//! frames being skipped.

use crate::{LedToneError, Result};
use std::time::Duration;

/// Outcome of one paced frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTiming {
    /// Work finished inside the period; sleep this long before the next frame
    OnTime {
        /// Remaining time in the period
        sleep: Duration,
    },
    /// Work overran the period by this much
    Late {
        /// Overrun beyond the period
        by: Duration,
    },
}

/// Frame rate governor
#[derive(Debug, Clone)]
pub struct FramePacer {
    period: Duration,
    frame_start: Duration,
    frames: u64,
    late_frames: u64,
}

impl FramePacer {
    /// Create a pacer for `fps` frames per second
    pub fn new(fps: f64) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(LedToneError::ConfigError(format!(
                "frame rate must be positive, got {}",
                fps
            )));
        }
        Ok(FramePacer {
            period: Duration::from_secs_f64(1.0 / fps),
            frame_start: Duration::ZERO,
            frames: 0,
            late_frames: 0,
        })
    }

    /// Target duration of one frame
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Mark the start of a frame at clock time `now`
    #[inline]
    pub fn begin_frame(&mut self, now: Duration) {
        self.frame_start = now;
    }

    /// Mark the end of the frame's work at clock time `now`
    pub fn end_frame(&mut self, now: Duration) -> FrameTiming {
        self.frames += 1;
        let work = now.saturating_sub(self.frame_start);
        if work <= self.period {
            FrameTiming::OnTime {
                sleep: self.period - work,
            }
        } else {
            self.late_frames += 1;
            FrameTiming::Late {
                by: work - self.period,
            }
        }
    }

    /// Deadline of the frame currently being worked on
    pub fn deadline(&self) -> Duration {
        self.frame_start + self.period
    }

    /// Frames completed
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Frames whose work overran the period
    pub fn late_frames(&self) -> u64 {
        self.late_frames
    }

    /// Reset counters
    pub fn reset(&mut self) {
        self.frame_start = Duration::ZERO;
        self.frames = 0;
        self.late_frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_rate() {
        assert!(FramePacer::new(0.0).is_err());
        assert!(FramePacer::new(-5.0).is_err());
        assert!(FramePacer::new(f64::NAN).is_err());
    }

    #[test]
    fn test_on_time_frame_sleeps_remainder() {
        let mut pacer = FramePacer::new(50.0).unwrap();
        pacer.begin_frame(Duration::from_millis(100));
        let timing = pacer.end_frame(Duration::from_millis(105));
        assert_eq!(
            timing,
            FrameTiming::OnTime {
                sleep: Duration::from_millis(15)
            }
        );
        assert_eq!(pacer.deadline(), Duration::from_millis(120));
        assert_eq!(pacer.late_frames(), 0);
    }

    #[test]
    fn test_late_frame_is_counted() {
        let mut pacer = FramePacer::new(50.0).unwrap();
        pacer.begin_frame(Duration::ZERO);
        let timing = pacer.end_frame(Duration::from_millis(35));
        assert_eq!(
            timing,
            FrameTiming::Late {
                by: Duration::from_millis(15)
            }
        );
        assert_eq!(pacer.frames(), 1);
        assert_eq!(pacer.late_frames(), 1);
    }
}
