//! Paced frame streaming
//!
//! Encodes each frame, writes every packet to its link and then sleeps out
//! the rest of the frame period. A frame that overruns is still sent in full
//! and the next one starts straight away.

use super::{FrameBuffer, FrameEncoder, Topology};
use crate::timing::{CancelToken, Clock, FramePacer, FrameTiming};
use crate::transport::PacketSink;
use crate::{LedToneError, Result};

/// Outcome of one streaming pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamReport {
    /// Frames fully written
    pub frames: u64,
    /// Frames whose encode+send overran the period
    pub late_frames: u64,
    /// The pass was stopped by cancellation
    pub cancelled: bool,
}

/// Drives frames through the encoder at a fixed rate
pub struct VideoStreamer {
    encoder: FrameEncoder,
    pacer: FramePacer,
}

impl VideoStreamer {
    /// Create a streamer for `topology` at `fps`
    pub fn new(topology: Topology, fps: f64) -> Result<Self> {
        Ok(VideoStreamer {
            encoder: FrameEncoder::new(topology),
            pacer: FramePacer::new(fps)?,
        })
    }

    /// Encoder in use
    pub fn encoder(&self) -> &FrameEncoder {
        &self.encoder
    }

    /// Stream `frames`, writing link `n`'s packets to `writers[n]`
    pub fn run<I, C, S>(
        &mut self,
        frames: I,
        writers: &mut [S],
        clock: &C,
        cancel: &CancelToken,
    ) -> Result<StreamReport>
    where
        I: IntoIterator<Item = Result<FrameBuffer>>,
        C: Clock,
        S: PacketSink,
    {
        let link_count = self.encoder.topology().link_count();
        if writers.len() != link_count {
            return Err(LedToneError::ConfigError(format!(
                "topology has {} links but {} writers were given",
                link_count,
                writers.len()
            )));
        }

        self.pacer.reset();
        let mut report = StreamReport::default();
        tracing::info!(
            devices = self.encoder.topology().devices().len(),
            links = link_count,
            "video pass started"
        );

        for frame in frames {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let frame = frame?;

            self.pacer.begin_frame(clock.now());
            for packet in self.encoder.encode_frame(&frame)? {
                writers[packet.link].send(&packet.bytes)?;
            }
            report.frames += 1;

            match self.pacer.end_frame(clock.now()) {
                FrameTiming::OnTime { .. } => {
                    if clock.sleep_until(self.pacer.deadline(), cancel) {
                        report.cancelled = true;
                        break;
                    }
                }
                FrameTiming::Late { by } => {
                    tracing::warn!(
                        frame = report.frames,
                        overrun_ms = by.as_secs_f64() * 1000.0,
                        "frame overran its period"
                    );
                }
            }
            tracing::debug!(frame = report.frames, "frame sent");
        }

        report.late_frames = self.pacer.late_frames();
        tracing::info!(
            frames = report.frames,
            late = report.late_frames,
            cancelled = report.cancelled,
            "video pass finished"
        );
        Ok(report)
    }
}
