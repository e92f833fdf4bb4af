//! Timed Dispatcher
//!
//! Replays allocated commands against a clock. Each command's target time is
//! the pass start plus its absolute time; the dispatcher sleeps until the
//! target, or sends immediately and warns when it is already behind. There is
//! no catch-up: a late send shifts nothing else.

use crate::midi::{AllocatedCommand, WirePacket};
use crate::timing::{CancelToken, Clock};
use crate::transport::PacketSink;
use crate::Result;
use std::time::Duration;

/// Lateness tolerated before a send counts as late
pub const DEFAULT_LATENESS_WARNING: Duration = Duration::from_millis(5);

/// Outcome of one dispatch pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Command packets written
    pub sent: usize,
    /// Sends that happened past their target by more than the warning threshold
    ///
    /// The threshold is [`DEFAULT_LATENESS_WARNING`] unless set with
    /// [`TimedDispatcher::with_lateness_warning`]. Sends behind by less are
    /// neither counted nor warned about; a zero threshold counts every send
    /// that is behind its target.
    pub late: usize,
    /// Worst lateness observed
    pub max_lateness: Duration,
    /// The pass was stopped by cancellation
    pub cancelled: bool,
}

/// Sends allocated commands at their scheduled times
pub struct TimedDispatcher<C: Clock, S: PacketSink> {
    clock: C,
    sink: S,
    lateness_warning: Duration,
}

impl<C: Clock, S: PacketSink> TimedDispatcher<C, S> {
    /// Create a dispatcher writing to `sink`
    pub fn new(clock: C, sink: S) -> Self {
        TimedDispatcher {
            clock,
            sink,
            lateness_warning: DEFAULT_LATENESS_WARNING,
        }
    }

    /// Set the lateness warning threshold
    pub fn with_lateness_warning(mut self, threshold: Duration) -> Self {
        self.lateness_warning = threshold;
        self
    }

    /// Clock driving the dispatcher
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Sink packets are written to
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Close the sink
    pub fn close(&mut self) -> Result<()> {
        self.sink.close()
    }

    /// Release the sink without closing it
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Replay one pass of commands
    ///
    /// Commands must be ordered by `absolute_time`. On cancellation the pass
    /// stops, an all-channels-off packet is sent and the report carries
    /// `cancelled`. A transport failure aborts the pass with the error. The
    /// dispatcher can run again afterwards.
    pub fn run(
        &mut self,
        commands: &[AllocatedCommand],
        cancel: &CancelToken,
    ) -> Result<DispatchReport> {
        let start = self.clock.now();
        let mut report = DispatchReport::default();
        tracing::info!(commands = commands.len(), "dispatch pass started");

        for cmd in commands {
            let target = start + cmd.absolute_time;
            let cancelled = if self.clock.now() < target {
                self.clock.sleep_until(target, cancel)
            } else {
                cancel.is_cancelled()
            };
            if cancelled {
                return self.stop(report);
            }

            let lateness = self.clock.now().saturating_sub(target);
            if lateness > self.lateness_warning {
                report.late += 1;
                tracing::warn!(
                    lateness_ms = lateness.as_secs_f64() * 1000.0,
                    channel = cmd.hardware_channel,
                    "dispatcher behind schedule"
                );
            }
            report.max_lateness = report.max_lateness.max(lateness);

            let packet = WirePacket::from_command(cmd);
            self.sink.send(&packet.encode())?;
            report.sent += 1;
            tracing::debug!(
                at_ms = cmd.absolute_time.as_millis() as u64,
                channel = cmd.hardware_channel,
                note = packet.note,
                "sent"
            );
        }

        self.sink.flush()?;
        tracing::info!(sent = report.sent, late = report.late, "dispatch pass finished");
        Ok(report)
    }

    fn stop(&mut self, mut report: DispatchReport) -> Result<DispatchReport> {
        tracing::info!(sent = report.sent, "dispatch cancelled, silencing channels");
        self.sink.send(&WirePacket::all_off().encode())?;
        self.sink.flush()?;
        report.cancelled = true;
        Ok(report)
    }
}
