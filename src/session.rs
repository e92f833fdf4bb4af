//! Playback sessions
//!
//! Glue that runs a full pass from decoded input to serial links and makes
//! sure every link is closed however the pass ends.

use crate::config::MidiConfig;
use crate::dispatch::{DispatchReport, TimedDispatcher};
use crate::midi::{ChannelAllocator, NoteEvent, WirePacket};
use crate::timing::{CancelToken, Clock};
use crate::transport::{LinkWriter, PacketSink, ShutdownMode};
use crate::video::{FrameBuffer, StreamReport, Topology, VideoStreamer};
use crate::{LedToneError, Result};

/// Outcome of a MIDI pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MidiPassReport {
    /// Commands produced by the allocator
    pub commands: usize,
    /// NoteOns dropped for lack of a free channel
    pub dropped: usize,
    /// Dispatcher outcome
    pub dispatch: DispatchReport,
}

/// Allocate `events` onto the configured channels and play them into `sink`
///
/// The sink is handed to a `midi` writer thread fed through a queue of
/// `config.link.queue_depth` packets. A clean pass flushes the queue; a
/// cancelled or failed pass discards it and ends with an all-channels-off
/// packet. The sink is closed on every exit path. A dispatch error takes
/// precedence over a link error.
pub fn run_midi_pass<C: Clock, S: PacketSink + 'static>(
    events: &[NoteEvent],
    config: &MidiConfig,
    sink: S,
    clock: C,
    cancel: &CancelToken,
) -> Result<MidiPassReport> {
    let mut allocator = match ChannelAllocator::new(usize::from(config.channels)) {
        Ok(allocator) => allocator,
        Err(e) => {
            close_unused(sink);
            return Err(e);
        }
    };
    if config.link.queue_depth == 0 {
        close_unused(sink);
        return Err(LedToneError::ConfigError(
            "link queue depth must be at least 1".into(),
        ));
    }

    let commands = allocator.allocate_all(events);
    tracing::info!(
        events = events.len(),
        commands = commands.len(),
        dropped = allocator.dropped(),
        channels = config.channels,
        "midi pass allocated"
    );

    let writer = LinkWriter::spawn("midi", sink, config.link.queue_depth)?;
    let mut dispatcher =
        TimedDispatcher::new(clock, writer).with_lateness_warning(config.lateness_warning());
    let outcome = dispatcher.run(&commands, cancel);

    let (mode, final_packet) = match &outcome {
        Ok(report) if !report.cancelled => (ShutdownMode::Flush, None),
        _ => (
            ShutdownMode::Discard,
            Some(WirePacket::all_off().encode().to_vec()),
        ),
    };
    let finished = dispatcher.into_sink().finish(mode, final_packet);

    let dispatch = match (outcome, finished) {
        (Ok(report), Ok(_)) => report,
        (Err(e), finished) => {
            if let Err(link_err) = finished {
                tracing::warn!(error = %link_err, "closing link after failed pass");
            }
            return Err(e);
        }
        (Ok(_), Err(e)) => return Err(e),
    };

    Ok(MidiPassReport {
        commands: commands.len(),
        dropped: allocator.dropped(),
        dispatch,
    })
}

fn close_unused<S: PacketSink>(mut sink: S) {
    if let Err(e) = sink.close() {
        tracing::warn!(error = %e, "closing unused link");
    }
}

/// Stream `frames` across one writer thread per link
///
/// `sinks[n]` backs link `n`. Writers are flushed after a clean pass and
/// discarded after cancellation or an error; either way every sink is closed
/// before this returns.
pub fn run_video_pass<I, C, S>(
    frames: I,
    topology: Topology,
    sinks: Vec<S>,
    fps: f64,
    queue_depth: usize,
    clock: &C,
    cancel: &CancelToken,
) -> Result<StreamReport>
where
    I: IntoIterator<Item = Result<FrameBuffer>>,
    C: Clock,
    S: PacketSink + 'static,
{
    if sinks.len() != topology.link_count() {
        return Err(LedToneError::ConfigError(format!(
            "topology has {} links but {} sinks were given",
            topology.link_count(),
            sinks.len()
        )));
    }
    let mut streamer = VideoStreamer::new(topology, fps)?;

    let mut writers = Vec::with_capacity(sinks.len());
    for (index, sink) in sinks.into_iter().enumerate() {
        match LinkWriter::spawn(format!("video{}", index), sink, queue_depth) {
            Ok(writer) => writers.push(writer),
            Err(e) => {
                if let Err(link_err) = finish_all(writers, ShutdownMode::Discard) {
                    tracing::warn!(error = %link_err, "closing links after failed spawn");
                }
                return Err(e);
            }
        }
    }

    let outcome = streamer.run(frames, &mut writers, clock, cancel);
    let mode = match &outcome {
        Ok(report) if !report.cancelled => ShutdownMode::Flush,
        _ => ShutdownMode::Discard,
    };
    let finished = finish_all(writers, mode);

    let report = outcome?;
    finished?;
    Ok(report)
}

fn finish_all(writers: Vec<LinkWriter>, mode: ShutdownMode) -> Result<()> {
    let mut first_error = None;
    for writer in writers {
        let name = writer.name().to_string();
        match writer.finish(mode, None) {
            Ok(stats) => tracing::debug!(
                link = %name,
                written = stats.packets_written,
                discarded = stats.packets_discarded,
                "link closed"
            ),
            Err(e) => {
                tracing::error!(link = %name, error = %e, "link failed");
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Open the serial link described by a MIDI config
#[cfg(feature = "serial")]
pub fn open_midi_link(config: &MidiConfig) -> Result<crate::transport::SerialSink> {
    crate::transport::SerialSink::open(&config.link.port, config.link.baud_rate)
}

/// Open every serial link described by a video config, in link order
#[cfg(feature = "serial")]
pub fn open_video_links(
    config: &crate::config::VideoConfig,
) -> Result<Vec<crate::transport::SerialSink>> {
    config
        .links
        .iter()
        .map(|link| crate::transport::SerialSink::open(&link.port, link.baud_rate))
        .collect()
}
