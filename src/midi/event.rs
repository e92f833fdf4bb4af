//! Note events and allocated commands

use std::time::Duration;

/// Whether a note starts or stops sounding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteKind {
    /// Note starts
    On,
    /// Note stops
    Off,
}

/// A single note transition extracted from a MIDI container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    /// Time since the start of the song
    pub absolute_time: Duration,
    /// Index of the track the event came from
    pub source_track: usize,
    /// MIDI channel (0-15) the event was sent on
    pub source_channel: u8,
    /// MIDI note number (0-127)
    pub note: u8,
    /// On or Off
    pub kind: NoteKind,
    /// Event belongs to a percussion track and is never given a pitched channel
    pub is_drum: bool,
}

impl NoteEvent {
    /// Melodic note-on at `ms` milliseconds, convenient for building sequences by hand
    pub fn on(ms: u64, track: usize, note: u8) -> Self {
        NoteEvent {
            absolute_time: Duration::from_millis(ms),
            source_track: track,
            source_channel: 0,
            note,
            kind: NoteKind::On,
            is_drum: false,
        }
    }

    /// Melodic note-off at `ms` milliseconds
    pub fn off(ms: u64, track: usize, note: u8) -> Self {
        NoteEvent {
            kind: NoteKind::Off,
            ..Self::on(ms, track, note)
        }
    }
}

/// A command bound to a hardware channel, ready for timed dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatedCommand {
    /// Time since the start of the song
    pub absolute_time: Duration,
    /// Hardware channel (0-14)
    pub hardware_channel: u8,
    /// On or Off
    pub kind: NoteKind,
    /// Note to sound; `None` for Off
    pub note: Option<u8>,
}
