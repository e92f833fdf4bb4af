//! MIDI Event Extractor
//!
//! Parses a Standard MIDI File into a single absolute-time-ordered sequence
//! of note events. Delta times are converted with one global tempo map, so
//! tempo changes written on any track apply to every track.
//!
//! Parsing is all-or-nothing: a malformed container yields a `ParseError`
//! before any event is returned.

use super::{NoteEvent, NoteKind};
use crate::{LedToneError, Result};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Tempo assumed until the first Set Tempo event (120 BPM)
pub const DEFAULT_TEMPO_US_PER_BEAT: u32 = 500_000;

/// Options controlling event extraction
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Case-insensitive track-name substrings that mark a percussion track
    pub drum_track_patterns: Vec<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            drum_track_patterns: vec!["drum".to_string(), "perc".to_string()],
        }
    }
}

impl ExtractOptions {
    /// Check whether a track name matches one of the drum patterns
    pub fn is_drum_track(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.drum_track_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && name.contains(&pattern.to_ascii_lowercase()))
    }
}

/// Converts absolute ticks into microseconds
#[derive(Debug, Clone)]
enum TickClock {
    /// Ticks per quarter note plus the merged tempo changes of all tracks
    Metrical {
        ticks_per_beat: u64,
        /// (tick, microseconds at that tick, tempo from that tick on)
        segments: Vec<(u64, u64, u64)>,
    },
    /// SMPTE division: fixed ticks per second
    Timecode { ticks_per_second: f64 },
}

impl TickClock {
    fn metrical(ticks_per_beat: u16, mut tempo_changes: Vec<(u64, u32)>) -> Self {
        let ticks_per_beat = u64::from(ticks_per_beat.max(1));
        tempo_changes.sort_by_key(|&(tick, _)| tick);

        let mut segments = vec![(0u64, 0u64, u64::from(DEFAULT_TEMPO_US_PER_BEAT))];
        for (tick, tempo) in tempo_changes {
            let &(last_tick, last_us, last_tempo) = segments.last().unwrap_or(&(0, 0, 0));
            let micros = last_us + (tick - last_tick) * last_tempo / ticks_per_beat;
            if tick == last_tick {
                // A later change at the same tick overrides the earlier one
                segments.pop();
            }
            segments.push((tick, micros, u64::from(tempo)));
        }

        TickClock::Metrical {
            ticks_per_beat,
            segments,
        }
    }

    fn to_duration(&self, tick: u64) -> Duration {
        match self {
            TickClock::Metrical {
                ticks_per_beat,
                segments,
            } => {
                let idx = segments
                    .partition_point(|&(start, _, _)| start <= tick)
                    .saturating_sub(1);
                let (start, micros, tempo) = segments[idx];
                Duration::from_micros(micros + (tick - start) * tempo / ticks_per_beat)
            }
            TickClock::Timecode { ticks_per_second } => {
                Duration::from_secs_f64(tick as f64 / ticks_per_second)
            }
        }
    }
}

/// Parse MIDI bytes into an ordered note event sequence
///
/// Non-note messages are discarded. NoteOn with velocity 0 is treated as
/// NoteOff. The result is stably sorted by (time, track index), so events
/// sharing a timestamp keep their per-track emission order.
pub fn extract_events(data: &[u8], options: &ExtractOptions) -> Result<Vec<NoteEvent>> {
    let smf = Smf::parse(data)
        .map_err(|e| LedToneError::ParseError(format!("Malformed MIDI file: {}", e)))?;

    // Pass 1: absolute ticks for every track event plus the global tempo map
    let mut tempo_changes = Vec::new();
    let mut absolute_ticks: Vec<Vec<u64>> = Vec::with_capacity(smf.tracks.len());
    for track in &smf.tracks {
        let mut tick = 0u64;
        let mut ticks = Vec::with_capacity(track.len());
        for event in track {
            tick += u64::from(event.delta.as_int());
            ticks.push(tick);
            if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                tempo_changes.push((tick, tempo.as_int()));
            }
        }
        absolute_ticks.push(ticks);
    }

    let clock = match smf.header.timing {
        Timing::Metrical(ticks_per_beat) => {
            TickClock::metrical(ticks_per_beat.as_int(), tempo_changes)
        }
        Timing::Timecode(fps, subframes) => TickClock::Timecode {
            ticks_per_second: f64::from(fps.as_f32()) * f64::from(subframes.max(1)),
        },
    };

    // Pass 2: note events tagged with track metadata
    let mut events = Vec::new();
    for (track_index, (track, ticks)) in smf.tracks.iter().zip(&absolute_ticks).enumerate() {
        let track_name = track.iter().find_map(|event| match event.kind {
            TrackEventKind::Meta(MetaMessage::TrackName(name)) => {
                Some(String::from_utf8_lossy(name).into_owned())
            }
            _ => None,
        });
        let is_drum = track_name
            .as_deref()
            .is_some_and(|name| options.is_drum_track(name));

        for (event, &tick) in track.iter().zip(ticks) {
            let TrackEventKind::Midi { channel, message } = event.kind else {
                continue;
            };
            let (note, kind) = match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => (key.as_int(), NoteKind::On),
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    (key.as_int(), NoteKind::Off)
                }
                _ => continue,
            };
            events.push(NoteEvent {
                absolute_time: clock.to_duration(tick),
                source_track: track_index,
                source_channel: channel.as_int(),
                note,
                kind,
                is_drum,
            });
        }
    }

    events.sort_by_key(|e| (e.absolute_time, e.source_track));

    tracing::debug!(
        tracks = smf.tracks.len(),
        events = events.len(),
        "extracted note events"
    );
    Ok(events)
}

/// Read and parse a MIDI file from disk
///
/// A missing or unreadable file is reported as a `ParseError`, like a
/// malformed one.
pub fn extract_file<P: AsRef<Path>>(path: P, options: &ExtractOptions) -> Result<Vec<NoteEvent>> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|e| {
        LedToneError::ParseError(format!("Failed to read '{}': {}", path.display(), e))
    })?;
    extract_events(&data, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use midly::num::{u15, u24, u28, u4, u7};
    use midly::{Format, Header, TrackEvent};

    fn note_on(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::from(delta),
            kind: TrackEventKind::Midi {
                channel: u4::from(0u8),
                message: MidiMessage::NoteOn {
                    key: u7::from(key),
                    vel: u7::from(vel),
                },
            },
        }
    }

    fn note_off(delta: u32, key: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::from(delta),
            kind: TrackEventKind::Midi {
                channel: u4::from(0u8),
                message: MidiMessage::NoteOff {
                    key: u7::from(key),
                    vel: u7::from(0u8),
                },
            },
        }
    }

    fn meta(delta: u32, message: MetaMessage<'static>) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::from(delta),
            kind: TrackEventKind::Meta(message),
        }
    }

    fn write(tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
        let mut smf = Smf::new(Header::new(
            Format::Parallel,
            Timing::Metrical(u15::from(480u16)),
        ));
        smf.tracks = tracks;
        let mut out = Vec::new();
        smf.write_std(&mut out).unwrap();
        out
    }

    #[test]
    fn test_default_tempo_conversion() {
        let data = write(vec![vec![
            note_on(0, 60, 100),
            note_off(480, 60),
            meta(0, MetaMessage::EndOfTrack),
        ]]);
        let events = extract_events(&data, &ExtractOptions::default()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].absolute_time, Duration::ZERO);
        assert_eq!(events[1].absolute_time, Duration::from_millis(500));
        assert_eq!(events[1].kind, NoteKind::Off);
    }

    #[test]
    fn test_tempo_on_conductor_track_applies_to_all_tracks() {
        let data = write(vec![
            vec![
                meta(0, MetaMessage::Tempo(u24::from(250_000u32))),
                meta(0, MetaMessage::EndOfTrack),
            ],
            vec![note_on(960, 64, 90), meta(0, MetaMessage::EndOfTrack)],
        ]);
        let events = extract_events(&data, &ExtractOptions::default()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].absolute_time, Duration::from_millis(500));
        assert_eq!(events[0].source_track, 1);
    }

    #[test]
    fn test_mid_song_tempo_change() {
        let data = write(vec![vec![
            note_on(0, 60, 100),
            meta(480, MetaMessage::Tempo(u24::from(1_000_000u32))),
            note_off(480, 60),
            meta(0, MetaMessage::EndOfTrack),
        ]]);
        let events = extract_events(&data, &ExtractOptions::default()).unwrap();
        // 480 ticks at 500ms/beat, then 480 ticks at 1s/beat
        assert_eq!(events[1].absolute_time, Duration::from_millis(1500));
    }

    #[test]
    fn test_velocity_zero_is_note_off() {
        let data = write(vec![vec![
            note_on(0, 60, 100),
            note_on(10, 60, 0),
            meta(0, MetaMessage::EndOfTrack),
        ]]);
        let events = extract_events(&data, &ExtractOptions::default()).unwrap();
        assert_eq!(events[1].kind, NoteKind::Off);
    }

    #[test]
    fn test_drum_track_classification() {
        let data = write(vec![
            vec![
                meta(0, MetaMessage::TrackName(b"Lead")),
                note_on(0, 72, 100),
                meta(0, MetaMessage::EndOfTrack),
            ],
            vec![
                meta(0, MetaMessage::TrackName(b"Drum Kit")),
                note_on(0, 36, 100),
                meta(0, MetaMessage::EndOfTrack),
            ],
        ]);
        let events = extract_events(&data, &ExtractOptions::default()).unwrap();
        assert!(!events[0].is_drum);
        assert!(events[1].is_drum);
    }

    #[test]
    fn test_ties_ordered_by_track_then_emission() {
        let data = write(vec![
            vec![note_on(0, 60, 1), note_on(0, 62, 1), meta(0, MetaMessage::EndOfTrack)],
            vec![note_on(0, 50, 1), meta(0, MetaMessage::EndOfTrack)],
        ]);
        let events = extract_events(&data, &ExtractOptions::default()).unwrap();
        let notes: Vec<u8> = events.iter().map(|e| e.note).collect();
        assert_eq!(notes, vec![60, 62, 50]);
    }

    #[test]
    fn test_malformed_data_is_parse_error() {
        let result = extract_events(b"MThd garbage", &ExtractOptions::default());
        assert!(matches!(result, Err(LedToneError::ParseError(_))));
    }

    #[test]
    fn test_missing_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = extract_file(dir.path().join("absent.mid"), &ExtractOptions::default());
        assert!(matches!(result, Err(LedToneError::ParseError(_))));
    }

    #[test]
    fn test_extract_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mid");
        fs::write(
            &path,
            write(vec![vec![note_on(0, 60, 100), meta(0, MetaMessage::EndOfTrack)]]),
        )
        .unwrap();
        let events = extract_file(&path, &ExtractOptions::default()).unwrap();
        assert_eq!(events.len(), 1);
    }
}
