//! Channel Allocator
//!
//! Maps an unbounded number of concurrently sounding (track, note) identities
//! onto a fixed bank of hardware tone channels, one voice per owning track.
//!
//! Policy:
//! - NoteOn from a track that already owns an active channel re-triggers
//!   that channel.
//! - Otherwise the lowest-indexed idle channel is taken.
//! - With no idle channel the NoteOn is dropped. No voice stealing.
//! - NoteOff from a track that owns a channel releases it; from a track
//!   whose NoteOn was dropped it does nothing.
//!
//! The allocator holds no clock and no randomness: the same events and
//! channel count always yield the same commands.

use super::{AllocatedCommand, NoteEvent, NoteKind};
use crate::{LedToneError, Result};

/// Largest usable channel count; channel 15 is reserved for control packets
pub const MAX_HARDWARE_CHANNELS: usize = 15;

/// Occupancy of a hardware channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelStatus {
    /// Free for allocation
    #[default]
    Idle,
    /// Sounding a note for its owner
    Active,
}

/// Per-hardware-channel allocation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelState {
    /// Track that owns the channel while active
    pub owner_track: Option<usize>,
    /// Note currently sounding
    pub owner_note: Option<u8>,
    /// Idle or Active
    pub status: ChannelStatus,
}

/// Allocates note events onto N hardware channels
#[derive(Debug, Clone)]
pub struct ChannelAllocator {
    channels: Vec<ChannelState>,
    dropped: usize,
}

impl ChannelAllocator {
    /// Create an allocator for `channel_count` hardware channels (1..=15)
    pub fn new(channel_count: usize) -> Result<Self> {
        if !(1..=MAX_HARDWARE_CHANNELS).contains(&channel_count) {
            return Err(LedToneError::ConfigError(format!(
                "channel count {} outside 1..={}",
                channel_count, MAX_HARDWARE_CHANNELS
            )));
        }
        Ok(ChannelAllocator {
            channels: vec![ChannelState::default(); channel_count],
            dropped: 0,
        })
    }

    /// Number of hardware channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Current state of every channel
    pub fn states(&self) -> &[ChannelState] {
        &self.channels
    }

    /// Number of currently active channels
    pub fn active_count(&self) -> usize {
        self.channels
            .iter()
            .filter(|c| c.status == ChannelStatus::Active)
            .count()
    }

    /// NoteOns dropped for lack of an idle channel since creation or last reset
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Return every channel to Idle
    pub fn reset(&mut self) {
        self.channels.fill(ChannelState::default());
        self.dropped = 0;
    }

    fn owned_by(&self, track: usize) -> Option<usize> {
        self.channels.iter().position(|c| {
            c.status == ChannelStatus::Active && c.owner_track == Some(track)
        })
    }

    /// Feed one event, returning the command it produces (if any)
    ///
    /// Drum events never produce commands.
    pub fn process(&mut self, event: &NoteEvent) -> Option<AllocatedCommand> {
        if event.is_drum {
            return None;
        }

        match event.kind {
            NoteKind::On => {
                let channel = match self.owned_by(event.source_track) {
                    Some(channel) => channel,
                    None => {
                        let Some(idle) = self
                            .channels
                            .iter()
                            .position(|c| c.status == ChannelStatus::Idle)
                        else {
                            self.dropped += 1;
                            tracing::debug!(
                                track = event.source_track,
                                note = event.note,
                                "no idle channel, note dropped"
                            );
                            return None;
                        };
                        idle
                    }
                };

                self.channels[channel] = ChannelState {
                    owner_track: Some(event.source_track),
                    owner_note: Some(event.note),
                    status: ChannelStatus::Active,
                };
                Some(AllocatedCommand {
                    absolute_time: event.absolute_time,
                    hardware_channel: channel as u8,
                    kind: NoteKind::On,
                    note: Some(event.note),
                })
            }
            NoteKind::Off => {
                let channel = self.owned_by(event.source_track)?;
                self.channels[channel] = ChannelState::default();
                Some(AllocatedCommand {
                    absolute_time: event.absolute_time,
                    hardware_channel: channel as u8,
                    kind: NoteKind::Off,
                    note: None,
                })
            }
        }
    }

    /// Allocate a whole ordered event sequence
    pub fn allocate_all(&mut self, events: &[NoteEvent]) -> Vec<AllocatedCommand> {
        let commands: Vec<AllocatedCommand> =
            events.iter().filter_map(|event| self.process(event)).collect();
        if self.dropped > 0 {
            tracing::warn!(
                dropped = self.dropped,
                channels = self.channels.len(),
                "channel overcommit dropped note-ons"
            );
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rejects_invalid_channel_counts() {
        assert!(ChannelAllocator::new(0).is_err());
        assert!(ChannelAllocator::new(16).is_err());
        assert!(ChannelAllocator::new(15).is_ok());
    }

    #[test]
    fn test_first_idle_channel_in_index_order() {
        let mut alloc = ChannelAllocator::new(3).unwrap();
        let a = alloc.process(&NoteEvent::on(0, 0, 60)).unwrap();
        let b = alloc.process(&NoteEvent::on(0, 1, 62)).unwrap();
        assert_eq!(a.hardware_channel, 0);
        assert_eq!(b.hardware_channel, 1);

        alloc.process(&NoteEvent::off(10, 0, 60)).unwrap();
        let c = alloc.process(&NoteEvent::on(20, 2, 64)).unwrap();
        assert_eq!(c.hardware_channel, 0);
    }

    #[test]
    fn test_retrigger_reuses_owned_channel() {
        let mut alloc = ChannelAllocator::new(2).unwrap();
        alloc.process(&NoteEvent::on(0, 5, 60));
        let again = alloc.process(&NoteEvent::on(100, 5, 67)).unwrap();
        assert_eq!(again.hardware_channel, 0);
        assert_eq!(again.note, Some(67));
        assert_eq!(alloc.active_count(), 1);
        assert_eq!(alloc.states()[0].owner_note, Some(67));
    }

    #[test]
    fn test_overcommit_drops_without_stealing() {
        let mut alloc = ChannelAllocator::new(2).unwrap();
        assert!(alloc.process(&NoteEvent::on(0, 0, 60)).is_some());
        assert!(alloc.process(&NoteEvent::on(0, 1, 62)).is_some());
        assert!(alloc.process(&NoteEvent::on(0, 2, 64)).is_none());
        assert_eq!(alloc.dropped(), 1);
        assert_eq!(alloc.active_count(), 2);
        // Off for the dropped track is a no-op
        assert!(alloc.process(&NoteEvent::off(5, 2, 64)).is_none());
        assert_eq!(alloc.states()[0].owner_track, Some(0));
        assert_eq!(alloc.states()[1].owner_track, Some(1));
    }

    #[test]
    fn test_drums_are_skipped() {
        let mut alloc = ChannelAllocator::new(1).unwrap();
        let drum = NoteEvent {
            is_drum: true,
            ..NoteEvent::on(0, 9, 36)
        };
        assert!(alloc.process(&drum).is_none());
        assert_eq!(alloc.active_count(), 0);
        assert_eq!(alloc.dropped(), 0);
    }

    #[test]
    fn test_off_command_has_no_note() {
        let mut alloc = ChannelAllocator::new(1).unwrap();
        alloc.process(&NoteEvent::on(0, 0, 60));
        let off = alloc.process(&NoteEvent::off(250, 0, 60)).unwrap();
        assert_eq!(off.kind, NoteKind::Off);
        assert_eq!(off.note, None);
        assert_eq!(off.absolute_time, Duration::from_millis(250));
        assert_eq!(alloc.states()[0], ChannelState::default());
    }

    #[test]
    fn test_reset_returns_channels_to_idle() {
        let mut alloc = ChannelAllocator::new(1).unwrap();
        alloc.process(&NoteEvent::on(0, 0, 60));
        alloc.process(&NoteEvent::on(0, 1, 61));
        alloc.reset();
        assert_eq!(alloc.active_count(), 0);
        assert_eq!(alloc.dropped(), 0);
    }
}
