//! Tone Scheduler
//!
//! Per-channel software square-wave generators driven by a fixed-rate timer
//! interrupt. The receive interrupt writes the note each channel should play
//! into [`NoteSlots`]; the timer interrupt only reads them. Slots are single
//! bytes, so a read never sees a torn value, and the newest write always wins.

use super::hal::TonePins;
use crate::notes::ticks_for;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Most tone channels one device drives
pub const MAX_TONE_CHANNELS: usize = 15;

/// Default timer interrupt period in microseconds
pub const DEFAULT_TICK_US: u16 = 20;

/// Slot value meaning silence
pub const SILENT: u8 = 0;

/// Active note per channel, shared between the two interrupt contexts
#[derive(Debug)]
pub struct NoteSlots {
    slots: Box<[AtomicU8]>,
}

impl NoteSlots {
    /// Create `channels` silent slots and split them into the single writer
    /// and a reader
    pub fn split(channels: usize) -> (NoteSlotWriter, NoteSlotReader) {
        let slots = Arc::new(NoteSlots {
            slots: (0..channels.min(MAX_TONE_CHANNELS))
                .map(|_| AtomicU8::new(SILENT))
                .collect(),
        });
        (
            NoteSlotWriter {
                slots: Arc::clone(&slots),
            },
            NoteSlotReader { slots },
        )
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// The only handle that can change slots
///
/// Not `Clone`: exactly one exists per slot array, owned by the receive path.
#[derive(Debug)]
pub struct NoteSlotWriter {
    slots: Arc<NoteSlots>,
}

impl NoteSlotWriter {
    /// Play `note` on `channel`; 0 silences
    #[inline]
    pub fn set(&mut self, channel: usize, note: u8) {
        if let Some(slot) = self.slots.slots.get(channel) {
            slot.store(note & 0x7F, Ordering::Relaxed);
        }
    }

    /// Silence every channel
    pub fn silence_all(&mut self) {
        for slot in self.slots.slots.iter() {
            slot.store(SILENT, Ordering::Relaxed);
        }
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.slots.len()
    }
}

/// Read-only view of the slots
#[derive(Debug, Clone)]
pub struct NoteSlotReader {
    slots: Arc<NoteSlots>,
}

impl NoteSlotReader {
    /// Note on `channel`, or `SILENT`
    #[inline]
    pub fn get(&self, channel: usize) -> u8 {
        self.slots
            .slots
            .get(channel)
            .map(|s| s.load(Ordering::Relaxed))
            .unwrap_or(SILENT)
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.slots.len()
    }
}

/// Per-channel counter state
#[derive(Debug, Clone, Copy, Default)]
struct ToneChannel {
    counter: u16,
    note: u8,
}

/// Timer-driven square-wave generator for every channel
#[derive(Debug, Clone)]
pub struct ToneScheduler {
    tick_us: u16,
    channels: Vec<ToneChannel>,
}

impl ToneScheduler {
    /// Scheduler for `channels` pins ticking every `tick_us`
    pub fn new(channels: usize, tick_us: u16) -> Self {
        ToneScheduler {
            tick_us: tick_us.max(1),
            channels: vec![ToneChannel::default(); channels.min(MAX_TONE_CHANNELS)],
        }
    }

    /// Timer period in microseconds
    pub fn tick_us(&self) -> u16 {
        self.tick_us
    }

    /// Timer interrupt handler
    pub fn tick<P: TonePins>(&mut self, slots: &NoteSlotReader, pins: &mut P) {
        for (index, ch) in self.channels.iter_mut().enumerate() {
            let note = slots.get(index);
            if note != ch.note {
                ch.counter = 0;
                if note == SILENT {
                    pins.set_low(index);
                }
                ch.note = note;
            }
            if note == SILENT {
                continue;
            }
            ch.counter += 1;
            if ch.counter >= ticks_for(note, self.tick_us) {
                pins.toggle(index);
                ch.counter = 0;
            }
        }
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        self.channels.fill(ToneChannel::default());
    }
}
