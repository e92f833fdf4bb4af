//! Note Frequency Table
//!
//! Static MIDI note number to toggle-period lookup used by the device tone
//! generators. A square wave at frequency `f` toggles its output pin every
//! `1 / (2f)` seconds; the table stores that half period in microseconds,
//! equal temperament with A4 (note 69) at 440 Hz.

/// Number of addressable MIDI notes
pub const NOTE_COUNT: usize = 128;

/// Half period (µs between pin toggles) for each MIDI note 0..=127
pub const HALF_PERIOD_US: [u16; NOTE_COUNT] = [
    61156, 57724, 54484, 51426, 48540, 45815, 43244, 40817,
    38526, 36364, 34323, 32396, 30578, 28862, 27242, 25713,
    24270, 22908, 21622, 20408, 19263, 18182, 17161, 16198,
    15289, 14431, 13621, 12856, 12135, 11454, 10811, 10204,
    9631, 9091, 8581, 8099, 7645, 7215, 6810, 6428,
    6067, 5727, 5405, 5102, 4816, 4545, 4290, 4050,
    3822, 3608, 3405, 3214, 3034, 2863, 2703, 2551,
    2408, 2273, 2145, 2025, 1911, 1804, 1703, 1607,
    1517, 1432, 1351, 1276, 1204, 1136, 1073, 1012,
    956, 902, 851, 804, 758, 716, 676, 638,
    602, 568, 536, 506, 478, 451, 426, 402,
    379, 358, 338, 319, 301, 284, 268, 253,
    239, 225, 213, 201, 190, 179, 169, 159,
    150, 142, 134, 127, 119, 113, 106, 100,
    95, 89, 84, 80, 75, 71, 67, 63,
    60, 56, 53, 50, 47, 45, 42, 40,
];

/// Half period in microseconds for a MIDI note (masked to 0..=127)
#[inline]
pub fn half_period_us(note: u8) -> u16 {
    HALF_PERIOD_US[(note & 0x7F) as usize]
}

/// Nominal frequency in Hz of a MIDI note
pub fn frequency_hz(note: u8) -> f64 {
    440.0 * 2f64.powf((f64::from(note & 0x7F) - 69.0) / 12.0)
}

/// Number of scheduler ticks between toggles for `note` at a tick length of `tick_us`
///
/// Notes whose half period is shorter than one tick saturate at one tick.
#[inline]
pub fn ticks_for(note: u8, tick_us: u16) -> u16 {
    (half_period_us(note) / tick_us.max(1)).max(1)
}
