//! WS2812-style LED driver
//!
//! Each LED takes 24 bits, green then red then blue, most significant bit
//! first. A bit is one high/low pulse; the high time tells 0 from 1. A low
//! hold of at least `RESET_NS` latches the chain. Timing tolerance is in the
//! hundreds of nanoseconds, so the whole write runs with interrupts masked.

use super::hal::{InterruptControl, LedLine, LedSignal};

/// High time of a 0 bit
pub const T0H_NS: u32 = 400;
/// Low time of a 0 bit
pub const T0L_NS: u32 = 850;
/// High time of a 1 bit
pub const T1H_NS: u32 = 800;
/// Low time of a 1 bit
pub const T1L_NS: u32 = 450;
/// Minimum latch time
pub const RESET_NS: u32 = 50_000;
/// Accepted deviation from nominal pulse widths
pub const TOLERANCE_NS: u32 = 150;

#[inline]
fn write_byte<L: LedLine>(line: &mut L, byte: u8) {
    for bit in (0..8).rev() {
        if byte & (1 << bit) != 0 {
            line.pulse(T1H_NS, T1L_NS);
        } else {
            line.pulse(T0H_NS, T0L_NS);
        }
    }
}

/// Write chain-ordered RGB triples to the LED line and latch
pub fn write_pixels<L: LedLine>(line: &mut L, led_rgb: &[u8]) {
    for px in led_rgb.chunks_exact(3) {
        write_byte(line, px[1]);
        write_byte(line, px[0]);
        write_byte(line, px[2]);
    }
    line.latch(RESET_NS);
}

/// [`write_pixels`] with global interrupts masked for the duration
pub fn write_pixels_masked<H: LedLine + InterruptControl>(hal: &mut H, led_rgb: &[u8]) {
    let was_enabled = hal.global_interrupts_enabled();
    hal.set_global_interrupts(false);
    write_pixels(hal, led_rgb);
    hal.set_global_interrupts(was_enabled);
}

#[inline]
fn within(actual: u32, nominal: u32) -> bool {
    actual.abs_diff(nominal) <= TOLERANCE_NS
}

/// Recover chain-ordered RGB triples from a recorded waveform
///
/// Stops at the first latch. Returns `None` if a pulse matches neither bit
/// timing or the bit count is not a whole number of LEDs.
pub fn decode_signals(signals: &[LedSignal]) -> Option<Vec<u8>> {
    let mut grb = Vec::new();
    let mut acc = 0u8;
    let mut bits = 0;
    for signal in signals {
        match *signal {
            LedSignal::Pulse { high_ns, low_ns } => {
                let bit = if within(high_ns, T1H_NS) && within(low_ns, T1L_NS) {
                    1
                } else if within(high_ns, T0H_NS) && within(low_ns, T0L_NS) {
                    0
                } else {
                    return None;
                };
                acc = (acc << 1) | bit;
                bits += 1;
                if bits == 8 {
                    grb.push(acc);
                    acc = 0;
                    bits = 0;
                }
            }
            LedSignal::Latch { low_ns } => {
                if low_ns < RESET_NS {
                    return None;
                }
                break;
            }
        }
    }
    if bits != 0 || grb.len() % 3 != 0 {
        return None;
    }
    Some(
        grb.chunks_exact(3)
            .flat_map(|c| [c[1], c[0], c[2]])
            .collect(),
    )
}
