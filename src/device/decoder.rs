//! In-place frame expansion
//!
//! The receive buffer is sized for the expanded frame, but a packet fills
//! only its first half with packed nibbles. Expansion walks the packed bytes
//! from last to first, writing each byte's two values at `2i` and `2i + 1`.
//! Since `2i >= i`, every write lands at or after the byte just read and never
//! on a packed byte still waiting to be read.

use crate::video::serpentine;

/// One read and its two writes during expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionStep {
    /// Packed byte index read
    pub read: usize,
    /// Index receiving the high nibble
    pub write_hi: usize,
    /// Index receiving the low nibble
    pub write_lo: usize,
}

/// The exact access order used by [`expand_in_place`]
pub fn expansion_steps(packed_len: usize) -> impl Iterator<Item = ExpansionStep> {
    (0..packed_len).rev().map(|i| ExpansionStep {
        read: i,
        write_hi: 2 * i,
        write_lo: 2 * i + 1,
    })
}

/// Expand `packed_len` packed bytes at the front of `buf` into `2 * packed_len`
/// 8-bit values
///
/// Each 4-bit value is shifted back into the upper nibble; the lower nibble
/// is zero.
///
/// # Panics
/// Panics if `buf` is shorter than `2 * packed_len`.
pub fn expand_in_place(buf: &mut [u8], packed_len: usize) {
    assert!(buf.len() >= packed_len * 2, "buffer too small to expand");
    for step in expansion_steps(packed_len) {
        let byte = buf[step.read];
        buf[step.write_lo] = (byte & 0x0F) << 4;
        buf[step.write_hi] = byte & 0xF0;
    }
}

/// Reorder chain-ordered RGB triples into row-major order
pub fn to_row_major(led_rgb: &[u8], panel_size: usize) -> Vec<u8> {
    let mut out = vec![0u8; led_rgb.len()];
    for (index, px) in led_rgb.chunks_exact(3).enumerate() {
        let (x, y) = serpentine::coords(index, panel_size);
        let at = (y * panel_size + x) * 3;
        out[at..at + 3].copy_from_slice(px);
    }
    out
}
