//! Frame Encoder
//!
//! Packet layout per receiver per frame:
//!
//! ```text
//! [FRAME_SYNC] [hardware id] [payload ...]
//! ```
//!
//! The payload walks the panel's LEDs in chain (serpentine) order and emits
//! R, G and B for each, truncated to their upper 4 bits. Consecutive 4-bit
//! values are packed two per byte, first value in the high nibble.

use super::{serpentine, DeviceSpec, FrameBuffer, Topology, FRAME_SYNC};
use crate::{LedToneError, Result};

/// Header bytes before the payload
pub const HEADER_LEN: usize = 2;

/// Packed payload length for a square panel
#[inline]
pub fn payload_len(panel_size: usize) -> usize {
    panel_size * panel_size * 3 / 2
}

/// One encoded packet and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedPacket {
    /// Link index to write on
    pub link: usize,
    /// Receiver the packet addresses
    pub device_id: u8,
    /// Header and payload
    pub bytes: Vec<u8>,
}

/// Cuts frames into per-receiver packets
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    topology: Topology,
}

impl FrameEncoder {
    /// Create an encoder for a topology
    pub fn new(topology: Topology) -> Self {
        FrameEncoder { topology }
    }

    /// Topology in use
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Encode the panel owned by `device`
    pub fn encode_panel(&self, frame: &FrameBuffer, device: &DeviceSpec) -> Vec<u8> {
        let size = self.topology.panel_size();
        let mut packet = Vec::with_capacity(HEADER_LEN + payload_len(size));
        packet.push(FRAME_SYNC);
        packet.push(device.id);

        let mut pending: Option<u8> = None;
        for index in 0..size * size {
            let (x, y) = serpentine::coords(index, size);
            for value in frame.pixel(device.origin_x + x, device.origin_y + y) {
                let nibble = value >> 4;
                match pending.take() {
                    None => pending = Some(nibble),
                    Some(high) => packet.push((high << 4) | nibble),
                }
            }
        }
        debug_assert!(pending.is_none());
        packet
    }

    /// Encode every receiver's packet for one frame
    pub fn encode_frame(&self, frame: &FrameBuffer) -> Result<Vec<RoutedPacket>> {
        if frame.width != self.topology.frame_width() || frame.height != self.topology.frame_height()
        {
            return Err(LedToneError::FrameError(format!(
                "frame is {}x{}, topology expects {}x{}",
                frame.width,
                frame.height,
                self.topology.frame_width(),
                self.topology.frame_height()
            )));
        }
        Ok(self
            .topology
            .devices()
            .iter()
            .map(|device| RoutedPacket {
                link: device.link,
                device_id: device.id,
                bytes: self.encode_panel(frame, device),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_panel(size: usize) -> FrameEncoder {
        FrameEncoder::new(Topology::grid(size, size, size, 1).unwrap())
    }

    #[test]
    fn test_payload_len() {
        assert_eq!(payload_len(2), 6);
        assert_eq!(payload_len(8), 96);
        assert_eq!(payload_len(16), 384);
    }

    #[test]
    fn test_two_by_two_packing() {
        let frame = FrameBuffer::from_pixels(
            2,
            2,
            &[[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]],
        )
        .unwrap();
        let encoder = single_panel(2);
        let packet = encoder.encode_panel(&frame, &encoder.topology().devices()[0]);
        // Chain order: (0,0) (1,0) (1,1) (0,1)
        // Nibbles: F 0 0 | 0 F 0 | F F F | 0 0 F
        assert_eq!(packet, vec![FRAME_SYNC, 0, 0xF0, 0x00, 0xF0, 0xFF, 0xF0, 0x0F]);
    }

    #[test]
    fn test_frame_routes_to_owning_link() {
        let topo = Topology::grid(4, 2, 2, 2).unwrap();
        let encoder = FrameEncoder::new(topo);
        let packets = encoder.encode_frame(&FrameBuffer::new(4, 2)).unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!((packets[0].link, packets[0].device_id), (0, 0));
        assert_eq!((packets[1].link, packets[1].device_id), (1, 0));
        assert!(packets.iter().all(|p| p.bytes.len() == HEADER_LEN + 6));
    }

    #[test]
    fn test_wrong_frame_size_rejected() {
        let encoder = single_panel(2);
        assert!(matches!(
            encoder.encode_frame(&FrameBuffer::new(4, 4)),
            Err(LedToneError::FrameError(_))
        ));
    }
}
