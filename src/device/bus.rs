//! Logical broadcast bus
//!
//! Every receiver on a serial line sees every byte. The bus hands each byte
//! to every attached node in turn and lets the node's own framing decide
//! whether the packet is for it. Used for both the frame and MIDI links.

use super::frame_device::FrameDevice;
use super::hal::{IdPins, InterruptControl, LedLine, LineInput, TonePins, UartRx};
use super::midi_device::MidiDevice;
use super::rx::RxEvent;
use crate::transport::PacketSink;
use crate::Result;

/// A receiver attached to a shared line
pub trait BusNode {
    /// A byte finished arriving; runs the receive interrupt if unmasked
    fn on_byte(&mut self, byte: u8) -> RxEvent;

    /// One main-loop pass between bytes
    fn idle(&mut self) {}
}

impl<H: UartRx + InterruptControl + LedLine + IdPins + LineInput> BusNode for FrameDevice<H> {
    fn on_byte(&mut self, byte: u8) -> RxEvent {
        self.hal_mut().latch_byte(byte);
        if self.hal().rx_interrupt_enabled() && self.hal().global_interrupts_enabled() {
            self.on_rx_interrupt()
        } else {
            RxEvent::Idle
        }
    }

    fn idle(&mut self) {
        self.poll();
    }
}

impl<H: UartRx + InterruptControl + TonePins + IdPins + LineInput> BusNode for MidiDevice<H> {
    fn on_byte(&mut self, byte: u8) -> RxEvent {
        self.hal_mut().latch_byte(byte);
        if self.hal().rx_interrupt_enabled() && self.hal().global_interrupts_enabled() {
            self.on_rx_interrupt()
        } else {
            RxEvent::Idle
        }
    }
}

/// Shared serial line with any number of receivers
#[derive(Debug)]
pub struct LogicalBus<N> {
    nodes: Vec<N>,
    bytes_sent: usize,
}

impl<N: BusNode> Default for LogicalBus<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: BusNode> LogicalBus<N> {
    /// Empty line
    pub fn new() -> Self {
        LogicalBus {
            nodes: Vec::new(),
            bytes_sent: 0,
        }
    }

    /// Attach a receiver, returning its index
    pub fn attach(&mut self, node: N) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Attached receivers
    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// One receiver, mutably
    pub fn node_mut(&mut self, index: usize) -> Option<&mut N> {
        self.nodes.get_mut(index)
    }

    /// Bytes broadcast so far
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    /// Broadcast one byte, returning the nodes that completed a packet with it
    pub fn broadcast(&mut self, byte: u8) -> Vec<usize> {
        self.bytes_sent += 1;
        let mut completed = Vec::new();
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if let RxEvent::Complete { .. } = node.on_byte(byte) {
                completed.push(index);
            }
            node.idle();
        }
        completed
    }

    /// Broadcast a byte run, returning every node that accepted a packet
    pub fn transmit(&mut self, bytes: &[u8]) -> Vec<usize> {
        let mut accepted = Vec::new();
        for &byte in bytes {
            for index in self.broadcast(byte) {
                if !accepted.contains(&index) {
                    accepted.push(index);
                }
            }
        }
        accepted
    }

    /// Detach every receiver
    pub fn into_nodes(self) -> Vec<N> {
        self.nodes
    }
}

impl<N: BusNode + Send> PacketSink for LogicalBus<N> {
    fn send(&mut self, packet: &[u8]) -> Result<()> {
        let accepted = self.transmit(packet);
        tracing::trace!(len = packet.len(), ?accepted, "bus packet");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::hal::SimHal;
    use crate::device::tone::DEFAULT_TICK_US;
    use crate::video::FRAME_SYNC;

    #[test]
    fn test_only_addressed_frame_device_accepts() {
        let mut bus = LogicalBus::new();
        for id in 0..3 {
            bus.attach(FrameDevice::boot(SimHal::new(id, 0), 2));
        }
        let accepted = bus.transmit(&[FRAME_SYNC, 1, 1, 2, 3, 4, 5, 6]);
        assert_eq!(accepted, vec![1]);
        assert_eq!(bus.nodes()[1].frames_shown(), 1);
        assert_eq!(bus.nodes()[0].frames_shown(), 0);
        assert_eq!(bus.bytes_sent(), 8);
    }

    #[test]
    fn test_midi_control_reaches_every_device() {
        let mut bus = LogicalBus::new();
        bus.attach(MidiDevice::boot(SimHal::new(0, 2), 2, DEFAULT_TICK_US).unwrap());
        bus.attach(MidiDevice::boot(SimHal::new(2, 2), 2, DEFAULT_TICK_US).unwrap());

        assert_eq!(bus.transmit(&[0x93, 70]), vec![1]);
        assert_eq!(bus.transmit(&[0x8F, 0]), vec![0, 1]);
        assert_eq!(bus.nodes()[1].active_note(1), 0);
    }

    #[test]
    fn test_bus_as_packet_sink() {
        let mut bus = LogicalBus::new();
        bus.attach(MidiDevice::boot(SimHal::new(0, 1), 1, DEFAULT_TICK_US).unwrap());
        bus.send(&[0x90, 64]).unwrap();
        assert_eq!(bus.nodes()[0].active_note(0), 64);
    }
}
