//! LED panel receiver firmware
//!
//! The receive interrupt feeds bytes through the state machine straight into
//! the frame buffer and raises `frame_ready` when a panel payload is
//! complete. The main loop notices the flag, masks the receive interrupt,
//! expands the buffer in place and clocks it out to the LEDs with all
//! interrupts masked, then clears the flag and unmasks. `frame_ready` is a
//! single slot: at most one frame is ever in flight. Bytes that arrive while
//! a frame is pending are read and thrown away, so a packet that overlaps the
//! pending frame is lost whole instead of tearing the buffer.

use super::decoder::{expand_in_place, to_row_major};
use super::hal::{IdPins, InterruptControl, LedLine, UartRx, UartStatus};
use super::led::write_pixels_masked;
use super::rx::{FrameFraming, Receiver, RxEvent, RxState};
use crate::video::payload_len;

/// Emulated LED panel receiver
#[derive(Debug)]
pub struct FrameDevice<H> {
    hal: H,
    receiver: Receiver<FrameFraming>,
    vram: Vec<u8>,
    frame_ready: bool,
    frames_shown: usize,
    overruns: usize,
    dropped_bytes: usize,
}

impl<H: UartRx + InterruptControl + LedLine + IdPins> FrameDevice<H> {
    /// Boot: read the ID straps, size the buffer, enable reception
    pub fn boot(mut hal: H, panel_size: usize) -> Self {
        let id = hal.read_id();
        let vram = vec![0u8; panel_size * panel_size * 3];
        hal.set_receiver_enabled(true);
        hal.set_rx_interrupt_enabled(true);
        hal.set_global_interrupts(true);
        FrameDevice {
            hal,
            receiver: Receiver::new(FrameFraming { id, panel_size }),
            vram,
            frame_ready: false,
            frames_shown: 0,
            overruns: 0,
            dropped_bytes: 0,
        }
    }

    /// Hardware ID read at boot
    pub fn id(&self) -> u8 {
        self.receiver.framing().id
    }

    /// Receive state
    pub fn rx_state(&self) -> RxState {
        self.receiver.state()
    }

    /// Whether a complete frame awaits display
    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    /// Frames decoded and displayed
    pub fn frames_shown(&self) -> usize {
        self.frames_shown
    }

    /// Receive faults recovered by cycling the receiver
    pub fn overruns(&self) -> usize {
        self.overruns
    }

    /// Bytes discarded because a frame was still awaiting display
    pub fn dropped_bytes(&self) -> usize {
        self.dropped_bytes
    }

    /// Raw frame buffer
    pub fn vram(&self) -> &[u8] {
        &self.vram
    }

    /// Last displayed frame in row-major RGB
    pub fn displayed(&self) -> Vec<u8> {
        to_row_major(&self.vram, self.receiver.framing().panel_size)
    }

    /// Underlying hardware
    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Underlying hardware, mutably
    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    /// Receive-complete interrupt handler
    pub fn on_rx_interrupt(&mut self) -> RxEvent {
        let status = self.hal.status();
        if status.is_fault() {
            // Byte is garbage; cycle the receiver and wait for the next sync
            self.hal.set_receiver_enabled(false);
            self.hal.set_receiver_enabled(true);
            self.receiver.resync();
            self.overruns += 1;
            return RxEvent::Idle;
        }
        if !status.contains(UartStatus::RX_COMPLETE) {
            return RxEvent::Idle;
        }

        let byte = self.hal.read_data();
        if self.frame_ready {
            self.receiver.resync();
            self.dropped_bytes += 1;
            return RxEvent::Idle;
        }
        let event = self.receiver.push(byte, &mut self.vram);
        if let RxEvent::Complete { .. } = event {
            self.frame_ready = true;
        }
        event
    }

    /// Main loop iteration: decode and display a pending frame
    ///
    /// Returns true if a frame was displayed.
    pub fn poll(&mut self) -> bool {
        if !self.frame_ready {
            return false;
        }
        self.hal.set_rx_interrupt_enabled(false);

        let packed = payload_len(self.receiver.framing().panel_size);
        expand_in_place(&mut self.vram, packed);
        write_pixels_masked(&mut self.hal, &self.vram);
        self.frames_shown += 1;

        self.frame_ready = false;
        self.receiver.resync();
        self.hal.set_rx_interrupt_enabled(true);
        true
    }
}
