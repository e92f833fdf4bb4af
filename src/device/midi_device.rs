//! Buzzer receiver firmware
//!
//! Serves a contiguous block of hardware channels starting at the channel
//! strapped on its ID pins. Each complete 2-byte packet addressed to one of
//! those channels overwrites that channel's note slot; the timer interrupt
//! turns slots into square waves. Control-channel packets are honoured by
//! every device.

use super::hal::{IdPins, InterruptControl, TonePins, UartRx, UartStatus};
use super::rx::{MidiFraming, Receiver, RxEvent, RxState};
use super::tone::{NoteSlotReader, NoteSlotWriter, NoteSlots, ToneScheduler, MAX_TONE_CHANNELS, SILENT};
use crate::midi::{WireCommand, CONTROL_CHANNEL};
use crate::{LedToneError, Result};
use num_traits::FromPrimitive;

/// Emulated buzzer receiver
#[derive(Debug)]
pub struct MidiDevice<H> {
    hal: H,
    receiver: Receiver<MidiFraming>,
    note: [u8; 1],
    writer: NoteSlotWriter,
    reader: NoteSlotReader,
    scheduler: ToneScheduler,
    overruns: usize,
}

impl<H: UartRx + InterruptControl + TonePins + IdPins> MidiDevice<H> {
    /// Boot: read the base channel from the ID straps and enable reception
    pub fn boot(mut hal: H, channels: usize, tick_us: u16) -> Result<Self> {
        let base = hal.read_id();
        if channels == 0 || channels > MAX_TONE_CHANNELS {
            return Err(LedToneError::ConfigError(format!(
                "device channel count {} outside 1..={}",
                channels, MAX_TONE_CHANNELS
            )));
        }
        if usize::from(base) + channels > usize::from(CONTROL_CHANNEL) {
            return Err(LedToneError::ConfigError(format!(
                "channels {}..{} overlap the control channel",
                base,
                usize::from(base) + channels
            )));
        }

        let (writer, reader) = NoteSlots::split(channels);
        hal.set_receiver_enabled(true);
        hal.set_rx_interrupt_enabled(true);
        hal.set_global_interrupts(true);
        Ok(MidiDevice {
            hal,
            receiver: Receiver::new(MidiFraming {
                base_channel: base,
                channel_count: channels as u8,
            }),
            note: [0],
            writer,
            reader,
            scheduler: ToneScheduler::new(channels, tick_us),
            overruns: 0,
        })
    }

    /// First hardware channel served
    pub fn base_channel(&self) -> u8 {
        self.receiver.framing().base_channel
    }

    /// Receive state
    pub fn rx_state(&self) -> RxState {
        self.receiver.state()
    }

    /// Note sounding on local channel `index`, or 0
    pub fn active_note(&self, index: usize) -> u8 {
        self.reader.get(index)
    }

    /// Receive faults recovered by cycling the receiver
    pub fn overruns(&self) -> usize {
        self.overruns
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
        let event = self.receiver.push(byte, &mut self.note);
        if let RxEvent::Complete { header } = event {
            self.apply(header, self.note[0]);
        }
        event
    }

    fn apply(&mut self, header: u8, note: u8) {
        let Some(command) = WireCommand::from_u8(header >> 4) else {
            return;
        };
        let channel = header & 0x0F;
        if channel == CONTROL_CHANNEL {
            match command {
                WireCommand::NoteOn => self.hal.toggle_debug(),
                WireCommand::NoteOff => self.writer.silence_all(),
            }
            return;
        }
        let local = usize::from(channel - self.base_channel());
        match command {
            WireCommand::NoteOn => self.writer.set(local, note),
            WireCommand::NoteOff => self.writer.set(local, SILENT),
        }
    }

    /// Timer interrupt handler
    pub fn on_timer_interrupt(&mut self) {
        self.scheduler.tick(&self.reader, &mut self.hal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::hal::SimHal;
    use crate::midi::WirePacket;
    use crate::device::tone::DEFAULT_TICK_US;

    fn feed(dev: &mut MidiDevice<SimHal>, bytes: &[u8]) {
        for &b in bytes {
            dev.hal_mut().deliver(b);
            dev.on_rx_interrupt();
        }
    }

    fn device(base: u8, channels: usize) -> MidiDevice<SimHal> {
        MidiDevice::boot(SimHal::new(base, channels), channels, DEFAULT_TICK_US).unwrap()
    }

    #[test]
    fn test_boot_rejects_control_overlap() {
        assert!(MidiDevice::boot(SimHal::new(12, 4), 4, DEFAULT_TICK_US).is_err());
        assert!(MidiDevice::boot(SimHal::new(0, 0), 0, DEFAULT_TICK_US).is_err());
        assert!(MidiDevice::boot(SimHal::new(11, 4), 4, DEFAULT_TICK_US).is_ok());
    }

    #[test]
    fn test_addressed_packets_drive_slots() {
        let mut dev = device(4, 2);
        feed(&mut dev, &[0x94, 60, 0x95, 64, 0x90, 72]);
        assert_eq!(dev.active_note(0), 60);
        assert_eq!(dev.active_note(1), 64);

        feed(&mut dev, &[0x84, 0]);
        assert_eq!(dev.active_note(0), SILENT);
        assert_eq!(dev.active_note(1), 64);
    }

    #[test]
    fn test_control_channel() {
        let mut dev = device(0, 2);
        feed(&mut dev, &[0x90, 60, 0x91, 62]);
        feed(&mut dev, &WirePacket::debug_toggle().encode());
        assert!(dev.hal().debug_pin());
        feed(&mut dev, &WirePacket::all_off().encode());
        assert_eq!(dev.active_note(0), SILENT);
        assert_eq!(dev.active_note(1), SILENT);
    }

    #[test]
    fn test_timer_generates_tone() {
        let mut dev = device(0, 1);
        feed(&mut dev, &[0x90, 69]);
        for _ in 0..56 * 4 {
            dev.on_timer_interrupt();
        }
        assert_eq!(dev.hal().toggles(), &[4]);
    }

    #[test]
    fn test_overrun_loses_one_event() {
        let mut dev = device(0, 1);
        dev.hal_mut().deliver(0x90);
        dev.hal_mut().deliver(60);
        dev.on_rx_interrupt();
        assert_eq!(dev.overruns(), 1);
        assert_eq!(dev.rx_state(), RxState::WaitSync);
        feed(&mut dev, &[0x90, 61]);
        assert_eq!(dev.active_note(0), 61);
    }
}
