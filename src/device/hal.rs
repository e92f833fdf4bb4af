//! Hardware abstraction for the receiver firmware
//!
//! The firmware logic is written against these traits so it runs unchanged
//! against [`SimHal`] on the host. Register semantics follow a classic 8-bit
//! AVR USART: reading the status byte then the data byte acknowledges the
//! byte, a second byte arriving before the first is read sets the overrun
//! flag and is lost.

use bitflags::bitflags;

bitflags! {
    /// USART receive status register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UartStatus: u8 {
        /// A byte is waiting in the data register
        const RX_COMPLETE = 0x80;
        /// Stop bit was not where it should be
        const FRAME_ERROR = 0x10;
        /// A byte arrived before the previous one was read
        const DATA_OVERRUN = 0x08;
    }
}

impl UartStatus {
    /// Whether the byte in the data register must be thrown away
    #[inline]
    pub fn is_fault(&self) -> bool {
        self.intersects(UartStatus::FRAME_ERROR | UartStatus::DATA_OVERRUN)
    }
}

/// Receive half of a USART
pub trait UartRx {
    /// Current status flags
    fn status(&self) -> UartStatus;
    /// Read the data register, acknowledging the byte
    fn read_data(&mut self) -> u8;
    /// Power the receiver on or off; off clears any pending byte and flags
    fn set_receiver_enabled(&mut self, enabled: bool);
    /// Enable the receive-complete interrupt
    fn set_rx_interrupt_enabled(&mut self, enabled: bool);
    /// Whether the receive-complete interrupt is enabled
    fn rx_interrupt_enabled(&self) -> bool;
}

/// Global interrupt flag
pub trait InterruptControl {
    /// Set or clear the global interrupt enable
    fn set_global_interrupts(&mut self, enabled: bool);
    /// Whether interrupts are globally enabled
    fn global_interrupts_enabled(&self) -> bool;
}

/// Square-wave output pins
pub trait TonePins {
    /// Flip the output of `channel`
    fn toggle(&mut self, channel: usize);
    /// Drive `channel` low
    fn set_low(&mut self, channel: usize);
    /// Flip the debug indicator pin
    fn toggle_debug(&mut self);
}

/// Single-wire LED data output
pub trait LedLine {
    /// Drive the line high for `high_ns` then low for `low_ns`
    fn pulse(&mut self, high_ns: u32, low_ns: u32);
    /// Hold the line low for `low_ns`, latching the chain
    fn latch(&mut self, low_ns: u32);
}

/// Hardware ID straps
pub trait IdPins {
    /// Read the ID strapped on the board
    fn read_id(&self) -> u8;
}

/// Simulated wire input
pub trait LineInput {
    /// A byte finishes arriving; returns false if it was lost
    fn latch_byte(&mut self, byte: u8) -> bool;
}

/// One waveform segment on the LED line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedSignal {
    /// High then low
    Pulse {
        /// High time in ns
        high_ns: u32,
        /// Low time in ns
        low_ns: u32,
    },
    /// Long low that latches the chain
    Latch {
        /// Low time in ns
        low_ns: u32,
    },
}

/// Host simulation of every HAL trait
#[derive(Debug, Clone)]
pub struct SimHal {
    id: u8,
    data: u8,
    status: UartStatus,
    receiver_enabled: bool,
    rx_interrupt: bool,
    global_interrupts: bool,
    receiver_cycles: usize,
    bytes_lost: usize,
    pin_levels: Vec<bool>,
    toggles: Vec<usize>,
    debug_pin: bool,
    led_signals: Vec<LedSignal>,
    unmasked_led_writes: usize,
}

impl SimHal {
    /// Board strapped with `id`, `tone_pins` output pins, everything disabled
    pub fn new(id: u8, tone_pins: usize) -> Self {
        SimHal {
            id,
            data: 0,
            status: UartStatus::empty(),
            receiver_enabled: false,
            rx_interrupt: false,
            global_interrupts: false,
            receiver_cycles: 0,
            bytes_lost: 0,
            pin_levels: vec![false; tone_pins],
            toggles: vec![0; tone_pins],
            debug_pin: false,
            led_signals: Vec::new(),
            unmasked_led_writes: 0,
        }
    }

    /// A byte finishes arriving on the wire
    ///
    /// Returns false if the receiver is off or the byte overran an unread one.
    pub fn deliver(&mut self, byte: u8) -> bool {
        if !self.receiver_enabled {
            self.bytes_lost += 1;
            return false;
        }
        if self.status.contains(UartStatus::RX_COMPLETE) {
            self.status.insert(UartStatus::DATA_OVERRUN);
            self.bytes_lost += 1;
            return false;
        }
        self.data = byte;
        self.status.insert(UartStatus::RX_COMPLETE);
        true
    }

    /// Mark the pending byte as framing-corrupted
    pub fn inject_frame_error(&mut self) {
        self.status.insert(UartStatus::FRAME_ERROR);
    }

    /// Whether the rx interrupt would fire now
    pub fn rx_interrupt_pending(&self) -> bool {
        self.rx_interrupt && self.global_interrupts && self.status.contains(UartStatus::RX_COMPLETE)
    }

    /// Times the receiver was switched off and back on
    pub fn receiver_cycles(&self) -> usize {
        self.receiver_cycles
    }

    /// Bytes that never reached the data register
    pub fn bytes_lost(&self) -> usize {
        self.bytes_lost
    }

    /// Current level of each tone pin
    pub fn pin_levels(&self) -> &[bool] {
        &self.pin_levels
    }

    /// Toggle count per tone pin
    pub fn toggles(&self) -> &[usize] {
        &self.toggles
    }

    /// Debug pin level
    pub fn debug_pin(&self) -> bool {
        self.debug_pin
    }

    /// Everything written to the LED line
    pub fn led_signals(&self) -> &[LedSignal] {
        &self.led_signals
    }

    /// Drop recorded LED output
    pub fn clear_led_signals(&mut self) {
        self.led_signals.clear();
    }

    /// LED segments emitted while interrupts were enabled
    pub fn unmasked_led_writes(&self) -> usize {
        self.unmasked_led_writes
    }
}

impl UartRx for SimHal {
    fn status(&self) -> UartStatus {
        self.status
    }

    fn read_data(&mut self) -> u8 {
        self.status = UartStatus::empty();
        self.data
    }

    fn set_receiver_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.status = UartStatus::empty();
        } else if !self.receiver_enabled {
            self.receiver_cycles += 1;
        }
        self.receiver_enabled = enabled;
    }

    fn set_rx_interrupt_enabled(&mut self, enabled: bool) {
        self.rx_interrupt = enabled;
    }

    fn rx_interrupt_enabled(&self) -> bool {
        self.rx_interrupt
    }
}

impl InterruptControl for SimHal {
    fn set_global_interrupts(&mut self, enabled: bool) {
        self.global_interrupts = enabled;
    }

    fn global_interrupts_enabled(&self) -> bool {
        self.global_interrupts
    }
}

impl TonePins for SimHal {
    fn toggle(&mut self, channel: usize) {
        if let Some(level) = self.pin_levels.get_mut(channel) {
            *level = !*level;
            self.toggles[channel] += 1;
        }
    }

    fn set_low(&mut self, channel: usize) {
        if let Some(level) = self.pin_levels.get_mut(channel) {
            *level = false;
        }
    }

    fn toggle_debug(&mut self) {
        self.debug_pin = !self.debug_pin;
    }
}

impl LedLine for SimHal {
    fn pulse(&mut self, high_ns: u32, low_ns: u32) {
        if self.global_interrupts {
            self.unmasked_led_writes += 1;
        }
        self.led_signals.push(LedSignal::Pulse { high_ns, low_ns });
    }

    fn latch(&mut self, low_ns: u32) {
        if self.global_interrupts {
            self.unmasked_led_writes += 1;
        }
        self.led_signals.push(LedSignal::Latch { low_ns });
    }
}

impl LineInput for SimHal {
    fn latch_byte(&mut self, byte: u8) -> bool {
        self.deliver(byte)
    }
}

impl IdPins for SimHal {
    fn read_id(&self) -> u8 {
        self.id
    }
}
