//! Receiver Firmware Emulation
//!
//! The device side of both links, written against small HAL traits so the
//! same logic runs on the host against a simulated board:
//! - `hal` - USART, interrupt, pin and LED-line traits plus `SimHal`
//! - `rx` - byte-level sync/address/payload state machine
//! - `decoder` - in-place nibble expansion
//! - `led` - bit-exact LED pulse output
//! - `frame_device` - LED panel receiver
//! - `tone` - note slots and the timer-driven tone scheduler
//! - `midi_device` - buzzer receiver
//! - `bus` - shared line broadcasting to many receivers
//!
//! Device faults never leave the device: an overrun costs at most one frame
//! or one note event and is recovered by resynchronising.

pub mod bus;
pub mod decoder;
pub mod frame_device;
pub mod hal;
pub mod led;
pub mod midi_device;
pub mod rx;
pub mod tone;

pub use bus::{BusNode, LogicalBus};
pub use frame_device::FrameDevice;
pub use hal::{LedSignal, SimHal, UartStatus};
pub use midi_device::MidiDevice;
pub use rx::{FrameFraming, Framing, MidiFraming, Receiver, RxEvent, RxState};
pub use tone::{NoteSlotReader, NoteSlotWriter, NoteSlots, ToneScheduler};
