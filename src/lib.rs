//! Serial fan-out driver for buzzer and LED-panel microcontrollers
//!
//! Drives a fleet of small 8-bit receivers from a host computer to produce
//! synchronized square-wave audio and addressable-LED video over shared
//! serial lines. The crate covers both ends of the link:
//!
//! # Host side
//! - MIDI file extraction into an absolute-time event sequence (`midi`)
//! - Channel allocation onto a fixed bank of hardware tone channels (`midi`)
//! - Wall-clock replay of allocated commands (`dispatch`)
//! - Compressed, address-routed, serpentine-ordered frame packets (`video`)
//! - Dedicated writer threads per serial link (`transport`)
//!
//! # Device side
//! - Emulation of the receiver firmware (`device`): the interrupt-driven
//!   sync/address/payload state machine, in-place frame expansion, the
//!   bit-exact LED pulse writer and the timer-driven tone scheduler.
//!
//! # Crate feature flags
//! - `serial` (default): real serial-port sink (`transport::SerialSink`)
//! - `images` (default): image-sequence frame source (`video::ImageSequence`)
//!
//! # Quick start
//! ```no_run
//! use ledtone::midi::{extract_file, ChannelAllocator, ExtractOptions};
//! use ledtone::transport::MemorySink;
//! use ledtone::{CancelToken, SystemClock, TimedDispatcher};
//!
//! let events = extract_file("song.mid", &ExtractOptions::default()).unwrap();
//! let mut allocator = ChannelAllocator::new(4).unwrap();
//! let commands = allocator.allocate_all(&events);
//!
//! let mut dispatcher = TimedDispatcher::new(SystemClock::new(), MemorySink::new());
//! let report = dispatcher.run(&commands, &CancelToken::new()).unwrap();
//! println!("sent {} packets, {} late", report.sent, report.late);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod device;
pub mod dispatch;
pub mod logging;
pub mod midi;
pub mod notes;
pub mod session;
pub mod timing;
pub mod transport;
pub mod video;

/// Error types for host-side operations
///
/// Device-side faults (receive overrun, address mismatch) never surface here;
/// they are recovered inside the emulated firmware.
#[derive(thiserror::Error, Debug)]
pub enum LedToneError {
    /// Malformed or missing input data (MIDI file, packet bytes)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial transport failure (open, write, flush, writer thread death)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid configuration or topology
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Missing or malformed frame image
    #[error("Frame error: {0}")]
    FrameError(String),

    /// Image decoding failure
    #[cfg(feature = "images")]
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for LedToneError {
    /// Converts a String into `LedToneError::Other`.
    ///
    /// Prefer the specific variants (`ParseError`, `Transport`, `ConfigError`)
    /// where the failure class is known.
    fn from(msg: String) -> Self {
        LedToneError::Other(msg)
    }
}

impl From<&str> for LedToneError {
    /// Converts a string slice into `LedToneError::Other`.
    fn from(msg: &str) -> Self {
        LedToneError::Other(msg.to_string())
    }
}

/// Result type for host-side operations
pub type Result<T> = std::result::Result<T, LedToneError>;

// Public API exports
pub use config::HostConfig;
pub use dispatch::{DispatchReport, TimedDispatcher};
pub use midi::{AllocatedCommand, ChannelAllocator, NoteEvent, NoteKind, WirePacket};
pub use timing::{CancelToken, Clock, ManualClock, SystemClock};
pub use transport::{LinkWriter, MemorySink, PacketSink};
pub use video::{FrameBuffer, FrameEncoder, Topology};

#[cfg(feature = "serial")]
pub use transport::SerialSink;

#[cfg(feature = "images")]
pub use video::ImageSequence;
