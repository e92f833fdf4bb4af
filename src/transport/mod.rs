//! Serial Transport
//!
//! - `sink` - packet sink trait and the in-memory sink
//! - `serial` - real serial port sink (feature `serial`)
//! - `writer` - per-link writer thread behind a bounded queue

pub mod sink;
pub mod writer;

#[cfg(feature = "serial")]
pub mod serial;

pub use sink::{MemorySink, PacketSink, SentPacket};
pub use writer::{LinkWriter, ShutdownMode, WriterStats};

#[cfg(feature = "serial")]
pub use serial::SerialSink;
