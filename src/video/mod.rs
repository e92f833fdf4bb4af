//! Video Domain
//!
//! Host side of the LED panel link:
//! - `frame` - RGB bitmap
//! - `serpentine` - chain order of LEDs within a panel
//! - `topology` - which receiver owns which panel, on which link
//! - `encoder` - per-receiver packet encoding
//! - `source` - image files as frames (feature `images`)
//! - `streamer` - paced streaming to link writers

pub mod encoder;
pub mod frame;
pub mod serpentine;
pub mod streamer;
pub mod topology;

#[cfg(feature = "images")]
pub mod source;

pub use encoder::{payload_len, FrameEncoder, RoutedPacket, HEADER_LEN};
pub use frame::FrameBuffer;
pub use streamer::{StreamReport, VideoStreamer};
pub use topology::{DeviceSpec, Topology, FRAME_SYNC};

#[cfg(feature = "images")]
pub use source::ImageSequence;
