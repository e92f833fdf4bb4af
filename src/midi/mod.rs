//! MIDI Domain
//!
//! Everything between a Standard MIDI File and the bytes on the MIDI link:
//! - `event` - note events and allocated commands
//! - `extractor` - multi-track container parsing into absolute time
//! - `allocator` - fixed hardware channel allocation
//! - `wire` - 2-byte link packets

pub mod allocator;
pub mod event;
pub mod extractor;
pub mod wire;

pub use allocator::{ChannelAllocator, ChannelState, ChannelStatus, MAX_HARDWARE_CHANNELS};
pub use event::{AllocatedCommand, NoteEvent, NoteKind};
pub use extractor::{extract_events, extract_file, ExtractOptions};
pub use wire::{WireCommand, WirePacket, CONTROL_CHANNEL};
