//! Receive state machine
//!
//! Advanced once per byte from the receive interrupt:
//!
//! ```text
//! WaitSync --sync--> CheckId --id match--> ReceiveData --len bytes--> WaitSync
//!    ^                  |
//!    +---- mismatch ----+
//! ```
//!
//! A [`Framing`] decides what counts as a sync byte, whether that byte already
//! carries the address, and how long the payload is. The frame link uses a
//! dedicated sync byte followed by an ID byte; the MIDI link's status byte is
//! both sync marker and address, so it skips `CheckId`.
//!
//! On a mismatch the receiver only re-waits for the next sync byte. A sync
//! value occurring inside another device's payload can therefore start a
//! false packet; nothing here guards against that.

use crate::midi::{WirePacket, CONTROL_CHANNEL};
use crate::video::{payload_len, FRAME_SYNC};

/// Receiver state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RxState {
    /// Discarding bytes until a sync byte
    #[default]
    WaitSync,
    /// Sync seen, next byte is the target ID
    CheckId,
    /// Addressed to us, collecting payload
    ReceiveData,
}

/// What a sync candidate byte means to this device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMatch {
    /// Not a packet start, or a start addressed elsewhere
    None,
    /// Packet start; the address follows
    Header,
    /// Packet start already addressed to this device
    Addressed,
}

/// Per-link packet shape and address filter
pub trait Framing {
    /// Classify a byte seen while waiting for sync
    fn sync(&self, byte: u8) -> SyncMatch;
    /// Whether an ID byte addresses this device
    fn accepts_id(&self, id: u8) -> bool;
    /// Payload bytes after the header
    fn payload_len(&self) -> usize;
}

/// Frame link: `FRAME_SYNC`, ID byte, packed panel payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFraming {
    /// This device's hardware ID
    pub id: u8,
    /// Panel edge length
    pub panel_size: usize,
}

impl Framing for FrameFraming {
    #[inline]
    fn sync(&self, byte: u8) -> SyncMatch {
        if byte == FRAME_SYNC {
            SyncMatch::Header
        } else {
            SyncMatch::None
        }
    }

    #[inline]
    fn accepts_id(&self, id: u8) -> bool {
        id == self.id
    }

    fn payload_len(&self) -> usize {
        payload_len(self.panel_size)
    }
}

/// MIDI link: status byte addressing a channel, one note byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiFraming {
    /// First hardware channel served by this device
    pub base_channel: u8,
    /// Number of channels served
    pub channel_count: u8,
}

impl MidiFraming {
    /// Whether `channel` is one of ours or the control channel
    #[inline]
    pub fn serves(&self, channel: u8) -> bool {
        channel == CONTROL_CHANNEL
            || (channel >= self.base_channel
                && u16::from(channel) < u16::from(self.base_channel) + u16::from(self.channel_count))
    }
}

impl Framing for MidiFraming {
    fn sync(&self, byte: u8) -> SyncMatch {
        if !WirePacket::is_status_byte(byte) {
            return SyncMatch::None;
        }
        if self.serves(byte & 0x0F) {
            SyncMatch::Addressed
        } else {
            SyncMatch::None
        }
    }

    fn accepts_id(&self, _id: u8) -> bool {
        true
    }

    fn payload_len(&self) -> usize {
        1
    }
}

/// Result of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    /// Nothing of note
    Idle,
    /// A packet addressed to this device has started
    Addressed,
    /// A packet for another device was skipped
    Filtered,
    /// Payload complete; `header` is the byte that started the packet
    Complete {
        /// Sync/status byte of the packet
        header: u8,
    },
}

/// Generic three-state receiver
#[derive(Debug, Clone)]
pub struct Receiver<F: Framing> {
    framing: F,
    state: RxState,
    header: u8,
    bytes_received: usize,
}

impl<F: Framing> Receiver<F> {
    /// Receiver in `WaitSync`
    pub fn new(framing: F) -> Self {
        Receiver {
            framing,
            state: RxState::WaitSync,
            header: 0,
            bytes_received: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Payload bytes stored so far
    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }

    /// Framing in use
    pub fn framing(&self) -> &F {
        &self.framing
    }

    /// Abandon any packet in progress
    pub fn resync(&mut self) {
        self.state = RxState::WaitSync;
        self.bytes_received = 0;
    }

    /// Advance by one byte, storing payload into `buf`
    ///
    /// `buf` must hold at least `payload_len` bytes.
    pub fn push(&mut self, byte: u8, buf: &mut [u8]) -> RxEvent {
        match self.state {
            RxState::WaitSync => match self.framing.sync(byte) {
                SyncMatch::None => RxEvent::Idle,
                SyncMatch::Header => {
                    self.header = byte;
                    self.state = RxState::CheckId;
                    RxEvent::Idle
                }
                SyncMatch::Addressed => {
                    self.header = byte;
                    self.bytes_received = 0;
                    self.state = RxState::ReceiveData;
                    RxEvent::Addressed
                }
            },
            RxState::CheckId => {
                if self.framing.accepts_id(byte) {
                    self.bytes_received = 0;
                    self.state = RxState::ReceiveData;
                    RxEvent::Addressed
                } else {
                    self.state = RxState::WaitSync;
                    RxEvent::Filtered
                }
            }
            RxState::ReceiveData => {
                buf[self.bytes_received] = byte;
                self.bytes_received += 1;
                if self.bytes_received >= self.framing.payload_len() {
                    self.state = RxState::WaitSync;
                    RxEvent::Complete {
                        header: self.header,
                    }
                } else {
                    RxEvent::Idle
                }
            }
        }
    }
}
