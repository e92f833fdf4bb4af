//! MIDI link wire format
//!
//! Two bytes per event, no length prefix, no checksum:
//! - byte 0: command nibble (high) + hardware channel (low)
//! - byte 1: note number, 0 for Off
//!
//! The command nibbles keep bit 7 set so that a status byte can never be
//! mistaken for a note byte; receivers use that bit to find packet starts.
//! Channel 15 is reserved for control: NoteOn on it toggles the debug pin,
//! NoteOff on it silences every channel.

use super::{AllocatedCommand, NoteKind};
use crate::{LedToneError, Result};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Bytes per MIDI wire packet
pub const PACKET_LEN: usize = 2;

/// Reserved control channel
pub const CONTROL_CHANNEL: u8 = 15;

/// Command nibble of a status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum WireCommand {
    /// Stop the channel (or all channels on the control channel)
    NoteOff = 0x8,
    /// Start a note (or toggle the debug pin on the control channel)
    NoteOn = 0x9,
}

impl From<NoteKind> for WireCommand {
    fn from(kind: NoteKind) -> Self {
        match kind {
            NoteKind::On => WireCommand::NoteOn,
            NoteKind::Off => WireCommand::NoteOff,
        }
    }
}

/// A decoded 2-byte MIDI link packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WirePacket {
    /// Command nibble
    pub command: WireCommand,
    /// Hardware channel 0-14, or 15 for control
    pub channel: u8,
    /// Note number (0 for Off)
    pub note: u8,
}

impl WirePacket {
    /// Build the packet for an allocated command
    pub fn from_command(cmd: &AllocatedCommand) -> Self {
        WirePacket {
            command: cmd.kind.into(),
            channel: cmd.hardware_channel & 0x0F,
            note: match cmd.kind {
                NoteKind::On => cmd.note.unwrap_or(0) & 0x7F,
                NoteKind::Off => 0,
            },
        }
    }

    /// Broadcast that silences every channel on every receiver
    pub const fn all_off() -> Self {
        WirePacket {
            command: WireCommand::NoteOff,
            channel: CONTROL_CHANNEL,
            note: 0,
        }
    }

    /// Toggle the receivers' debug indicator
    pub const fn debug_toggle() -> Self {
        WirePacket {
            command: WireCommand::NoteOn,
            channel: CONTROL_CHANNEL,
            note: 0,
        }
    }

    /// Status byte: command nibble and channel
    #[inline]
    pub fn status_byte(&self) -> u8 {
        ((self.command as u8) << 4) | (self.channel & 0x0F)
    }

    /// Serialize to wire bytes
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        [self.status_byte(), self.note & 0x7F]
    }

    /// Check whether a byte can start a packet
    #[inline]
    pub fn is_status_byte(byte: u8) -> bool {
        WireCommand::from_u8(byte >> 4).is_some()
    }

    /// Parse wire bytes
    pub fn decode(bytes: [u8; PACKET_LEN]) -> Result<Self> {
        let command = WireCommand::from_u8(bytes[0] >> 4).ok_or_else(|| {
            LedToneError::ParseError(format!("unknown command nibble in {:#04x}", bytes[0]))
        })?;
        if bytes[1] & 0x80 != 0 {
            return Err(LedToneError::ParseError(format!(
                "note byte {:#04x} has bit 7 set",
                bytes[1]
            )));
        }
        Ok(WirePacket {
            command,
            channel: bytes[0] & 0x0F,
            note: bytes[1],
        })
    }

    /// Whether this is a control-channel packet
    pub fn is_control(&self) -> bool {
        self.channel == CONTROL_CHANNEL
    }
}
