//! Serial port sink

use super::PacketSink;
use crate::{LedToneError, Result};
use serialport::SerialPort;
use std::io::Write;
use std::time::Duration;

/// Write timeout applied to every opened port
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Sink writing packets to a serial device
pub struct SerialSink {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialSink {
    /// Open `path` at `baud_rate`
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(DEFAULT_WRITE_TIMEOUT)
            .open()
            .map_err(|e| LedToneError::Transport(format!("failed to open {}: {}", path, e)))?;
        tracing::info!(port = path, baud_rate, "serial link opened");
        Ok(SerialSink {
            name: path.to_string(),
            port: Some(port),
        })
    }

    /// Port name this sink was opened on
    pub fn name(&self) -> &str {
        &self.name
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        let name = &self.name;
        self.port
            .as_mut()
            .ok_or_else(|| LedToneError::Transport(format!("{} is closed", name)))
    }
}

impl PacketSink for SerialSink {
    fn send(&mut self, packet: &[u8]) -> Result<()> {
        let name = self.name.clone();
        self.port()?
            .write_all(packet)
            .map_err(|e| LedToneError::Transport(format!("write to {} failed: {}", name, e)))
    }

    fn flush(&mut self) -> Result<()> {
        let name = self.name.clone();
        self.port()?
            .flush()
            .map_err(|e| LedToneError::Transport(format!("flush of {} failed: {}", name, e)))
    }

    fn close(&mut self) -> Result<()> {
        let Some(mut port) = self.port.take() else {
            return Ok(());
        };
        let flushed = port.flush();
        drop(port);
        tracing::info!(port = %self.name, "serial link closed");
        flushed.map_err(|e| LedToneError::Transport(format!("flush of {} failed: {}", self.name, e)))
    }
}

impl Drop for SerialSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
