//! Packet sinks
//!
//! A sink is the byte-oriented end of one serial link. Producers hand it whole
//! packets; it never splits or reorders them.

use crate::timing::{Clock, ManualClock};
use crate::{LedToneError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Transmit-only packet destination
pub trait PacketSink: Send {
    /// Write one whole packet
    fn send(&mut self, packet: &[u8]) -> Result<()>;

    /// Push buffered bytes to the wire
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Flush and release the underlying resource
    ///
    /// Closing twice is not an error.
    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

impl<S: PacketSink + ?Sized> PacketSink for Box<S> {
    fn send(&mut self, packet: &[u8]) -> Result<()> {
        (**self).send(packet)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// One packet captured by a [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentPacket {
    /// Clock time of the write, when the sink has a clock
    pub at: Option<Duration>,
    /// Packet bytes
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct MemoryLog {
    packets: Vec<SentPacket>,
    flushes: usize,
    closed: bool,
}

/// In-memory sink for tests and dry runs
///
/// Clones share the same log, so a test can keep one handle while another is
/// moved into a dispatcher or writer thread.
#[derive(Clone, Default)]
pub struct MemorySink {
    log: Arc<Mutex<MemoryLog>>,
    clock: Option<Arc<dyn Clock>>,
    latency: Option<(ManualClock, Duration)>,
    fail_after: Option<usize>,
}

impl std::fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let log = self.log.lock();
        f.debug_struct("MemorySink")
            .field("packets", &log.packets.len())
            .field("closed", &log.closed)
            .field("fail_after", &self.fail_after)
            .finish()
    }
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp every packet with `clock`
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Advance `clock` by `per_packet` on every write, modelling wire time
    pub fn with_latency(mut self, clock: ManualClock, per_packet: Duration) -> Self {
        self.latency = Some((clock, per_packet));
        self
    }

    /// Fail every write after `count` packets have been accepted
    pub fn fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Every accepted packet in write order
    pub fn packets(&self) -> Vec<SentPacket> {
        self.log.lock().packets.clone()
    }

    /// All accepted bytes concatenated
    pub fn bytes(&self) -> Vec<u8> {
        self.log
            .lock()
            .packets
            .iter()
            .flat_map(|p| p.bytes.iter().copied())
            .collect()
    }

    /// Number of flush calls
    pub fn flush_count(&self) -> usize {
        self.log.lock().flushes
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.log.lock().closed
    }
}

impl PacketSink for MemorySink {
    fn send(&mut self, packet: &[u8]) -> Result<()> {
        let mut log = self.log.lock();
        if log.closed {
            return Err(LedToneError::Transport("write to closed sink".into()));
        }
        if let Some(limit) = self.fail_after {
            if log.packets.len() >= limit {
                return Err(LedToneError::Transport(format!(
                    "simulated write failure after {} packets",
                    limit
                )));
            }
        }
        if let Some((clock, per_packet)) = &self.latency {
            clock.advance(*per_packet);
        }
        let at = self.clock.as_ref().map(|c| c.now());
        log.packets.push(SentPacket {
            at,
            bytes: packet.to_vec(),
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.log.lock().flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut log = self.log.lock();
        if !log.closed {
            log.flushes += 1;
            log.closed = true;
        }
        Ok(())
    }
}
