//! Dedicated writer thread per serial link
//!
//! Producers enqueue whole packets into a bounded queue; one thread per link
//! drains it into the sink. The thread is the only code that touches the
//! sink until it exits, and it always closes the sink on the way out.

use super::PacketSink;
use crate::{LedToneError, Result};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// What to do with packets still queued at shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Write everything already queued
    Flush,
    /// Drop everything already queued
    Discard,
}

/// Counters for one writer thread
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Packets written to the sink
    pub packets_written: usize,
    /// Bytes written to the sink
    pub bytes_written: usize,
    /// Packets dropped by a discard shutdown or after a write failure
    pub packets_discarded: usize,
}

enum LinkMessage {
    Packet(Vec<u8>),
    Shutdown(Option<Vec<u8>>),
}

#[derive(Default)]
struct Shared {
    stats: Mutex<WriterStats>,
    error: Mutex<Option<String>>,
    discard: AtomicBool,
}

impl Shared {
    fn record_error(&self, err: &LedToneError) {
        let mut slot = self.error.lock();
        if slot.is_none() {
            *slot = Some(err.to_string());
        }
    }

    fn failed(&self) -> bool {
        self.error.lock().is_some()
    }
}

/// Handle to a running writer thread
pub struct LinkWriter {
    name: String,
    tx: Option<Sender<LinkMessage>>,
    handle: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl LinkWriter {
    /// Start a writer thread that owns `sink`
    ///
    /// `queue_depth` bounds the number of packets in flight; `send` blocks
    /// while the queue is full.
    pub fn spawn<S: PacketSink + 'static>(
        name: impl Into<String>,
        sink: S,
        queue_depth: usize,
    ) -> Result<Self> {
        if queue_depth == 0 {
            return Err(LedToneError::ConfigError(
                "link queue depth must be at least 1".into(),
            ));
        }
        let name = name.into();
        let (tx, rx) = crossbeam_channel::bounded(queue_depth);
        let shared = Arc::new(Shared::default());

        let thread_shared = Arc::clone(&shared);
        let thread_name = name.clone();
        let handle = std::thread::Builder::new()
            .name(format!("link-{}", name))
            .spawn(move || drain(sink, rx, thread_shared, thread_name))?;

        tracing::debug!(link = %name, queue_depth, "link writer started");
        Ok(LinkWriter {
            name,
            tx: Some(tx),
            handle: Some(handle),
            shared,
        })
    }

    /// Link name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the thread's counters
    pub fn stats(&self) -> WriterStats {
        self.shared.stats.lock().clone()
    }

    /// Enqueue one packet
    ///
    /// Fails once the thread has hit a transport error or exited.
    pub fn enqueue(&self, packet: Vec<u8>) -> Result<()> {
        if let Some(msg) = self.shared.error.lock().clone() {
            return Err(LedToneError::Transport(format!("{}: {}", self.name, msg)));
        }
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| LedToneError::Transport(format!("{} is shut down", self.name)))?;
        tx.send(LinkMessage::Packet(packet))
            .map_err(|_| LedToneError::Transport(format!("{} writer thread exited", self.name)))
    }

    /// Stop the thread and wait for it
    ///
    /// `final_packet` is written after the queue is handled, even on discard,
    /// then the sink is closed. Returns the first transport error if any write
    /// failed.
    pub fn finish(mut self, mode: ShutdownMode, final_packet: Option<Vec<u8>>) -> Result<WriterStats> {
        self.shutdown(mode, final_packet)
    }

    fn shutdown(&mut self, mode: ShutdownMode, final_packet: Option<Vec<u8>>) -> Result<WriterStats> {
        let Some(tx) = self.tx.take() else {
            return Ok(self.stats());
        };
        if mode == ShutdownMode::Discard {
            self.shared.discard.store(true, Ordering::Release);
        }
        // A dead thread already closed its sink
        let _ = tx.send(LinkMessage::Shutdown(final_packet));
        drop(tx);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Err(LedToneError::Transport(format!(
                    "{} writer thread panicked",
                    self.name
                )));
            }
        }

        let stats = self.stats();
        tracing::debug!(
            link = %self.name,
            written = stats.packets_written,
            discarded = stats.packets_discarded,
            "link writer finished"
        );
        match self.shared.error.lock().clone() {
            Some(msg) => Err(LedToneError::Transport(format!("{}: {}", self.name, msg))),
            None => Ok(stats),
        }
    }
}

impl PacketSink for LinkWriter {
    fn send(&mut self, packet: &[u8]) -> Result<()> {
        self.enqueue(packet.to_vec())
    }

    fn close(&mut self) -> Result<()> {
        self.shutdown(ShutdownMode::Flush, None).map(|_| ())
    }
}

impl Drop for LinkWriter {
    fn drop(&mut self) {
        let _ = self.shutdown(ShutdownMode::Discard, None);
    }
}

fn drain<S: PacketSink>(mut sink: S, rx: Receiver<LinkMessage>, shared: Arc<Shared>, name: String) {
    let mut final_packet = None;

    for message in rx.iter() {
        match message {
            LinkMessage::Packet(bytes) => {
                if shared.discard.load(Ordering::Acquire) || shared.failed() {
                    shared.stats.lock().packets_discarded += 1;
                    continue;
                }
                match sink.send(&bytes) {
                    Ok(()) => {
                        let mut stats = shared.stats.lock();
                        stats.packets_written += 1;
                        stats.bytes_written += bytes.len();
                    }
                    Err(e) => {
                        tracing::error!(link = %name, error = %e, "link write failed");
                        shared.record_error(&e);
                        shared.stats.lock().packets_discarded += 1;
                    }
                }
            }
            LinkMessage::Shutdown(packet) => {
                final_packet = packet;
                break;
            }
        }
    }

    if let Some(bytes) = final_packet {
        match sink.send(&bytes) {
            Ok(()) => {
                let mut stats = shared.stats.lock();
                stats.packets_written += 1;
                stats.bytes_written += bytes.len();
            }
            Err(e) => shared.record_error(&e),
        }
    }
    if let Err(e) = sink.close() {
        shared.record_error(&e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemorySink;

    #[test]
    fn test_flush_writes_everything_then_final_packet() {
        let handle = MemorySink::new();
        let writer = LinkWriter::spawn("test", handle.clone(), 4).unwrap();
        for i in 0..10u8 {
            writer.enqueue(vec![i]).unwrap();
        }
        let stats = writer
            .finish(ShutdownMode::Flush, Some(vec![0x8F, 0]))
            .unwrap();
        assert_eq!(stats.packets_written, 11);
        assert_eq!(stats.packets_discarded, 0);
        let bytes = handle.bytes();
        assert_eq!(&bytes[..10], &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(&bytes[10..], &[0x8F, 0]);
        assert!(handle.is_closed());
    }

    #[test]
    fn test_discard_still_sends_final_packet() {
        let handle = MemorySink::new();
        let writer = LinkWriter::spawn("test", handle.clone(), 64).unwrap();
        let stats = writer
            .finish(ShutdownMode::Discard, Some(vec![0x8F, 0]))
            .unwrap();
        assert_eq!(handle.packets().last().unwrap().bytes, vec![0x8F, 0]);
        assert_eq!(stats.packets_written + stats.packets_discarded, 1);
        assert!(handle.is_closed());
    }

    #[test]
    fn test_transport_error_surfaces_on_finish() {
        let handle = MemorySink::new().fail_after(2);
        let writer = LinkWriter::spawn("flaky", handle.clone(), 8).unwrap();
        for i in 0..5u8 {
            // Later enqueues may already see the failure
            let _ = writer.enqueue(vec![i]);
        }
        let result = writer.finish(ShutdownMode::Flush, None);
        assert!(matches!(result, Err(LedToneError::Transport(_))));
        assert_eq!(handle.packets().len(), 2);
        assert!(handle.is_closed());
    }

    #[test]
    fn test_zero_queue_depth_rejected() {
        assert!(LinkWriter::spawn("x", MemorySink::new(), 0).is_err());
    }

    #[test]
    fn test_drop_closes_sink() {
        let handle = MemorySink::new();
        {
            let writer = LinkWriter::spawn("dropped", handle.clone(), 2).unwrap();
            writer.enqueue(vec![1, 2]).unwrap();
        }
        assert!(handle.is_closed());
    }
}
