//! Reassembly of scan records from radio notification chunks.
//!
//! The scanner sends each code as text terminated by a carriage return
//! ([`RECORD_SENTINEL`]), split across notifications however the radio sees
//! fit. Chunks are appended to a fixed-size buffer until a chunk ends with
//! the sentinel.
//!
//! # Overflow
//!
//! A chunk that does not fit is cut to the free space and its last byte is
//! replaced by the sentinel, so the buffer always terminates. The resulting
//! record is exactly `capacity - 1` bytes and is still delivered, flagged as
//! truncated.
//!
//! # Mailbox
//!
//! At most one finished record waits for the consumer. A record finished
//! while another is still waiting replaces it.
//!
//! ```text
//!  chunk "40063"  ──►  [4 0 0 6 3 . . . ]            pending
//!  chunk "81\r"   ──►  [4 0 0 6 3 8 1 \r]  ──►  ready "4006381"
//! ```

use bytes::Bytes;
use ptl_core::Error;
use ptl_core::constants::{RECORD_SENTINEL, SCAN_BUFFER_CAPACITY};
use std::borrow::Cow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

/// A complete record with the sentinel stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    bytes: Bytes,
    truncated: bool,
}

impl ScanRecord {
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Record text; invalid UTF-8 is replaced rather than rejected.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Whether the record was cut short by a buffer overflow.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

/// What a chunk did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Bytes buffered, no record finished yet.
    Pending,

    /// A record finished normally.
    Finished,

    /// The buffer overflowed and a truncated record was finished.
    Truncated,
}

/// Fixed-size byte buffer with a write position.
#[derive(Debug)]
struct ScanBuffer {
    bytes: Box<[u8]>,
    write_pos: usize,
}

impl ScanBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity].into_boxed_slice(),
            write_pos: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Append a chunk; returns `true` if it had to be cut.
    fn append(&mut self, chunk: &[u8]) -> bool {
        let free = self.capacity() - self.write_pos;
        let overflow = chunk.len() > free;
        let take = chunk.len().min(free);

        self.bytes[self.write_pos..self.write_pos + take].copy_from_slice(&chunk[..take]);
        self.write_pos += take;

        if overflow && self.write_pos > 0 {
            self.bytes[self.write_pos - 1] = RECORD_SENTINEL;
        }
        overflow
    }

    fn ends_with_sentinel(&self) -> bool {
        self.write_pos > 0 && self.bytes[self.write_pos - 1] == RECORD_SENTINEL
    }

    /// Take the buffered record without its sentinel and rewind.
    fn finish(&mut self) -> Bytes {
        let record = Bytes::copy_from_slice(&self.bytes[..self.write_pos - 1]);
        self.write_pos = 0;
        record
    }
}

#[derive(Debug)]
struct Mailbox {
    buffer: ScanBuffer,
    ready: Option<ScanRecord>,
}

#[derive(Debug)]
struct Shared {
    mailbox: Mutex<Mailbox>,
    ready: Notify,
}

/// Single-slot mailbox turning notification chunks into records.
///
/// Cloning yields another handle to the same mailbox: the session's chunk
/// pump feeds one clone while the record consumer drains another.
///
/// # Examples
///
/// ```
/// use ptl_link::NotificationReassembler;
///
/// let reassembler = NotificationReassembler::new();
/// reassembler.on_chunk(b"5901");
/// reassembler.on_chunk(b"234\r");
///
/// let record = reassembler.take_ready().unwrap();
/// assert_eq!(record.text(), "5901234");
/// assert!(reassembler.take_ready().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct NotificationReassembler {
    shared: Arc<Shared>,
}

impl NotificationReassembler {
    pub fn new() -> Self {
        Self::with_capacity(SCAN_BUFFER_CAPACITY)
    }

    /// Buffer of `capacity` bytes, sentinel included. Values below 2 are
    /// raised to 2 so a record can hold at least one byte.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                mailbox: Mutex::new(Mailbox {
                    buffer: ScanBuffer::new(capacity.max(2)),
                    ready: None,
                }),
                ready: Notify::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Mailbox> {
        self.shared
            .mailbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.lock().buffer.capacity()
    }

    /// Feed one notification chunk.
    pub fn on_chunk(&self, chunk: &[u8]) -> ChunkOutcome {
        let mut mailbox = self.lock();
        let overflow = mailbox.buffer.append(chunk);
        trace!(len = chunk.len(), pos = mailbox.buffer.write_pos, "Chunk buffered");

        if !mailbox.buffer.ends_with_sentinel() {
            return ChunkOutcome::Pending;
        }

        let record = ScanRecord {
            bytes: mailbox.buffer.finish(),
            truncated: overflow,
        };
        if overflow {
            let capacity = mailbox.buffer.capacity();
            warn!("{}", Error::BufferOverflow { capacity });
        }
        if let Some(lost) = mailbox.ready.replace(record) {
            debug!(record = %lost.text(), "Unconsumed record replaced");
        }
        drop(mailbox);

        self.shared.ready.notify_one();
        if overflow {
            ChunkOutcome::Truncated
        } else {
            ChunkOutcome::Finished
        }
    }

    /// Take the waiting record, if any.
    pub fn take_ready(&self) -> Option<ScanRecord> {
        self.lock().ready.take()
    }

    /// Wait for the next record.
    pub async fn recv(&self) -> ScanRecord {
        loop {
            if let Some(record) = self.take_ready() {
                return record;
            }
            self.shared.ready.notified().await;
        }
    }
}

impl Default for NotificationReassembler {
    fn default() -> Self {
        Self::new()
    }
}
