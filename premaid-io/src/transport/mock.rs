//! In-memory transport for tests and dry runs

use super::Transport;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

/// Shared in-memory channel
///
/// Clones share state, so a test keeps one handle while the I/O thread owns
/// another. Every `write` call is recorded as its own command.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    writes: Vec<Vec<u8>>,
    read_errors: VecDeque<io::ErrorKind>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the next reads
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.lock().read_buffer.extend(data);
    }

    /// Make the next read fail with `kind`; `TimedOut` reads as zero bytes
    pub fn inject_read_error(&self, kind: io::ErrorKind) {
        self.inner.lock().read_errors.push_back(kind);
    }

    /// Every write call so far, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.inner.lock().writes.clone()
    }

    /// All written bytes concatenated
    pub fn get_written(&self) -> Vec<u8> {
        self.inner.lock().writes.concat()
    }

    /// Live handles on this channel, this one included
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        match inner.read_errors.pop_front() {
            // Same contract as the serial port: a timeout is an empty read
            Some(io::ErrorKind::TimedOut) => return Ok(0),
            Some(kind) => {
                return Err(Error::TransportRead(io::Error::new(kind, "injected read error")))
            }
            None => {}
        }

        let n = inner.read_buffer.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(inner.read_buffer.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.inner.lock().writes.push(data.to_vec());
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.inner.lock().read_buffer.len())
    }
}
