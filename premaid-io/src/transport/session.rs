//! Background I/O loop over a [`Transport`]
//!
//! A dedicated thread owns the transport. Callers talk to it through
//! channels only:
//!
//! ```text
//!  submit() ──[outbound Vec<u8>]──> io thread ──write──> transport
//!  frames   <──[ProtocolFrame]───── io thread <──read─── transport
//!  errors   <──[Error]───────────── io thread
//! ```
//!
//! Each loop iteration writes at most one queued command, performs one read
//! with the transport's timeout, feeds the bytes to a [`FrameReassembler`] and
//! publishes every completed frame. Iterations that move no data sleep for the
//! idle backoff.
//!
//! # Lifecycle
//!
//! `open` spawns the thread, `close` (or drop) stops it. Close is
//! drain-on-close: every command whose `submit` returned `Ok` is written
//! before the thread exits, and `submit` after close fails with
//! [`Error::TransportClosed`]. The transport is dropped exactly once, when
//! the thread ends.

use super::{SerialTransport, Transport};
use crate::config::{AppConfig, ReassemblerConfig, SerialConfig};
use crate::error::{Error, Result};
use crate::protocol::constants::READ_CHUNK_SIZE;
use crate::protocol::{FrameReassembler, ProtocolFrame, TxFrame};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// I/O loop tuning
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Sleep after an iteration that neither wrote nor read
    pub idle_backoff: Duration,
    pub reassembler: ReassemblerConfig,
}

impl SessionOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            idle_backoff: config.serial.idle_backoff(),
            reassembler: config.reassembler,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Open connection to the robot with its I/O thread
pub struct TransportSession {
    outbound: Sender<Vec<u8>>,
    frames: Receiver<ProtocolFrame>,
    errors: Receiver<Error>,
    /// Write-locked by close; submit holds a read lock across the enqueue
    open: RwLock<bool>,
    shutdown: Arc<AtomicBool>,
    io_thread: Mutex<Option<JoinHandle<()>>>,
}

impl TransportSession {
    /// Start the I/O thread on an already opened transport
    pub fn open(transport: Box<dyn Transport>, options: SessionOptions) -> Result<Self> {
        let (outbound_tx, outbound_rx) = unbounded();
        let (frames_tx, frames_rx) = unbounded();
        let (errors_tx, errors_rx) = unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let io_thread = thread::Builder::new()
            .name("premaid-io".to_string())
            .spawn(move || {
                let mut io = IoLoop {
                    transport,
                    reassembler: FrameReassembler::new(options.reassembler),
                    outbound: outbound_rx,
                    frames: frames_tx,
                    errors: errors_tx,
                    idle_backoff: options.idle_backoff,
                    sent: 0,
                    received: 0,
                };
                io.run(&shutdown_clone);
            })?;

        info!("Transport session opened");

        Ok(Self {
            outbound: outbound_tx,
            frames: frames_rx,
            errors: errors_rx,
            open: RwLock::new(true),
            shutdown,
            io_thread: Mutex::new(Some(io_thread)),
        })
    }

    /// Open a serial port and start the I/O thread on it
    pub fn open_serial(serial: &SerialConfig, options: SessionOptions) -> Result<Self> {
        let transport =
            SerialTransport::open(&serial.port, serial.baud_rate, serial.read_timeout())?;
        Self::open(Box::new(transport), options)
    }

    pub fn is_open(&self) -> bool {
        *self.open.read()
    }

    /// Queue a command for transmission, FIFO with earlier submits
    pub fn submit(&self, command: Vec<u8>) -> Result<()> {
        let open = self.open.read();
        if !*open {
            return Err(Error::TransportClosed);
        }
        self.outbound
            .send(command)
            .map_err(|_| Error::TransportClosed)
    }

    pub fn submit_frame(&self, frame: &TxFrame) -> Result<()> {
        self.submit(frame.to_vec())
    }

    /// Next reassembled inbound frame, if one is waiting
    pub fn try_recv_frame(&self) -> Option<ProtocolFrame> {
        self.frames.try_recv().ok()
    }

    /// Wait up to `timeout` for an inbound frame
    pub fn recv_frame_timeout(&self, timeout: Duration) -> Option<ProtocolFrame> {
        match self.frames.recv_timeout(timeout) {
            Ok(frame) => Some(frame),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Every inbound frame received so far
    pub fn drain_frames(&self) -> Vec<ProtocolFrame> {
        self.frames.try_iter().collect()
    }

    /// Wait up to `timeout` for a transport error
    pub fn recv_error_timeout(&self, timeout: Duration) -> Option<Error> {
        self.errors.recv_timeout(timeout).ok()
    }

    /// Every transport error reported so far
    pub fn drain_errors(&self) -> Vec<Error> {
        self.errors.try_iter().collect()
    }

    /// Stop the I/O thread after draining queued commands
    ///
    /// Idempotent. Returns once the thread has exited and the transport has
    /// been released, also for a caller racing another close.
    pub fn close(&self) -> Result<()> {
        *self.open.write() = false;
        self.shutdown.store(true, Ordering::SeqCst);

        // Held across the join so a concurrent close waits for it
        let mut io_thread = self.io_thread.lock();
        if let Some(handle) = io_thread.take() {
            handle.join().map_err(|_| Error::ThreadPanic)?;
            info!("Transport session closed");
        }
        Ok(())
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!("Failed to close transport session: {}", e);
        }
    }
}

/// State owned by the I/O thread
struct IoLoop {
    transport: Box<dyn Transport>,
    reassembler: FrameReassembler,
    outbound: Receiver<Vec<u8>>,
    frames: Sender<ProtocolFrame>,
    errors: Sender<Error>,
    idle_backoff: Duration,
    sent: u64,
    received: u64,
}

impl IoLoop {
    fn run(&mut self, shutdown: &AtomicBool) {
        let mut read_buf = [0u8; READ_CHUNK_SIZE];

        debug!("I/O thread started");
        while !shutdown.load(Ordering::SeqCst) {
            let mut busy = false;

            match self.outbound.try_recv() {
                Ok(command) => {
                    self.send(&command);
                    busy = true;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => break,
            }

            match self.transport.read(&mut read_buf) {
                Ok(0) => {}
                Ok(n) => {
                    busy = true;
                    for frame in self.reassembler.push(&read_buf[..n]) {
                        self.received += 1;
                        // Receiver lives as long as the session that joins us
                        let _ = self.frames.send(frame);
                    }
                }
                Err(e) => {
                    error!("Transport read failed: {}", e);
                    let _ = self.errors.send(e);
                }
            }

            if !busy {
                thread::sleep(self.idle_backoff);
            }
        }

        self.drain();
        debug!(
            "I/O thread exiting: {} commands sent, {} frames received",
            self.sent, self.received
        );
    }

    /// Write everything still queued; nothing submitted is dropped silently
    fn drain(&mut self) {
        let pending: Vec<Vec<u8>> = self.outbound.try_iter().collect();
        if pending.is_empty() {
            return;
        }
        debug!("Draining {} queued commands before close", pending.len());

        let mut failed = 0usize;
        for command in &pending {
            if !self.send(command) {
                failed += 1;
            }
        }
        if failed > 0 {
            warn!("{} of {} queued commands failed during close", failed, pending.len());
        }
    }

    fn send(&mut self, command: &[u8]) -> bool {
        match self.transport.write_all(command) {
            Ok(()) => {
                self.sent += 1;
                true
            }
            Err(e) => {
                error!("Transport write failed: {}", e);
                let _ = self.errors.send(e);
                false
            }
        }
    }
}
