//! Transport layer: the physical channel and the I/O loop that drives it

use crate::error::Result;

mod mock;
mod serial;
mod session;

pub use mock::MockTransport;
pub use serial::SerialTransport;
pub use session::{SessionOptions, TransportSession};

/// Byte channel to the robot
///
/// Implementations are moved onto the I/O thread, hence `Send`. A read that
/// times out with nothing received returns `Ok(0)`.
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()>;

    /// Write a whole command, retrying short writes
    fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let n = self.write(data)?;
            if n == 0 {
                return Err(crate::error::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "transport accepted no bytes",
                )));
            }
            data = &data[n..];
        }
        self.flush()
    }

    /// Check if data is available to read
    fn available(&mut self) -> Result<usize> {
        Ok(0)
    }
}
