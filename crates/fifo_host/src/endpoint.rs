//! File-like endpoint over a channel handle.
//!
//! Attach on open, detach on drop, send/receive on write/read. A broken
//! channel surfaces as a broken-pipe error and end-of-stream as a
//! zero-length successful read, so the endpoint composes with `io::copy`
//! and anything else speaking `Read`/`Write`.

use std::io::{self, Read, Write};
use std::sync::Arc;

use fifo_core::{CancelToken, Channel, ChannelError, Handle, Role};

/// One side of the channel dressed up as a byte stream.
///
/// The read path returns as soon as one byte is available and then takes
/// whatever else is buffered; it assumes this endpoint is the only
/// consumer of its channel.
pub struct Endpoint {
    handle: Handle,
    cancel: CancelToken,
}

impl Endpoint {
    /// Blocks until a peer of the complementary role is attached.
    pub fn open(
        channel: &Arc<Channel>,
        role: Role,
        cancel: CancelToken,
    ) -> Result<Self, ChannelError> {
        let handle = channel.attach(role, &cancel)?;
        Ok(Self { handle, cancel })
    }
}

fn to_io(err: ChannelError) -> io::Error {
    let kind = match err {
        ChannelError::Broken => io::ErrorKind::BrokenPipe,
        ChannelError::Interrupted => io::ErrorKind::Interrupted,
        ChannelError::TooLarge { .. } => io::ErrorKind::InvalidInput,
    };
    io::Error::new(kind, err)
}

impl Write for Endpoint {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let chunk = buf.len().min(self.handle.channel().capacity());
        self.handle.send(&buf[..chunk], &self.cancel).map_err(to_io)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for Endpoint {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let first = self.handle.receive(1, &self.cancel).map_err(to_io)?;
        if first.is_empty() {
            return Ok(0);
        }
        buf[0] = first[0];
        let mut filled = 1;
        let buffered = self.handle.channel().occupancy().min(buf.len() - filled);
        if buffered > 0 {
            let more = self.handle.receive(buffered, &self.cancel).map_err(to_io)?;
            buf[filled..filled + more.len()].copy_from_slice(&more);
            filled += more.len();
        }
        Ok(filled)
    }
}
