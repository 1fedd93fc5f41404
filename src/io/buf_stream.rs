use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// A byte stream the connection can run over.
///
/// Blanket-implemented for any async stream; in practice this is a
/// `TcpStream`, a TLS wrapper supplied by the caller, or an in-process
/// duplex pipe in tests.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Transport for S {}

/// Buffers reads and writes over a boxed transport.
///
/// Writes accumulate in `wbuf` until [`flush`]; reads pull whole frames
/// out of `rbuf`, refilling from the transport only when the requested
/// count is not yet buffered.
pub(crate) struct BufStream {
    stream: Box<dyn Transport>,

    wbuf: Vec<u8>,
    rbuf: BytesMut,
}

impl BufStream {
    pub(crate) fn new(stream: Box<dyn Transport>) -> Self {
        Self {
            stream,
            wbuf: Vec::with_capacity(1024),
            rbuf: BytesMut::with_capacity(8 * 1024),
        }
    }

    pub(crate) fn write_buffer(&self) -> &[u8] {
        &self.wbuf
    }

    pub(crate) fn write_buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.wbuf
    }

    pub(crate) async fn flush(&mut self) -> Result<()> {
        if !self.wbuf.is_empty() {
            self.stream.write_all(&self.wbuf).await?;
            self.wbuf.clear();
        }

        self.stream.flush().await?;

        Ok(())
    }

    /// Reads exactly `cnt` bytes, waiting on the transport as needed.
    pub(crate) async fn read(&mut self, cnt: usize) -> Result<Bytes> {
        while self.rbuf.len() < cnt {
            self.rbuf.reserve(cnt - self.rbuf.len());

            let n = self.stream.read_buf(&mut self.rbuf).await?;

            if n == 0 {
                // a zero-length read with buffer space means the server
                // hung up on us
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "server closed the connection",
                )));
            }
        }

        Ok(self.rbuf.split_to(cnt).freeze())
    }

    pub(crate) async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;

        Ok(())
    }
}
