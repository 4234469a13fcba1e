//! Write-all / read-exact over a byte stream.
//!
//! Streams may legally accept or return fewer bytes than asked for. The
//! [`FramedStream`] loops until the whole frame moved or the stream failed:
//!
//! - a write accepting 0 bytes is [`ErrorKind::WriteZero`]
//! - a read returning 0 bytes before the frame is complete is
//!   [`ClientError::ShortRead`]
//! - [`ErrorKind::Interrupted`] is retried, everything else propagates
//!
//! # Example
//!
//! ```ignore
//! use bet_client::transport::connect;
//!
//! let mut stream = connect("server:12345").await?;
//! stream.write_all(&frame).await?;
//! let reply = stream.read_frame().await?;
//! ```

use std::io::ErrorKind;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{ClientError, Result};
use crate::protocol::{decode_reply_header, REPLY_HEADER_SIZE};

/// A connected stream with whole-frame read and write.
#[derive(Debug)]
pub struct FramedStream<S> {
    stream: S,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Write every byte of `buf`, then flush.
    ///
    /// An empty buffer is a no-op.
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }

        let mut written = 0;
        while written < buf.len() {
            match self.stream.write(&buf[written..]).await {
                Ok(0) => {
                    return Err(ClientError::Io(std::io::Error::new(
                        ErrorKind::WriteZero,
                        format!("write returned 0 after {written} of {} bytes", buf.len()),
                    )))
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ClientError::Io(e)),
            }
        }

        self.stream.flush().await?;
        Ok(())
    }

    /// Read exactly `len` bytes.
    pub async fn read_exact(&mut self, len: usize) -> Result<Bytes> {
        let mut buf = vec![0u8; len];
        let mut received = 0;
        while received < len {
            match self.stream.read(&mut buf[received..]).await {
                Ok(0) => {
                    return Err(ClientError::ShortRead {
                        expected: len,
                        received,
                    })
                }
                Ok(n) => received += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ClientError::Io(e)),
            }
        }
        Ok(Bytes::from(buf))
    }

    /// Read one `[u16 length][body]` frame and return the body.
    pub async fn read_frame(&mut self) -> Result<Bytes> {
        let header = self.read_exact(REPLY_HEADER_SIZE).await?;
        let len = decode_reply_header([header[0], header[1]]);
        self.read_exact(len).await
    }

    /// Close the write side of the connection.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Get a reference to the underlying stream.
    pub fn inner(&self) -> &S {
        &self.stream
    }

    /// Get a mutable reference to the underlying stream.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// Dial the collector over TCP.
pub async fn connect(address: &str) -> Result<FramedStream<TcpStream>> {
    let stream = TcpStream::connect(address)
        .await
        .map_err(|source| ClientError::Connect {
            address: address.to_string(),
            source,
        })?;
    Ok(FramedStream::new(stream))
}
