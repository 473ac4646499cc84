//! Wire transport for the Firefox remote debugging protocol.
//!
//! Packets are framed as `<decimal byte length>:<json>`.

use std::path::PathBuf;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tracing::trace;

use crate::error::RdpError;

/// Where the debugger server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportAddress {
    Tcp { host: String, port: u16 },
    LocalSocket { path: PathBuf },
}

type DynRead = Box<dyn AsyncRead + Send + Unpin>;
type DynWrite = Box<dyn AsyncWrite + Send + Unpin>;

/// A length-prefixed packet header longer than this is garbage.
const MAX_LENGTH_DIGITS: u32 = 10;

/// Reads `length:json` packets from one half of a connection.
pub struct PacketReader {
    inner: BufReader<DynRead>,
}

/// Writes `length:json` packets to the other half.
pub struct PacketWriter {
    inner: DynWrite,
}

/// Open both halves of a framed connection.
pub async fn connect(addr: &TransportAddress) -> Result<(PacketReader, PacketWriter), RdpError> {
    match addr {
        TransportAddress::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port)).await?;
            let (read, write) = stream.into_split();
            Ok((PacketReader::new(read), PacketWriter::new(write)))
        }
        #[cfg(unix)]
        TransportAddress::LocalSocket { path } => {
            let stream = UnixStream::connect(path).await?;
            let (read, write) = stream.into_split();
            Ok((PacketReader::new(read), PacketWriter::new(write)))
        }
        #[cfg(not(unix))]
        TransportAddress::LocalSocket { .. } => Err(RdpError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "local sockets are not supported on this platform",
        ))),
    }
}

impl PacketReader {
    pub fn new(read: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            inner: BufReader::new(Box::new(read)),
        }
    }

    /// Read one packet, failing on framing violations.
    pub async fn read_packet(&mut self) -> Result<Value, RdpError> {
        let mut length: usize = 0;
        let mut digits = 0u32;
        loop {
            let byte = self.inner.read_u8().await?;
            match byte {
                b'0'..=b'9' if digits < MAX_LENGTH_DIGITS => {
                    length = length * 10 + usize::from(byte - b'0');
                    digits += 1;
                }
                b':' if digits > 0 => break,
                _ => {
                    return Err(RdpError::Framing(format!(
                        "unexpected byte {byte:#04x} in packet header"
                    )));
                }
            }
        }

        let mut body = vec![0u8; length];
        self.inner.read_exact(&mut body).await?;
        trace!(bytes = length, "received packet");
        Ok(serde_json::from_slice(&body)?)
    }
}

impl PacketWriter {
    pub fn new(write: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            inner: Box::new(write),
        }
    }

    /// Frame and send one packet.
    pub async fn write_packet(&mut self, packet: &Value) -> Result<(), RdpError> {
        let body = serde_json::to_vec(packet)?;
        let mut frame = format!("{}:", body.len()).into_bytes();
        frame.extend_from_slice(&body);
        self.inner.write_all(&frame).await?;
        self.inner.flush().await?;
        trace!(bytes = body.len(), "sent packet");
        Ok(())
    }
}
