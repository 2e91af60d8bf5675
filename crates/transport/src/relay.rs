//! Runtime-selected transport
//!
//! The relay binary picks serial or socket from configuration; both halves
//! dispatch statically to the selected variant.

use bytes::Bytes;
use contracts::{TransportConfig, TransportSelection};
use tracing::instrument;

use crate::error::Result;
use crate::link::{ChunkPolicy, Transport, TransportReader, TransportWriter};
use crate::serial::{SerialReader, SerialTransport, SerialWriter};
use crate::socket::{SocketReader, SocketTransport, SocketWriter};

/// Serial or socket link chosen at startup
pub enum RelayTransport {
    Serial(SerialTransport),
    Socket(SocketTransport),
}

impl RelayTransport {
    /// Establish the configured link
    ///
    /// Blocks until the device opens or a peer connects.
    #[instrument(name = "relay_transport_connect", skip(config), fields(use_serial = config.use_serial))]
    pub async fn connect(config: &TransportConfig) -> Result<Self> {
        match config.selection()? {
            TransportSelection::Serial(serial) => {
                Ok(Self::Serial(SerialTransport::open(serial).await?))
            }
            TransportSelection::Socket(socket) => {
                Ok(Self::Socket(SocketTransport::accept(socket).await?))
            }
        }
    }
}

impl Transport for RelayTransport {
    type Reader = RelayReader;
    type Writer = RelayWriter;

    fn kind(&self) -> &'static str {
        match self {
            Self::Serial(t) => t.kind(),
            Self::Socket(t) => t.kind(),
        }
    }

    fn read_size(&self) -> usize {
        match self {
            Self::Serial(t) => t.read_size(),
            Self::Socket(t) => t.read_size(),
        }
    }

    fn chunk_policy(&self) -> ChunkPolicy {
        match self {
            Self::Serial(t) => t.chunk_policy(),
            Self::Socket(t) => t.chunk_policy(),
        }
    }

    fn split(self) -> (RelayReader, RelayWriter) {
        match self {
            Self::Serial(t) => {
                let (r, w) = t.split();
                (RelayReader::Serial(r), RelayWriter::Serial(w))
            }
            Self::Socket(t) => {
                let (r, w) = t.split();
                (RelayReader::Socket(r), RelayWriter::Socket(w))
            }
        }
    }
}

pub enum RelayReader {
    Serial(SerialReader),
    Socket(SocketReader),
}

impl TransportReader for RelayReader {
    async fn read(&mut self, max_bytes: usize) -> Result<Bytes> {
        match self {
            Self::Serial(r) => r.read(max_bytes).await,
            Self::Socket(r) => r.read(max_bytes).await,
        }
    }
}

pub enum RelayWriter {
    Serial(SerialWriter),
    Socket(SocketWriter),
}

impl TransportWriter for RelayWriter {
    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Serial(w) => w.write_all(data).await,
            Self::Socket(w) => w.write_all(data).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Serial(w) => w.close().await,
            Self::Socket(w) => w.close().await,
        }
    }
}
