//! TCP socket transport
//!
//! A server socket bound to the configured address accepts exactly one peer;
//! the listener is dropped once that peer is connected.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use contracts::SocketConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, instrument};

use crate::error::{Result, TransportError};
use crate::link::{ChunkPolicy, Transport, TransportReader, TransportWriter};

/// Bound server socket waiting for its single peer
pub struct SocketAcceptor {
    listener: TcpListener,
    endpoint: String,
    config: SocketConfig,
}

impl SocketAcceptor {
    /// Bind the server socket
    #[instrument(name = "socket_transport_bind", skip(config), fields(endpoint = %config.endpoint()))]
    pub async fn bind(config: &SocketConfig) -> Result<Self> {
        let endpoint = config.endpoint();
        let listener = TcpListener::bind(&endpoint)
            .await
            .map_err(|e| TransportError::AcceptFailed {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;
        info!(endpoint = %endpoint, "waiting for peer");
        Ok(Self {
            listener,
            endpoint,
            config: config.clone(),
        })
    }

    /// Actual bound address (useful when binding port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| TransportError::io("local_addr", self.endpoint.clone(), e))
    }

    /// Block until a peer connects, then stop listening
    pub async fn accept(self) -> Result<SocketTransport> {
        let (stream, peer) =
            self.listener
                .accept()
                .await
                .map_err(|e| TransportError::AcceptFailed {
                    endpoint: self.endpoint.clone(),
                    message: e.to_string(),
                })?;
        // Disable Nagle so small frames leave immediately
        stream
            .set_nodelay(true)
            .map_err(|e| TransportError::io("set_nodelay", peer.to_string(), e))?;
        info!(peer = %peer, "peer connected");
        Ok(SocketTransport::from_stream(stream, peer, &self.config))
    }
}

/// A single accepted TCP connection
pub struct SocketTransport {
    stream: TcpStream,
    peer: SocketAddr,
    recv_buffer: usize,
    read_timeout: Duration,
}

impl SocketTransport {
    /// Bind and accept the single peer
    pub async fn accept(config: &SocketConfig) -> Result<Self> {
        SocketAcceptor::bind(config).await?.accept().await
    }

    fn from_stream(stream: TcpStream, peer: SocketAddr, config: &SocketConfig) -> Self {
        Self {
            stream,
            peer,
            recv_buffer: config.recv_buffer,
            read_timeout: config.read_timeout(),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for SocketTransport {
    type Reader = SocketReader;
    type Writer = SocketWriter;

    fn kind(&self) -> &'static str {
        "socket"
    }

    fn read_size(&self) -> usize {
        self.recv_buffer
    }

    fn chunk_policy(&self) -> ChunkPolicy {
        ChunkPolicy::WHOLE
    }

    fn split(self) -> (SocketReader, SocketWriter) {
        let (read, write) = self.stream.into_split();
        let peer = self.peer.to_string();
        (
            SocketReader {
                half: read,
                peer: peer.clone(),
                read_timeout: self.read_timeout,
                buf: BytesMut::new(),
            },
            SocketWriter { half: write, peer },
        )
    }
}

/// Inbound half of the peer connection
pub struct SocketReader {
    half: OwnedReadHalf,
    peer: String,
    read_timeout: Duration,
    buf: BytesMut,
}

impl TransportReader for SocketReader {
    async fn read(&mut self, max_bytes: usize) -> Result<Bytes> {
        self.buf.clear();
        self.buf.reserve(max_bytes);
        let mut limited = (&mut self.half).take(max_bytes as u64);
        let result =
            tokio::time::timeout(self.read_timeout, limited.read_buf(&mut self.buf)).await;
        match result {
            // Timeout: no data this round
            Err(_) => Ok(Bytes::new()),
            Ok(Ok(0)) => Err(TransportError::closed(self.peer.clone())),
            Ok(Ok(_)) => Ok(self.buf.split().freeze()),
            Ok(Err(e)) => Err(TransportError::io("read", self.peer.clone(), e)),
        }
    }
}

/// Outbound half of the peer connection
pub struct SocketWriter {
    half: OwnedWriteHalf,
    peer: String,
}

impl TransportWriter for SocketWriter {
    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.half
            .write_all(data)
            .await
            .map_err(|e| TransportError::io("write", self.peer.clone(), e))
    }

    async fn close(&mut self) -> Result<()> {
        debug!(peer = %self.peer, "closing socket");
        self.half
            .shutdown()
            .await
            .map_err(|e| TransportError::io("close", self.peer.clone(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> SocketConfig {
        SocketConfig {
            bind_addr: "127.0.0.1".into(),
            port: 0,
            recv_buffer: 8192,
            read_timeout_ms: 20,
        }
    }

    async fn connected_pair() -> (SocketTransport, TcpStream) {
        let acceptor = SocketAcceptor::bind(&loopback_config()).await.unwrap();
        let addr = acceptor.local_addr().unwrap();
        let (transport, client) =
            tokio::join!(acceptor.accept(), TcpStream::connect(addr));
        (transport.unwrap(), client.unwrap())
    }

    #[tokio::test]
    async fn read_and_write_through_peer() {
        let (transport, mut client) = connected_pair().await;
        assert_eq!(transport.kind(), "socket");
        assert!(transport.chunk_policy().is_whole());
        let (mut reader, mut writer) = transport.split();

        client.write_all(b"^hello$").await.unwrap();
        let mut received = Vec::new();
        while received.len() < 7 {
            received.extend_from_slice(&reader.read(8192).await.unwrap());
        }
        assert_eq!(received, b"^hello$");

        writer.write_all(b"^pong$").await.unwrap();
        let mut buf = [0u8; 6];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"^pong$");
    }

    #[tokio::test]
    async fn idle_read_returns_empty() {
        let (transport, _client) = connected_pair().await;
        let (mut reader, _writer) = transport.split();
        let data = reader.read(8192).await.unwrap();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn read_respects_max_bytes() {
        let (transport, mut client) = connected_pair().await;
        let (mut reader, _writer) = transport.split();
        client.write_all(&[b'a'; 32]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let data = reader.read(10).await.unwrap();
        assert!(!data.is_empty() && data.len() <= 10, "got {} bytes", data.len());
    }

    #[tokio::test]
    async fn peer_close_is_fatal() {
        let (transport, client) = connected_pair().await;
        let (mut reader, _writer) = transport.split();
        drop(client);
        let err = loop {
            match reader.read(8192).await {
                Ok(_) => continue,
                Err(e) => break e,
            }
        };
        assert!(matches!(err, TransportError::Closed { .. }), "got: {err}");
    }
}
