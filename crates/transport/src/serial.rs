//! Serial radio transport
//!
//! `serialport` I/O is blocking, so every read and write runs on tokio's
//! blocking pool. The reader and writer halves own separate handles to the
//! same device (`try_clone`).

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use contracts::SerialConfig;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info, instrument};

use crate::error::{Result, TransportError};
use crate::link::{ChunkPolicy, Transport, TransportReader, TransportWriter};

/// Bytes requested per serial read
const SERIAL_READ_SIZE: usize = 1024;

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

/// An opened serial device
pub struct SerialTransport {
    device: String,
    reader: Box<dyn SerialPort>,
    writer: Box<dyn SerialPort>,
    chunk_policy: ChunkPolicy,
}

impl SerialTransport {
    /// Open the device and flush its input/output buffers
    ///
    /// # Errors
    /// `TransportError::OpenFailed` if the device cannot be opened, cleared
    /// or cloned
    #[instrument(
        name = "serial_transport_open",
        skip(config),
        fields(device = %config.device, baud = config.baud_rate)
    )]
    pub async fn open(config: &SerialConfig) -> Result<Self> {
        let config = config.clone();
        tokio::task::spawn_blocking(move || Self::open_blocking(&config))
            .await
            .map_err(|e| TransportError::Task {
                op: "open",
                message: e.to_string(),
            })?
    }

    fn open_blocking(config: &SerialConfig) -> Result<Self> {
        let open_failed = |e: serialport::Error| TransportError::OpenFailed {
            device: config.device.clone(),
            message: e.to_string(),
        };

        let port = serialport::new(config.device.as_str(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout())
            .open()
            .map_err(open_failed)?;

        port.clear(ClearBuffer::All).map_err(open_failed)?;
        let writer = port.try_clone().map_err(open_failed)?;

        info!(
            device = %config.device,
            baud = config.baud_rate,
            chunk_size = config.chunk_size,
            "serial device opened"
        );

        Ok(Self {
            device: config.device.clone(),
            reader: port,
            writer,
            chunk_policy: ChunkPolicy::new(config.chunk_size, config.chunk_delay()),
        })
    }
}

impl Transport for SerialTransport {
    type Reader = SerialReader;
    type Writer = SerialWriter;

    fn kind(&self) -> &'static str {
        "serial"
    }

    fn read_size(&self) -> usize {
        SERIAL_READ_SIZE
    }

    fn chunk_policy(&self) -> ChunkPolicy {
        self.chunk_policy
    }

    fn split(self) -> (SerialReader, SerialWriter) {
        (
            SerialReader {
                device: self.device.clone(),
                port: Arc::new(Mutex::new(self.reader)),
            },
            SerialWriter {
                device: self.device,
                port: Arc::new(Mutex::new(self.writer)),
            },
        )
    }
}

/// Inbound half of a serial device
pub struct SerialReader {
    device: String,
    port: SharedPort,
}

impl TransportReader for SerialReader {
    async fn read(&mut self, max_bytes: usize) -> Result<Bytes> {
        let port = Arc::clone(&self.port);
        let device = self.device.clone();
        run_blocking("read", move || {
            let mut buf = vec![0u8; max_bytes];
            let mut port = lock_port(&port, "read")?;
            match port.read(&mut buf) {
                Ok(n) => {
                    buf.truncate(n);
                    Ok(Bytes::from(buf))
                }
                // Driver timeout with no data
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(Bytes::new()),
                Err(e) => Err(TransportError::io("read", device, e)),
            }
        })
        .await
    }
}

/// Outbound half of a serial device
pub struct SerialWriter {
    device: String,
    port: SharedPort,
}

impl TransportWriter for SerialWriter {
    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let port = Arc::clone(&self.port);
        let device = self.device.clone();
        let data = data.to_vec();
        run_blocking("write", move || {
            let mut port = lock_port(&port, "write")?;
            port.write_all(&data)
                .and_then(|()| port.flush())
                .map_err(|e| TransportError::io("write", device, e))
        })
        .await
    }

    async fn close(&mut self) -> Result<()> {
        debug!(device = %self.device, "closing serial device");
        let port = Arc::clone(&self.port);
        let device = self.device.clone();
        run_blocking("close", move || {
            let mut port = lock_port(&port, "close")?;
            port.flush()
                .map_err(|e| TransportError::io("close", device, e))
        })
        .await
    }
}

fn lock_port<'a>(
    port: &'a SharedPort,
    op: &'static str,
) -> Result<std::sync::MutexGuard<'a, Box<dyn SerialPort>>> {
    port.lock().map_err(|_| TransportError::Task {
        op,
        message: "serial port lock poisoned".into(),
    })
}

async fn run_blocking<T, F>(op: &'static str, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TransportError::Task {
            op,
            message: e.to_string(),
        })?
}
