//! FileSink - append-only JSON lines on disk
//!
//! `Save` events go to `black_box.jsonl`, `Put` events to
//! `sensor_data.jsonl`. Broadcast events are not persisted. Each line is
//! flushed as soon as it is written so a crash loses nothing already saved.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{ContractError, DataSink, RelayEvent};
use serde::Serialize;
use tracing::{debug, error, instrument};

pub const BLACK_BOX_FILE: &str = "black_box.jsonl";
pub const SENSOR_FILE: &str = "sensor_data.jsonl";

#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    pub base_path: PathBuf,
    /// Start both files empty instead of appending to a previous run
    pub truncate: bool,
}

impl FileSinkConfig {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./black_box"));

        let truncate = match params.get("truncate").map(String::as_str) {
            None => true,
            Some(raw) => raw
                .parse()
                .map_err(|_| format!("invalid 'truncate' value '{raw}', expected true or false"))?,
        };

        Ok(Self {
            base_path,
            truncate,
        })
    }
}

/// Sink persisting logs and sensor records to disk
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    black_box: BufWriter<File>,
    sensors: BufWriter<File>,
}

impl FileSink {
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        let black_box = open(&config.base_path.join(BLACK_BOX_FILE), config.truncate)?;
        let sensors = open(&config.base_path.join(SENSOR_FILE), config.truncate)?;

        Ok(Self {
            name: name.into(),
            config,
            black_box,
            sensors,
        })
    }

    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        Self::new(name, config)
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    fn persist(&mut self, event: &RelayEvent) -> std::io::Result<()> {
        match event {
            RelayEvent::Save { log } => append_line(&mut self.black_box, log),
            RelayEvent::Put { record } => append_line(&mut self.sensors, record),
            RelayEvent::Emit { .. } => Ok(()),
        }
    }
}

fn open(path: &Path, truncate: bool) -> std::io::Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(!truncate)
        .truncate(truncate)
        .open(path)?;
    Ok(BufWriter::new(file))
}

fn append_line<T: Serialize>(writer: &mut BufWriter<File>, value: &T) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writer.write_all(b"\n")?;
    writer.flush()
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, event),
        fields(sink = %self.name, kind = event.kind())
    )]
    async fn write(&mut self, event: &RelayEvent) -> Result<(), ContractError> {
        self.persist(event).map_err(|e| {
            error!(sink = %self.name, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.black_box
            .flush()
            .and_then(|()| self.sensors.flush())
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        debug!(sink = %self.name, path = %self.config.base_path.display(), "FileSink closed");
        Ok(())
    }
}
