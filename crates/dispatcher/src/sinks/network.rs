//! NetworkSink - UDP broadcast events for a UI bridge
//!
//! One datagram per `Emit` event; other event kinds are ignored.

use std::collections::HashMap;
use std::net::SocketAddr;

use contracts::{ContractError, DataSink, RelayEvent, Topic};
use serde::Serialize;
use serde_json::Value;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    /// `{"topic": .., "payload": ..}`
    #[default]
    Json,
    /// bincode `(topic, payload as JSON text)`
    Bincode,
}

#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    pub addr: SocketAddr,
    pub format: NetworkFormat,
    /// Larger datagrams are not sent
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{addr_str}': {e}"))?;

        let format = match params.get("format").map(String::as_str) {
            Some("bincode") => NetworkFormat::Bincode,
            Some("json") | None => NetworkFormat::Json,
            Some(other) => return Err(format!("unknown format '{other}'")),
        };

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

#[derive(Serialize)]
struct Datagram<'a> {
    topic: Topic,
    payload: &'a Value,
}

pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: Option<UdpSocket>,
}

impl NetworkSink {
    #[instrument(name = "network_sink_new", skip(name, config), fields(target = %config.addr))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let bind: SocketAddr = if config.addr.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(&config.addr).await?;

        debug!(sink = %name, target = %config.addr, "NetworkSink connected");

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    #[instrument(name = "network_sink_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::sink_write(&name, e))?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::SinkConnection {
                sink_name: name,
                message: e.to_string(),
            })
    }

    fn encode(&self, topic: Topic, payload: &Value) -> Result<Vec<u8>, ContractError> {
        let data = match self.config.format {
            NetworkFormat::Json => serde_json::to_vec(&Datagram { topic, payload })
                .map_err(|e| ContractError::sink_write(&self.name, format!("json error: {e}")))?,
            NetworkFormat::Bincode => {
                bincode::serialize(&(topic.as_str(), payload.to_string())).map_err(|e| {
                    ContractError::sink_write(&self.name, format!("bincode error: {e}"))
                })?
            }
        };
        Ok(data)
    }

    async fn transmit(&self, topic: Topic, data: &[u8]) -> Result<(), ContractError> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_write(&self.name, "socket not connected"))?;

        match socket.send(data).await {
            Ok(sent) => debug!(sink = %self.name, %topic, bytes = sent, "Sent"),
            // Best effort: nobody listening is not a failure
            Err(e) => error!(sink = %self.name, %topic, error = %e, "UDP send failed"),
        }
        Ok(())
    }
}

impl DataSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_write",
        skip(self, event),
        fields(sink = %self.name, kind = event.kind())
    )]
    async fn write(&mut self, event: &RelayEvent) -> Result<(), ContractError> {
        let RelayEvent::Emit { topic, payload } = event else {
            return Ok(());
        };

        let data = self.encode(*topic, payload)?;
        if data.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Datagram too large, skipped"
            );
            return Err(ContractError::sink_write(
                &self.name,
                format!("datagram of {} bytes exceeds limit", data.len()),
            ));
        }

        self.transmit(*topic, &data).await
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "network_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, "NetworkSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Log;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn receiver() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    fn config(addr: SocketAddr, format: NetworkFormat) -> NetworkSinkConfig {
        NetworkSinkConfig {
            addr,
            format,
            max_packet_size: 65000,
        }
    }

    #[test]
    fn config_parsing() {
        let params = HashMap::from([
            ("addr".to_string(), "127.0.0.1:9999".to_string()),
            ("format".to_string(), "bincode".to_string()),
        ]);
        let config = NetworkSinkConfig::from_params(&params).unwrap();
        assert_eq!(config.addr.port(), 9999);
        assert_eq!(config.format, NetworkFormat::Bincode);

        let missing = NetworkSinkConfig::from_params(&HashMap::new()).unwrap_err();
        assert!(missing.contains("addr"), "got: {missing}");
    }

    #[tokio::test]
    async fn emit_arrives_as_json() {
        let (rx, addr) = receiver().await;
        let mut sink = NetworkSink::new("ui", config(addr, NetworkFormat::Json))
            .await
            .unwrap();

        sink.write(&RelayEvent::Emit {
            topic: Topic::ValveData,
            payload: json!({"v1": "open"}),
        })
        .await
        .unwrap();

        let mut buf = [0u8; 1024];
        let n = timeout(Duration::from_secs(1), rx.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let got: Value = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(got, json!({"topic": "valve_data", "payload": {"v1": "open"}}));
    }

    #[tokio::test]
    async fn emit_arrives_as_bincode() {
        let (rx, addr) = receiver().await;
        let mut sink = NetworkSink::new("ui", config(addr, NetworkFormat::Bincode))
            .await
            .unwrap();

        sink.write(&RelayEvent::Emit {
            topic: Topic::General,
            payload: json!([1, 2]),
        })
        .await
        .unwrap();

        let mut buf = [0u8; 1024];
        let n = timeout(Duration::from_secs(1), rx.recv(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let (topic, payload): (String, String) = bincode::deserialize(&buf[..n]).unwrap();
        assert_eq!(topic, "general");
        assert_eq!(payload, "[1,2]");
    }

    #[tokio::test]
    async fn save_events_are_ignored() {
        let (_rx, addr) = receiver().await;
        let mut sink = NetworkSink::new("ui", config(addr, NetworkFormat::Json))
            .await
            .unwrap();
        let result = sink
            .write(&RelayEvent::Save {
                log: Log::new("stage", "x", 0.0),
            })
            .await;
        assert!(result.is_ok());
    }
}
