//! NetworkSink - UDP streaming, one datagram per batch

use std::collections::HashMap;
use std::net::SocketAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contracts::{
    Context, ContractError, Datapoint, Event, EventSink, PointSink, RecordKind, Span, SpanSink,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Serialization format for network transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

impl NetworkFormat {
    /// Encode a batch envelope
    pub fn encode<R: Serialize>(&self, batch: &WireBatch<'_, R>) -> Result<Vec<u8>, String> {
        match self {
            Self::Json => serde_json::to_vec(batch).map_err(|e| format!("json error: {}", e)),
            Self::Bincode => {
                bincode::serialize(batch).map_err(|e| format!("bincode error: {}", e))
            }
        }
    }

    /// Decode a datagram produced by [`NetworkFormat::encode`]
    pub fn decode<R: DeserializeOwned>(&self, data: &[u8]) -> Result<ReceivedBatch<R>, String> {
        match self {
            Self::Json => serde_json::from_slice(data).map_err(|e| format!("json error: {}", e)),
            Self::Bincode => {
                bincode::deserialize(data).map_err(|e| format!("bincode error: {}", e))
            }
        }
    }
}

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Serialization format
    pub format: NetworkFormat,
    /// Max payload size (UDP tops out at 65507 for IPv4)
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let format = match params.get("format").map(String::as_str) {
            Some("bincode") => NetworkFormat::Bincode,
            Some("json") | None => NetworkFormat::Json,
            Some(other) => return Err(format!("unknown format '{}'", other)),
        };

        let max_packet_size = match params.get("max_packet_size") {
            Some(s) => s
                .parse()
                .map_err(|e| format!("invalid max_packet_size '{}': {}", s, e))?,
            None => 65000,
        };

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Envelope sent for each batch
#[derive(Debug, Serialize)]
pub struct WireBatch<'a, R> {
    pub kind: RecordKind,
    pub sent_at: DateTime<Utc>,
    pub records: &'a [R],
}

/// Owned form of [`WireBatch`] on the receiving side
///
/// Field order must match `WireBatch`; bincode is positional.
#[derive(Debug, Deserialize)]
pub struct ReceivedBatch<R> {
    pub kind: RecordKind,
    pub sent_at: DateTime<Utc>,
    pub records: Vec<R>,
}

/// Sink that sends each batch as a single UDP datagram
///
/// Unlike a best-effort exporter, a payload over `max_packet_size` or a
/// failed send is reported back as a sink failure.
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: UdpSocket,
}

impl NetworkSink {
    /// Create a new NetworkSink
    #[instrument(name = "network_sink_new", skip(name, config))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&config.addr).await?;

        debug!(
            sink = %name,
            target = %config.addr,
            "NetworkSink connected"
        );

        Ok(Self {
            name,
            config,
            socket,
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "network_sink_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(format!("sinks[{name}].params"), e))?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::sink_connection(name, e.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> SocketAddr {
        self.config.addr
    }

    pub fn format(&self) -> NetworkFormat {
        self.config.format
    }

    fn prepare_payload<R: Serialize>(
        &self,
        kind: RecordKind,
        records: &[R],
    ) -> Result<Vec<u8>, ContractError> {
        let batch = WireBatch {
            kind,
            sent_at: Utc::now(),
            records,
        };
        let data = self
            .config
            .format
            .encode(&batch)
            .map_err(|e| ContractError::sink_write(&self.name, e))?;

        if data.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Packet too large, dropping batch"
            );
            return Err(ContractError::sink_write(
                &self.name,
                format!(
                    "payload of {} bytes exceeds max_packet_size {}",
                    data.len(),
                    self.config.max_packet_size
                ),
            ));
        }

        Ok(data)
    }

    async fn transmit(&self, ctx: &Context, data: &[u8]) -> Result<(), ContractError> {
        tokio::select! {
            biased;
            _ = ctx.done() => ctx.check(&self.name),
            sent = self.socket.send(data) => match sent {
                Ok(bytes) => {
                    debug!(sink = %self.name, bytes, "Sent");
                    Ok(())
                }
                Err(e) => {
                    error!(sink = %self.name, error = %e, "UDP send failed");
                    Err(ContractError::sink_write(&self.name, e.to_string()))
                }
            },
        }
    }

    async fn send_batch<R: Serialize + Sync>(
        &self,
        ctx: &Context,
        kind: RecordKind,
        records: &[R],
    ) -> Result<(), ContractError> {
        ctx.check(&self.name)?;
        let data = self.prepare_payload(kind, records)?;
        self.transmit(ctx, &data).await
    }
}

#[async_trait]
impl PointSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_add_datapoints",
        skip_all,
        fields(sink = %self.name, batch = points.len())
    )]
    async fn add_datapoints(
        &self,
        ctx: &Context,
        points: &[Datapoint],
    ) -> Result<(), ContractError> {
        self.send_batch(ctx, RecordKind::Points, points).await
    }
}

#[async_trait]
impl EventSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_add_events",
        skip_all,
        fields(sink = %self.name, batch = events.len())
    )]
    async fn add_events(&self, ctx: &Context, events: &[Event]) -> Result<(), ContractError> {
        self.send_batch(ctx, RecordKind::Events, events).await
    }
}

#[async_trait]
impl SpanSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_add_spans",
        skip_all,
        fields(sink = %self.name, batch = spans.len())
    )]
    async fn add_spans(&self, ctx: &Context, spans: &[Span]) -> Result<(), ContractError> {
        self.send_batch(ctx, RecordKind::Spans, spans).await
    }
}
