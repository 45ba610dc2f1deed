//! FileSink - appends records to daily JSON-lines files

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contracts::{
    Context, ContractError, Datapoint, Event, EventSink, PointSink, RecordKind, Span, SpanSink,
};
use serde::Serialize;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self { base_path }
    }
}

/// Sink that appends each batch to `<base_path>/<kind>-<YYYYMMDD>.jsonl`
///
/// One JSON document per line. A batch is encoded fully before anything is
/// written, so an encoding failure leaves the file untouched. A write that
/// fails partway is truncated back to the previous length, so the file only
/// ever holds whole batches. Appends are serialized per sink; other writers
/// to the same file are not coordinated with.
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    write_lock: Mutex<()>,
}

impl FileSink {
    /// Create a new FileSink, creating the base directory if needed
    pub async fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path).await?;

        Ok(Self {
            name: name.into(),
            config,
            write_lock: Mutex::new(()),
        })
    }

    /// Create from params map (for factory)
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    /// File a batch of `kind` received at `now` is appended to
    pub fn path_for(&self, kind: RecordKind, now: DateTime<Utc>) -> PathBuf {
        self.config
            .base_path
            .join(format!("{}-{}.jsonl", kind, now.format("%Y%m%d")))
    }

    fn encode<R: Serialize>(&self, batch: &[R]) -> Result<Vec<u8>, ContractError> {
        let mut buf = Vec::with_capacity(batch.len() * 128);
        for record in batch {
            serde_json::to_writer(&mut buf, record)
                .map_err(|e| ContractError::sink_write(&self.name, format!("json error: {e}")))?;
            buf.push(b'\n');
        }
        Ok(buf)
    }

    async fn append<R: Serialize + Sync>(
        &self,
        ctx: &Context,
        kind: RecordKind,
        batch: &[R],
    ) -> Result<(), ContractError> {
        ctx.check(&self.name)?;
        let data = self.encode(batch)?;

        let _guard = self.write_lock.lock().await;
        let path = self.path_for(kind, Utc::now());
        self.write_file(&path, &data).await.map_err(|e| {
            error!(sink = %self.name, path = %path.display(), error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })?;

        debug!(
            sink = %self.name,
            path = %path.display(),
            records = batch.len(),
            bytes = data.len(),
            "Batch appended"
        );
        Ok(())
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let start = file.metadata().await?.len();
        append_all(&mut file, start, data).await
    }
}

/// Append target that can be cut back to an earlier length
#[async_trait]
trait Truncate {
    async fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

#[async_trait]
impl Truncate for File {
    async fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len).await
    }
}

/// Write `data` after `start`, or restore the length `start` on failure
///
/// The write error is returned even when the rollback succeeds.
async fn append_all<W>(writer: &mut W, start: u64, data: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Truncate + Unpin + Send,
{
    let written = async {
        writer.write_all(data).await?;
        writer.flush().await
    }
    .await;

    if let Err(e) = written {
        if let Err(rollback) = writer.truncate_to(start).await {
            error!(error = %rollback, len = start, "Rollback of partial write failed");
        }
        return Err(e);
    }
    Ok(())
}

#[async_trait]
impl PointSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_add_datapoints",
        skip_all,
        fields(sink = %self.name, batch = points.len())
    )]
    async fn add_datapoints(
        &self,
        ctx: &Context,
        points: &[Datapoint],
    ) -> Result<(), ContractError> {
        self.append(ctx, RecordKind::Points, points).await
    }
}

#[async_trait]
impl EventSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_add_events",
        skip_all,
        fields(sink = %self.name, batch = events.len())
    )]
    async fn add_events(&self, ctx: &Context, events: &[Event]) -> Result<(), ContractError> {
        self.append(ctx, RecordKind::Events, events).await
    }
}

#[async_trait]
impl SpanSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_add_spans",
        skip_all,
        fields(sink = %self.name, batch = spans.len())
    )]
    async fn add_spans(&self, ctx: &Context, spans: &[Span]) -> Result<(), ContractError> {
        self.append(ctx, RecordKind::Spans, spans).await
    }
}
