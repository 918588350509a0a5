//! Append-only audit trail of forwarded calls.
//!
//! Sinks must never block the caller: [`AuditSink::record`] is synchronous
//! and returns immediately. [`JsonlAuditSink`] hands records to a bounded
//! queue drained by a background task; when the queue is full the record is
//! dropped with a warning rather than stalling the call.

use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    tokio::{
        fs::OpenOptions,
        io::AsyncWriteExt,
        sync::mpsc::{self, error::TrySendError},
        task::JoinHandle,
    },
    tracing::{debug, info, warn},
};

use crate::{Arguments, rules::Domain};

/// Default queue capacity for [`JsonlAuditSink`].
pub const DEFAULT_AUDIT_CAPACITY: usize = 1024;

/// One forwarded call. Written once, never read back by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub domain: Domain,
    pub operation: String,
    /// Arguments as sent to the transport, serialized as JSON.
    pub arguments: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(domain: Domain, operation: &str, arguments: &Arguments) -> Self {
        Self {
            domain,
            operation: operation.to_string(),
            arguments: serde_json::to_string(arguments).unwrap_or_else(|_| "{}".into()),
            timestamp: Utc::now(),
        }
    }
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Accept a record without blocking.
    fn record(&self, record: AuditRecord);
}

/// Emits each record as a structured `info` event on `readgate::audit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) {
        info!(
            target: "readgate::audit",
            domain = %record.domain,
            operation = %record.operation,
            arguments = %record.arguments,
            timestamp = %record.timestamp.to_rfc3339(),
            "forwarding call"
        );
    }
}

/// Appends records as JSON lines from a background task.
pub struct JsonlAuditSink {
    path: PathBuf,
    tx: mpsc::Sender<AuditRecord>,
    handle: JoinHandle<()>,
}

impl JsonlAuditSink {
    /// Open (or create) the file and start the writer task.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(path: &Path, capacity: usize) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("failed to open audit log {}", path.display()))?;

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(writer_task(file, rx, path.to_path_buf()));
        info!(path = %path.display(), capacity, "audit log opened");

        Ok(Self {
            path: path.to_path_buf(),
            tx,
            handle,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the queue and wait for pending records to be written.
    pub async fn shutdown(self) {
        let Self { tx, handle, .. } = self;
        drop(tx);
        if let Err(e) = handle.await {
            warn!(error = %e, "audit writer task failed");
        }
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, record: AuditRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {},
            Err(TrySendError::Full(record)) => {
                warn!(operation = %record.operation, "audit queue full, record dropped");
            },
            Err(TrySendError::Closed(record)) => {
                warn!(operation = %record.operation, "audit writer stopped, record dropped");
            },
        }
    }
}

async fn writer_task(
    mut file: tokio::fs::File,
    mut rx: mpsc::Receiver<AuditRecord>,
    path: PathBuf,
) {
    while let Some(record) = rx.recv().await {
        let mut line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to serialize audit record");
                continue;
            },
        };
        line.push('\n');
        if let Err(e) = file.write_all(line.as_bytes()).await {
            warn!(path = %path.display(), error = %e, "failed to write audit record");
            continue;
        }
        if let Err(e) = file.flush().await {
            warn!(path = %path.display(), error = %e, "failed to flush audit log");
        }
    }
    debug!(path = %path.display(), "audit writer stopped");
}
