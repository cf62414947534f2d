//! Append-only audit logging, §9's re-architecture of "fire-and-forget
//! goroutines": audit must not block the request/handler path but must be
//! durable, so appends go through a bounded channel drained by a background
//! writer. Unlike [`crate::analytics::AnalyticsHooks`] (drop-with-alert under
//! backpressure), a full channel here spills into an in-memory overflow
//! buffer rather than dropping the entry, and a closed writer task falls back
//! to a direct, synchronous append.

use std::collections::VecDeque;
use std::sync::Arc;

use archivus_core::domain::AuditLog;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

use crate::store::InMemoryStore;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AuditRecorder {
    store: InMemoryStore,
    sender: mpsc::Sender<AuditLog>,
    overflow: Arc<Mutex<VecDeque<AuditLog>>>,
}

impl AuditRecorder {
    pub fn spawn(store: InMemoryStore) -> Self {
        let (sender, mut receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let overflow = Arc::new(Mutex::new(VecDeque::new()));

        let writer_store = store.clone();
        let writer_overflow = overflow.clone();
        tokio::spawn(async move {
            while let Some(entry) = receiver.recv().await {
                writer_store.append_audit(entry);
                while let Some(pending) = writer_overflow.lock().pop_front() {
                    writer_store.append_audit(pending);
                }
            }
        });

        Self { store, sender, overflow }
    }

    /// Non-blocking append. Never silently drops an entry: a full channel
    /// spills to the overflow buffer (drained opportunistically by the
    /// writer task), and a closed channel falls back to appending directly.
    pub fn record(&self, entry: AuditLog) {
        match self.sender.try_send(entry) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(entry)) => {
                warn!(resource_id = %entry.resource_id, "audit channel full, spilling to overflow buffer");
                self.overflow.lock().push_back(entry);
            }
            Err(mpsc::error::TrySendError::Closed(entry)) => {
                warn!(resource_id = %entry.resource_id, "audit writer task gone, appending synchronously");
                self.store.append_audit(entry);
            }
        }
    }
}
