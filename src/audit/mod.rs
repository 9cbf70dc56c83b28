//! Advisory audit logging.
//!
//! Audit entries annotate a primary operation (profile update, password
//! change, avatar link) but never decide its outcome. `AuditQueue::record`
//! hands the entry to a background worker and returns immediately; write
//! failures are logged and published on the queue's failure channel only.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::backend::{BackendError, ProfileBackend};

const FAILURE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    ProfileUpdated,
    PasswordChanged,
    AvatarUpdated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ProfileUpdated => "profile_updated",
            AuditAction::PasswordChanged => "password_changed",
            AuditAction::AvatarUpdated => "avatar_updated",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub admin_id: i64,
    pub action: AuditAction,
    pub table_name: String,
    pub record_id: i64,
    pub changes: Value,
}

impl AuditRecord {
    /// Entry describing a change an admin made to their own `admins` row.
    pub fn own_profile(admin_id: i64, action: AuditAction, changes: Value) -> Self {
        Self {
            admin_id,
            action,
            table_name: "admins".to_string(),
            record_id: admin_id,
            changes,
        }
    }
}

/// An audit write that did not make it to the backend.
#[derive(Debug, Clone)]
pub struct AuditFailure {
    pub record: AuditRecord,
    pub error: BackendError,
}

enum Command {
    Record(AuditRecord),
    Flush(oneshot::Sender<()>),
}

#[derive(Default)]
struct Counters {
    written: AtomicU64,
    failed: AtomicU64,
}

/// Fire-and-forget queue of advisory audit writes.
#[derive(Clone)]
pub struct AuditQueue {
    tx: mpsc::UnboundedSender<Command>,
    failures: broadcast::Sender<AuditFailure>,
    counters: Arc<Counters>,
}

impl AuditQueue {
    /// Start the background writer on the current tokio runtime.
    pub fn spawn(backend: Arc<dyn ProfileBackend>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);
        let counters = Arc::new(Counters::default());

        tokio::spawn(run_worker(backend, rx, failures.clone(), counters.clone()));

        Self { tx, failures, counters }
    }

    /// Queue an entry. Never fails and never waits for the write.
    pub fn record(&self, record: AuditRecord) {
        let action = record.action;
        if self.tx.send(Command::Record(record)).is_err() {
            log::warn!("Audit queue is closed; dropping '{action}' entry");
        }
    }

    /// Wait until every entry queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    pub fn subscribe_failures(&self) -> broadcast::Receiver<AuditFailure> {
        self.failures.subscribe()
    }

    pub fn written(&self) -> u64 {
        self.counters.written.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }
}

async fn run_worker(
    backend: Arc<dyn ProfileBackend>,
    mut rx: mpsc::UnboundedReceiver<Command>,
    failures: broadcast::Sender<AuditFailure>,
    counters: Arc<Counters>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Record(record) => match backend.insert_audit(&record).await {
                Ok(()) => {
                    counters.written.fetch_add(1, Ordering::Relaxed);
                }
                Err(error) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    log::warn!(
                        "Could not write '{}' audit entry for admin {}: {error}",
                        record.action,
                        record.admin_id
                    );
                    // No subscribers is fine.
                    let _ = failures.send(AuditFailure { record, error });
                }
            },
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    log::debug!("Audit queue worker stopped");
}
