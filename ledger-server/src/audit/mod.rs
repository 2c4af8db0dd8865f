//! Audit trail
//!
//! Every state-changing ledger operation records who did what. Entries are
//! pushed onto a bounded channel and written by a background worker through
//! the `audit` tracing target, so a slow sink never blocks a mutation; when
//! the channel is full the entry is dropped with a warning.

use serde::Serialize;
use shared::util;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 1024;

/// What happened, from the ledger's point of view.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    OrderCreated,
    OrderStatusChanged,
    OrderRestored,
    OrderPermanentlyDeleted,
    SellerReassigned,
    InstallmentPaymentAdded,
    InstallmentPaymentReversed,
    InstallmentPlanRegenerated,
    DueDateChanged,
    CommissionPinned,
    CommissionCleared,
    CommissionPaid,
    CommissionPaymentReversed,
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub details: String,
    pub acting_user: String,
    pub timestamp: i64,
}

/// Sink for audit entries. Recording must be cheap and non-blocking;
/// implementations buffer or drop rather than stall the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, action: AuditAction, details: String, acting_user: &str);
}

/// Default sink: bounded channel drained by a worker task that emits each
/// entry as a structured log line under the `audit` target.
pub struct AuditLogger {
    tx: mpsc::Sender<AuditEntry>,
}

impl AuditLogger {
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::channel::<AuditEntry>(CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                tracing::info!(
                    target: "audit",
                    action = ?entry.action,
                    acting_user = %entry.acting_user,
                    timestamp = entry.timestamp,
                    "{}",
                    entry.details
                );
            }
        });
        Self { tx }
    }
}

impl AuditSink for AuditLogger {
    fn record(&self, action: AuditAction, details: String, acting_user: &str) {
        let entry = AuditEntry {
            action,
            details,
            acting_user: acting_user.to_string(),
            timestamp: util::now_millis(),
        };
        if let Err(err) = self.tx.try_send(entry) {
            tracing::warn!(?err, "audit channel full, entry dropped");
        }
    }
}

/// No-op sink for tests and tooling.
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _action: AuditAction, _details: String, _acting_user: &str) {}
}
