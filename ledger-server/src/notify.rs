//! Operator notifications
//!
//! Fire-and-forget messages surfaced to whoever runs the store: payment
//! landed, stock released, commission batch paid. Delivery is best-effort
//! and must never fail a ledger operation.

/// How urgently the message should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);
}

/// Default sink: routes notifications through the log pipeline.
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!(target: "notify", "{}", message),
            Severity::Warning => tracing::warn!(target: "notify", "{}", message),
        }
    }
}

/// No-op sink for tests.
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn notify(&self, _severity: Severity, _message: &str) {}
}
