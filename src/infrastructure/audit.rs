use crate::domain::audit::{AuditEvent, AuditOutcome};
use crate::domain::ports::AuditSink;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Emits each audit event as a structured `tracing` event on the `audit`
/// target, for whatever subscriber the host process installs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        let amount = event.amount.map(|a| a.to_string()).unwrap_or_default();
        match &event.outcome {
            AuditOutcome::Applied => tracing::info!(
                target: "audit",
                actor = %event.actor,
                operation = %event.operation,
                amount = %amount,
                target_ref = %event.target,
                at = %event.at,
                "applied"
            ),
            AuditOutcome::Declined(reason) => tracing::info!(
                target: "audit",
                actor = %event.actor,
                operation = %event.operation,
                amount = %amount,
                target_ref = %event.target,
                at = %event.at,
                reason = %reason,
                "declined"
            ),
            AuditOutcome::Failed(reason) => tracing::error!(
                target: "audit",
                actor = %event.actor,
                operation = %event.operation,
                amount = %amount,
                target_ref = %event.target,
                at = %event.at,
                reason = %reason,
                "failed"
            ),
        }
    }
}

/// Keeps every audit event in memory. Useful for tests and for hosts that
/// forward events in bulk.
#[derive(Debug, Default, Clone)]
pub struct RecordingAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: AuditEvent) {
        self.events.lock().await.push(event);
    }
}
