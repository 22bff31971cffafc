use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    AccrueCommission,
    RequestWithdrawal,
    ProcessPayout,
    RejectWithdrawal,
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AccrueCommission => "accrue_commission",
            Self::RequestWithdrawal => "request_withdrawal",
            Self::ProcessPayout => "process_payout",
            Self::RejectWithdrawal => "reject_withdrawal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum AuditOutcome {
    Applied,
    /// Declined by a business rule; nothing was written.
    Declined(String),
    /// Storage failure; the transaction was rolled back.
    Failed(String),
}

/// Metadata about one money-moving operation, handed to the audit sink.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct AuditEvent {
    pub actor: String,
    pub operation: AuditOperation,
    pub amount: Option<Decimal>,
    pub target: String,
    pub outcome: AuditOutcome,
    pub at: DateTime<Utc>,
}
