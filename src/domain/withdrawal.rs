use super::affiliate::AffiliateId;
use super::money::Amount;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type WithdrawalId = u32;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    #[default]
    Pending,
    Processed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Processed => f.write_str("processed"),
            Self::Rejected => f.write_str("rejected"),
        }
    }
}

/// An affiliate's request to be paid part of its pending balance.
///
/// The requested amount is reserved (taken out of pending) when the request
/// is created. A request leaves `Pending` exactly once.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub affiliate_id: AffiliateId,
    pub amount_requested: Amount,
    pub status: WithdrawalStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl WithdrawalRequest {
    pub fn new(
        id: WithdrawalId,
        affiliate_id: AffiliateId,
        amount_requested: Amount,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            affiliate_id,
            amount_requested,
            status: WithdrawalStatus::Pending,
            requested_at,
            processed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == WithdrawalStatus::Pending
    }

    pub fn mark_processed(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.finish(WithdrawalStatus::Processed, at)
    }

    pub fn mark_rejected(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.finish(WithdrawalStatus::Rejected, at)
    }

    fn finish(&mut self, status: WithdrawalStatus, at: DateTime<Utc>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(LedgerError::InvalidStateTransition {
                withdrawal_id: self.id,
                status: self.status,
            });
        }
        self.status = status;
        self.processed_at = Some(at);
        Ok(())
    }
}

/// Proof that a withdrawal request was paid out. At most one per request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PayoutRecord {
    pub withdrawal_id: WithdrawalId,
    pub affiliate_id: AffiliateId,
    pub amount: Amount,
    pub processed_at: DateTime<Utc>,
    pub processed_by: String,
}

/// Confirmation handed back to the admin after a payout.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct PayoutReceipt {
    pub withdrawal_id: WithdrawalId,
    pub affiliate_code: String,
    pub amount: Amount,
    pub processed_at: DateTime<Utc>,
    pub processed_by: String,
}

impl PayoutReceipt {
    pub fn message(&self) -> String {
        format!(
            "Paid {} to affiliate {} for withdrawal #{}",
            self.amount, self.affiliate_code, self.withdrawal_id
        )
    }
}
