//! Read-side result types. Each row is fully populated at construction so
//! consumers never see a partially keyed record.

use super::affiliate::AffiliateId;
use super::withdrawal::WithdrawalId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Clone, Copy)]
pub struct AffiliateBalance {
    pub earned: Decimal,
    pub pending: Decimal,
    pub paid: Decimal,
}

#[derive(Debug, Serialize, PartialEq, Clone, Copy, Default)]
pub struct CommissionTotals {
    pub total_pending: Decimal,
    pub total_earned: Decimal,
    pub total_paid: Decimal,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct TopEarnerRow {
    pub code: String,
    pub commission_earned: Decimal,
    pub commission_pending: Decimal,
    pub total_sales: u64,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct WithdrawalRow {
    pub withdrawal_id: WithdrawalId,
    pub code: String,
    pub amount_requested: Decimal,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct PayoutRow {
    pub withdrawal_id: WithdrawalId,
    pub code: String,
    pub amount_requested: Decimal,
    pub processed_at: DateTime<Utc>,
    pub processed_by: String,
}

/// System-wide totals with the payout queue size and latest payouts.
#[derive(Debug, Serialize, PartialEq, Clone, Default)]
pub struct CommissionSummary {
    pub totals: CommissionTotals,
    pub pending_withdrawal_count: usize,
    pub recent_payouts: Vec<PayoutRow>,
}

/// The full reporting snapshot, built from one consistent store read.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct CommissionReport {
    pub generated_at: DateTime<Utc>,
    pub totals: CommissionTotals,
    pub top_earners: Vec<TopEarnerRow>,
    pub pending_withdrawals: Vec<WithdrawalRow>,
    pub recent_payouts: Vec<PayoutRow>,
}

/// Materialized balances of one affiliate that disagree with the values
/// re-derived from commission entries, payouts and open reservations.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct BalanceDrift {
    pub affiliate_id: AffiliateId,
    pub code: String,
    pub recorded: AffiliateBalance,
    pub derived: AffiliateBalance,
    pub recorded_sales: u64,
    pub derived_sales: u64,
}
