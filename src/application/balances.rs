use super::ledger::LedgerContext;
use super::projections;
use crate::domain::affiliate::AffiliateId;
use crate::domain::report::{AffiliateBalance, BalanceDrift, CommissionSummary, TopEarnerRow};
use crate::error::{LedgerError, Result};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Read side of the ledger: per-affiliate balances and system-wide totals.
///
/// Reads use the materialized balance fields. [`BalanceAggregator::reconcile`]
/// cross-checks them against the underlying entries and payouts.
#[derive(Clone)]
pub struct BalanceAggregator {
    ctx: LedgerContext,
}

impl BalanceAggregator {
    pub(crate) fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn affiliate_balance(&self, affiliate_id: AffiliateId) -> Result<AffiliateBalance> {
        let affiliate = self
            .ctx
            .store
            .affiliate(affiliate_id)
            .await?
            .ok_or_else(|| LedgerError::validation(format!("unknown affiliate {affiliate_id}")))?;
        Ok(projections::balance_of(&affiliate))
    }

    /// Highest cumulative earners first, ties by ascending affiliate id.
    pub async fn top_earners(&self, limit: usize) -> Result<Vec<TopEarnerRow>> {
        let snapshot = self.ctx.store.snapshot().await?;
        Ok(projections::top_earners(&snapshot, limit))
    }

    pub async fn commission_summary(&self) -> Result<CommissionSummary> {
        let snapshot = self.ctx.store.snapshot().await?;
        Ok(CommissionSummary {
            totals: projections::totals(&snapshot),
            pending_withdrawal_count: snapshot
                .withdrawals
                .iter()
                .filter(|w| w.is_pending())
                .count(),
            recent_payouts: projections::recent_payouts(
                &snapshot,
                self.ctx.config.recent_payout_limit,
            ),
        })
    }

    /// Re-derives balances from commission entries, payouts and open
    /// reservations and reports every affiliate that has drifted. Read-only.
    pub async fn reconcile(&self) -> Result<Vec<BalanceDrift>> {
        let snapshot = self.ctx.store.snapshot().await?;
        Ok(projections::reconcile(&snapshot))
    }

    /// Runs [`BalanceAggregator::reconcile`] every `every` until the returned
    /// handle is aborted. Drift is logged, never repaired.
    pub fn spawn_reconciliation(&self, every: Duration) -> JoinHandle<()> {
        let aggregator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match aggregator.reconcile().await {
                    Ok(drifts) if drifts.is_empty() => info!("reconciliation found no drift"),
                    Ok(drifts) => {
                        for drift in drifts {
                            warn!(
                                affiliate_id = drift.affiliate_id,
                                code = %drift.code,
                                recorded = ?drift.recorded,
                                derived = ?drift.derived,
                                "affiliate balance drift"
                            );
                        }
                    }
                    Err(e) => error!(error = %e, "reconciliation failed"),
                }
            }
        })
    }
}
