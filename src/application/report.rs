use super::ledger::LedgerContext;
use super::projections;
use crate::domain::report::CommissionReport;
use crate::error::Result;
use chrono::Utc;

/// Assembles the commission reporting snapshot. Read-only.
#[derive(Clone)]
pub struct ReportBuilder {
    ctx: LedgerContext,
}

impl ReportBuilder {
    pub(crate) fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Builds the report from one store snapshot, so totals, rankings and
    /// queues all describe the same committed state. An empty ledger yields
    /// zeroed totals and empty lists.
    pub async fn build(&self) -> Result<CommissionReport> {
        let snapshot = self.ctx.store.snapshot().await?;
        Ok(CommissionReport {
            generated_at: Utc::now(),
            totals: projections::totals(&snapshot),
            top_earners: projections::top_earners(&snapshot, self.ctx.config.top_earner_limit),
            pending_withdrawals: projections::pending_withdrawal_rows(&snapshot),
            recent_payouts: projections::recent_payouts(
                &snapshot,
                self.ctx.config.recent_payout_limit,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::application::testing::{funded_ledger, ledger};
    use crate::domain::report::CommissionTotals;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_empty_ledger_report() {
        let (ledger, _) = ledger();
        let report = ledger.reports().build().await.unwrap();
        assert_eq!(report.totals, CommissionTotals::default());
        assert!(report.top_earners.is_empty());
        assert!(report.pending_withdrawals.is_empty());
        assert!(report.recent_payouts.is_empty());
    }

    #[tokio::test]
    async fn test_report_reflects_ledger_state() {
        let (ledger, _) = funded_ledger(dec!(1000)).await;
        let paid = ledger.withdrawals().create_request(1, dec!(600)).await.unwrap();
        ledger.payouts().process(paid.id, "admin").await.unwrap();
        ledger.withdrawals().create_request(1, dec!(100)).await.unwrap();

        let report = ledger.reports().build().await.unwrap();
        assert_eq!(report.totals.total_earned, dec!(1000));
        assert_eq!(report.totals.total_paid, dec!(600));
        assert_eq!(report.totals.total_pending, dec!(300));
        assert_eq!(report.top_earners[0].code, "ACME");
        assert_eq!(report.top_earners[0].commission_pending, dec!(300));
        assert_eq!(report.pending_withdrawals.len(), 1);
        assert_eq!(report.pending_withdrawals[0].amount_requested, dec!(100));
        assert_eq!(report.recent_payouts.len(), 1);
        assert_eq!(report.recent_payouts[0].amount_requested, dec!(600));
    }

    #[tokio::test]
    async fn test_report_serializes_field_names() {
        let (ledger, _) = funded_ledger(dec!(12.50)).await;
        let report = ledger.reports().build().await.unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["totals"]["total_earned"], "12.50");
        assert_eq!(json["top_earners"][0]["code"], "ACME");
        assert_eq!(json["top_earners"][0]["total_sales"], 1);
        assert!(json["pending_withdrawals"].as_array().unwrap().is_empty());
    }
}
