use super::ledger::{LedgerContext, outcome_of};
use super::locks::RowKey;
use crate::domain::affiliate::AffiliateId;
use crate::domain::audit::{AuditOperation, AuditOutcome};
use crate::domain::commission::{AccrualOutcome, CommissionEntry, SaleFinalized};
use crate::domain::money::Amount;
use crate::domain::ports::StoreWrite;
use crate::error::{LedgerError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Actor recorded in the audit trail for accruals.
const CHECKOUT_ACTOR: &str = "checkout";

/// Posts commission entries for finalized sales.
#[derive(Clone)]
pub struct CommissionRecorder {
    ctx: LedgerContext,
}

impl CommissionRecorder {
    pub(crate) fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Credits the referring affiliate for a finalized sale.
    ///
    /// The entry insert and the balance increment commit together. A sale id
    /// that was already credited is reported as [`AccrualOutcome::Duplicate`]
    /// and changes nothing, so redelivered events are harmless.
    #[tracing::instrument(skip(self, sale), fields(sale_id = sale.sale_id))]
    pub async fn record_sale(&self, sale: SaleFinalized) -> Result<AccrualOutcome> {
        let Some(affiliate_id) = sale.affiliate_id else {
            debug!("sale has no referral, nothing to accrue");
            return Ok(AccrualOutcome::NoReferral(sale.sale_id));
        };

        let result = self.accrue(affiliate_id, &sale).await;
        let outcome = match &result {
            Ok(AccrualOutcome::Duplicate(sale_id)) => {
                AuditOutcome::Declined(format!("sale {sale_id} already credited"))
            }
            other => outcome_of(other),
        };
        self.ctx
            .audit(
                CHECKOUT_ACTOR,
                AuditOperation::AccrueCommission,
                Some(sale.commission_amount),
                format!("affiliate:{affiliate_id}/sale:{}", sale.sale_id),
                outcome,
            )
            .await;
        result
    }

    async fn accrue(
        &self,
        affiliate_id: AffiliateId,
        sale: &SaleFinalized,
    ) -> Result<AccrualOutcome> {
        if sale.amount_paid < Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "sale {} has negative amount paid {}",
                sale.sale_id, sale.amount_paid
            )));
        }
        let amount = Amount::new(sale.commission_amount)?;

        let _sale_row = self.ctx.locks.acquire(RowKey::Sale(sale.sale_id)).await?;
        if self.ctx.store.commission_entry(sale.sale_id).await?.is_some() {
            info!("sale already credited, ignoring redelivery");
            return Ok(AccrualOutcome::Duplicate(sale.sale_id));
        }

        let _affiliate_row = self
            .ctx
            .locks
            .acquire(RowKey::Affiliate(affiliate_id))
            .await?;
        let mut affiliate = self
            .ctx
            .store
            .affiliate(affiliate_id)
            .await?
            .ok_or_else(|| LedgerError::validation(format!("unknown affiliate {affiliate_id}")))?;

        affiliate.accrue(amount)?;
        let entry = CommissionEntry {
            sale_id: sale.sale_id,
            affiliate_id,
            amount,
            created_at: Utc::now(),
        };
        self.ctx
            .store
            .commit(vec![
                StoreWrite::InsertEntry(entry.clone()),
                StoreWrite::PutAffiliate(affiliate),
            ])
            .await?;

        info!(affiliate_id, %amount, "commission accrued");
        Ok(AccrualOutcome::Recorded(entry))
    }
}

#[cfg(test)]
mod tests {
    use crate::application::testing::{ledger, sale};
    use crate::domain::audit::AuditOutcome;
    use crate::domain::commission::{AccrualOutcome, SaleFinalized};
    use crate::error::LedgerError;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_accrual_credits_earned_and_pending() {
        let (ledger, audit) = ledger();
        ledger.directory().register(1, "ACME").await.unwrap();

        let outcome = ledger
            .accruals()
            .record_sale(sale(1, Some(1), dec!(1000)))
            .await
            .unwrap();
        assert!(outcome.is_recorded());

        let balance = ledger.balances().affiliate_balance(1).await.unwrap();
        assert_eq!(balance.earned, dec!(1000));
        assert_eq!(balance.pending, dec!(1000));
        assert_eq!(balance.paid, dec!(0));

        let events = audit.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, AuditOutcome::Applied);
        assert_eq!(events[0].amount, Some(dec!(1000)));
    }

    #[tokio::test]
    async fn test_duplicate_sale_is_noop() {
        let (ledger, audit) = ledger();
        ledger.directory().register(1, "ACME").await.unwrap();
        let recorder = ledger.accruals();

        recorder.record_sale(sale(7, Some(1), dec!(50))).await.unwrap();
        let second = recorder.record_sale(sale(7, Some(1), dec!(50))).await.unwrap();
        assert_eq!(second, AccrualOutcome::Duplicate(7));

        let balance = ledger.balances().affiliate_balance(1).await.unwrap();
        assert_eq!(balance.earned, dec!(50));
        assert_eq!(balance.pending, dec!(50));

        let events = audit.events().await;
        assert!(matches!(events[1].outcome, AuditOutcome::Declined(_)));
    }

    #[tokio::test]
    async fn test_sale_without_referral_is_noop() {
        let (ledger, audit) = ledger();
        let outcome = ledger
            .accruals()
            .record_sale(sale(3, None, dec!(10)))
            .await
            .unwrap();
        assert_eq!(outcome, AccrualOutcome::NoReferral(3));
        assert!(audit.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_affiliate_leaves_no_entry() {
        let (ledger, audit) = ledger();
        let result = ledger
            .accruals()
            .record_sale(sale(4, Some(99), dec!(10)))
            .await;
        assert!(matches!(result, Err(LedgerError::ValidationError(_))));

        let snapshot = ledger.context().store.snapshot().await.unwrap();
        assert!(snapshot.entries.is_empty());
        assert!(matches!(
            audit.events().await[0].outcome,
            AuditOutcome::Declined(_)
        ));
    }

    #[tokio::test]
    async fn test_overflowing_accrual_is_declined() {
        let (ledger, audit) = ledger();
        ledger.directory().register(1, "ACME").await.unwrap();
        let recorder = ledger.accruals();
        let huge = |sale_id| SaleFinalized {
            sale_id,
            affiliate_id: Some(1),
            amount_paid: Decimal::MAX,
            commission_amount: Decimal::MAX,
        };

        recorder.record_sale(huge(1)).await.unwrap();
        let before = ledger.context().store.snapshot().await.unwrap();

        let result = recorder.record_sale(huge(2)).await;
        assert!(matches!(result, Err(LedgerError::ValidationError(_))));
        assert_eq!(ledger.context().store.snapshot().await.unwrap(), before);
        assert!(matches!(
            audit.events().await.pop().unwrap().outcome,
            AuditOutcome::Declined(_)
        ));
    }

    #[tokio::test]
    async fn test_invalid_commission_rejected() {
        let (ledger, _) = ledger();
        ledger.directory().register(1, "ACME").await.unwrap();
        let recorder = ledger.accruals();

        for commission in [dec!(0), dec!(-5), dec!(0.005)] {
            let result = recorder.record_sale(sale(1, Some(1), commission)).await;
            assert!(matches!(result, Err(LedgerError::ValidationError(_))));
        }
        let balance = ledger.balances().affiliate_balance(1).await.unwrap();
        assert_eq!(balance.earned, dec!(0));
    }
}
