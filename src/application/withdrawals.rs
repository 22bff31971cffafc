use super::ledger::{LedgerContext, outcome_of};
use super::locks::RowKey;
use super::projections;
use crate::domain::affiliate::AffiliateId;
use crate::domain::audit::AuditOperation;
use crate::domain::money::Amount;
use crate::domain::ports::StoreWrite;
use crate::domain::withdrawal::{WithdrawalId, WithdrawalRequest};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

/// Affiliate-initiated withdrawal requests.
///
/// Creating a request reserves the amount immediately: it leaves
/// `commission_pending` in the same commit that stores the request, under the
/// affiliate's row lock, so two concurrent requests can never both spend the
/// same balance.
#[derive(Clone)]
pub struct WithdrawalManager {
    ctx: LedgerContext,
}

impl WithdrawalManager {
    pub(crate) fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    #[tracing::instrument(skip(self), fields(%amount))]
    pub async fn create_request(
        &self,
        affiliate_id: AffiliateId,
        amount: Decimal,
    ) -> Result<WithdrawalRequest> {
        let result = self.reserve(affiliate_id, amount).await;
        let target = match &result {
            Ok(request) => format!("withdrawal:{}", request.id),
            Err(_) => format!("affiliate:{affiliate_id}"),
        };
        self.ctx
            .audit(
                format!("affiliate:{affiliate_id}"),
                AuditOperation::RequestWithdrawal,
                Some(amount),
                target,
                outcome_of(&result),
            )
            .await;
        result
    }

    async fn reserve(
        &self,
        affiliate_id: AffiliateId,
        amount: Decimal,
    ) -> Result<WithdrawalRequest> {
        let amount = Amount::new(amount)?;

        let _row = self
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
        if !affiliate.is_active() {
            return Err(LedgerError::validation(format!(
                "affiliate {} is {} and cannot request withdrawals",
                affiliate.code(),
                affiliate.status()
            )));
        }

        affiliate.reserve(amount)?;
        let id = self.ctx.store.next_withdrawal_id().await?;
        let request = WithdrawalRequest::new(id, affiliate_id, amount, Utc::now());
        self.ctx
            .store
            .commit(vec![
                StoreWrite::PutWithdrawal(request.clone()),
                StoreWrite::PutAffiliate(affiliate),
            ])
            .await?;

        info!(withdrawal_id = id, "withdrawal requested");
        Ok(request)
    }

    /// All pending requests, oldest first.
    pub async fn list_pending(&self) -> Result<Vec<WithdrawalRequest>> {
        let snapshot = self.ctx.store.snapshot().await?;
        Ok(projections::pending_requests(&snapshot))
    }

    pub async fn get(&self, id: WithdrawalId) -> Result<WithdrawalRequest> {
        self.ctx
            .store
            .withdrawal(id)
            .await?
            .ok_or_else(|| LedgerError::validation(format!("unknown withdrawal {id}")))
    }
}
