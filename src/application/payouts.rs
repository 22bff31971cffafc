use super::ledger::{LedgerContext, outcome_of};
use super::locks::RowKey;
use crate::domain::affiliate::Affiliate;
use crate::domain::audit::AuditOperation;
use crate::domain::ports::StoreWrite;
use crate::domain::withdrawal::{PayoutRecord, PayoutReceipt, WithdrawalId, WithdrawalRequest};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

/// Settles or rejects pending withdrawal requests.
///
/// Both paths take the withdrawal row lock first and the affiliate row lock
/// second, refuse anything that is not `Pending`, and write the request, the
/// affiliate and (for payouts) the payout record in one commit. Replaying an
/// admin action therefore fails with `InvalidStateTransition` instead of paying
/// twice.
#[derive(Clone)]
pub struct PayoutProcessor {
    ctx: LedgerContext,
}

impl PayoutProcessor {
    pub(crate) fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Pays out a pending withdrawal request.
    ///
    /// Moves the reserved amount into `commission_paid`; `commission_pending`
    /// was already reduced when the request was created.
    #[tracing::instrument(skip(self))]
    pub async fn process(
        &self,
        withdrawal_id: WithdrawalId,
        admin_id: &str,
    ) -> Result<PayoutReceipt> {
        let mut amount = None;
        let result = self.settle(withdrawal_id, admin_id, &mut amount).await;
        self.ctx
            .audit(
                admin_id,
                AuditOperation::ProcessPayout,
                amount,
                format!("withdrawal:{withdrawal_id}"),
                outcome_of(&result),
            )
            .await;
        result
    }

    /// Rejects a pending withdrawal request and returns its reservation to
    /// the affiliate's pending balance.
    #[tracing::instrument(skip(self))]
    pub async fn reject(
        &self,
        withdrawal_id: WithdrawalId,
        admin_id: &str,
    ) -> Result<WithdrawalRequest> {
        let mut amount = None;
        let result = self.release(withdrawal_id, admin_id, &mut amount).await;
        self.ctx
            .audit(
                admin_id,
                AuditOperation::RejectWithdrawal,
                amount,
                format!("withdrawal:{withdrawal_id}"),
                outcome_of(&result),
            )
            .await;
        result
    }

    /// `amount` is filled in as soon as the request is loaded, so the audit
    /// record carries it even when a later step fails.
    async fn settle(
        &self,
        withdrawal_id: WithdrawalId,
        admin_id: &str,
        amount: &mut Option<Decimal>,
    ) -> Result<PayoutReceipt> {
        validate_admin(admin_id)?;
        let _withdrawal_row = self
            .ctx
            .locks
            .acquire(RowKey::Withdrawal(withdrawal_id))
            .await?;
        let mut request = self.load(withdrawal_id).await?;
        *amount = Some(request.amount_requested.value());
        ensure_pending(&request)?;
        let _affiliate_row = self
            .ctx
            .locks
            .acquire(RowKey::Affiliate(request.affiliate_id))
            .await?;
        let mut affiliate = self.load_affiliate(&request).await?;

        let now = Utc::now();
        request.mark_processed(now)?;
        affiliate.settle(request.amount_requested)?;
        let payout = PayoutRecord {
            withdrawal_id,
            affiliate_id: affiliate.id(),
            amount: request.amount_requested,
            processed_at: now,
            processed_by: admin_id.to_string(),
        };
        let receipt = PayoutReceipt {
            withdrawal_id,
            affiliate_code: affiliate.code().to_string(),
            amount: request.amount_requested,
            processed_at: now,
            processed_by: admin_id.to_string(),
        };

        self.ctx
            .store
            .commit(vec![
                StoreWrite::PutWithdrawal(request),
                StoreWrite::InsertPayout(payout),
                StoreWrite::PutAffiliate(affiliate),
            ])
            .await?;

        info!(amount = %receipt.amount, code = %receipt.affiliate_code, "withdrawal paid out");
        Ok(receipt)
    }

    async fn release(
        &self,
        withdrawal_id: WithdrawalId,
        admin_id: &str,
        amount: &mut Option<Decimal>,
    ) -> Result<WithdrawalRequest> {
        validate_admin(admin_id)?;
        let _withdrawal_row = self
            .ctx
            .locks
            .acquire(RowKey::Withdrawal(withdrawal_id))
            .await?;
        let mut request = self.load(withdrawal_id).await?;
        *amount = Some(request.amount_requested.value());
        ensure_pending(&request)?;
        let _affiliate_row = self
            .ctx
            .locks
            .acquire(RowKey::Affiliate(request.affiliate_id))
            .await?;
        let mut affiliate = self.load_affiliate(&request).await?;

        request.mark_rejected(Utc::now())?;
        affiliate.release(request.amount_requested)?;
        self.ctx
            .store
            .commit(vec![
                StoreWrite::PutWithdrawal(request.clone()),
                StoreWrite::PutAffiliate(affiliate),
            ])
            .await?;

        info!(amount = %request.amount_requested, "withdrawal rejected");
        Ok(request)
    }

    /// Loads a withdrawal. Caller holds its row lock.
    async fn load(&self, withdrawal_id: WithdrawalId) -> Result<WithdrawalRequest> {
        self.ctx
            .store
            .withdrawal(withdrawal_id)
            .await?
            .ok_or_else(|| LedgerError::validation(format!("unknown withdrawal {withdrawal_id}")))
    }

    async fn load_affiliate(&self, request: &WithdrawalRequest) -> Result<Affiliate> {
        self.ctx
            .store
            .affiliate(request.affiliate_id)
            .await?
            .ok_or_else(|| {
                LedgerError::validation(format!(
                    "withdrawal {} references unknown affiliate {}",
                    request.id, request.affiliate_id
                ))
            })
    }
}

fn ensure_pending(request: &WithdrawalRequest) -> Result<()> {
    if !request.is_pending() {
        return Err(LedgerError::InvalidStateTransition {
            withdrawal_id: request.id,
            status: request.status,
        });
    }
    Ok(())
}

fn validate_admin(admin_id: &str) -> Result<()> {
    if admin_id.trim().is_empty() {
        return Err(LedgerError::validation("admin id must not be empty"));
    }
    Ok(())
}
