use super::affiliate::{Affiliate, AffiliateId};
use super::audit::AuditEvent;
use super::commission::{CommissionEntry, SaleId};
use super::withdrawal::{PayoutRecord, WithdrawalId, WithdrawalRequest};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A single staged write. A batch of these is applied all-or-nothing by
/// [`LedgerStore::commit`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    PutAffiliate(Affiliate),
    /// Fails the whole batch if the sale id already has an entry.
    InsertEntry(CommissionEntry),
    PutWithdrawal(WithdrawalRequest),
    /// Fails the whole batch if the withdrawal already has a payout.
    InsertPayout(PayoutRecord),
}

/// Every record in the store as of one committed instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSnapshot {
    pub affiliates: Vec<Affiliate>,
    pub entries: Vec<CommissionEntry>,
    pub withdrawals: Vec<WithdrawalRequest>,
    pub payouts: Vec<PayoutRecord>,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn affiliate(&self, id: AffiliateId) -> Result<Option<Affiliate>>;
    async fn commission_entry(&self, sale_id: SaleId) -> Result<Option<CommissionEntry>>;
    async fn withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>>;
    /// Allocates the next withdrawal id. Ids are never reused, even when the
    /// transaction that drew one is rolled back.
    async fn next_withdrawal_id(&self) -> Result<WithdrawalId>;
    async fn snapshot(&self) -> Result<LedgerSnapshot>;
    async fn commit(&self, batch: Vec<StoreWrite>) -> Result<()>;
}

/// The external collaborator that receives audit metadata for every
/// money-moving operation.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent);
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type AuditSinkRef = Arc<dyn AuditSink>;
