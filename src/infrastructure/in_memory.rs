use crate::domain::affiliate::{Affiliate, AffiliateId};
use crate::domain::commission::{CommissionEntry, SaleId};
use crate::domain::ports::{LedgerSnapshot, LedgerStore, StoreWrite};
use crate::domain::withdrawal::{PayoutRecord, WithdrawalId, WithdrawalRequest};
use crate::error::{PersistenceError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    affiliates: BTreeMap<AffiliateId, Affiliate>,
    entries: BTreeMap<SaleId, CommissionEntry>,
    withdrawals: BTreeMap<WithdrawalId, WithdrawalRequest>,
    payouts: BTreeMap<WithdrawalId, PayoutRecord>,
}

/// A thread-safe in-memory ledger store.
///
/// All tables live behind one `Arc<RwLock<_>>`, so a commit is a single write
/// critical section and a snapshot a single read. Ideal for tests or
/// deployments where persistence is handled elsewhere.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
    last_withdrawal_id: Arc<AtomicU32>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn affiliate(&self, id: AffiliateId) -> Result<Option<Affiliate>> {
        let state = self.state.read().await;
        Ok(state.affiliates.get(&id).cloned())
    }

    async fn commission_entry(&self, sale_id: SaleId) -> Result<Option<CommissionEntry>> {
        let state = self.state.read().await;
        Ok(state.entries.get(&sale_id).cloned())
    }

    async fn withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        let state = self.state.read().await;
        Ok(state.withdrawals.get(&id).cloned())
    }

    async fn next_withdrawal_id(&self) -> Result<WithdrawalId> {
        Ok(self.last_withdrawal_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn snapshot(&self) -> Result<LedgerSnapshot> {
        let state = self.state.read().await;
        Ok(LedgerSnapshot {
            affiliates: state.affiliates.values().cloned().collect(),
            entries: state.entries.values().cloned().collect(),
            withdrawals: state.withdrawals.values().cloned().collect(),
            payouts: state.payouts.values().cloned().collect(),
        })
    }

    async fn commit(&self, batch: Vec<StoreWrite>) -> Result<()> {
        let mut state = self.state.write().await;

        // Check unique constraints for the whole batch before applying anything.
        let mut sales = HashSet::new();
        let mut paid_out = HashSet::new();
        for write in &batch {
            match write {
                StoreWrite::InsertEntry(entry) => {
                    if state.entries.contains_key(&entry.sale_id) || !sales.insert(entry.sale_id)
                    {
                        return Err(PersistenceError::Constraint(format!(
                            "commission entry for sale {} already exists",
                            entry.sale_id
                        ))
                        .into());
                    }
                }
                StoreWrite::InsertPayout(payout) => {
                    if state.payouts.contains_key(&payout.withdrawal_id)
                        || !paid_out.insert(payout.withdrawal_id)
                    {
                        return Err(PersistenceError::Constraint(format!(
                            "payout for withdrawal {} already exists",
                            payout.withdrawal_id
                        ))
                        .into());
                    }
                }
                StoreWrite::PutAffiliate(_) | StoreWrite::PutWithdrawal(_) => {}
            }
        }

        for write in batch {
            match write {
                StoreWrite::PutAffiliate(affiliate) => {
                    state.affiliates.insert(affiliate.id(), affiliate);
                }
                StoreWrite::InsertEntry(entry) => {
                    state.entries.insert(entry.sale_id, entry);
                }
                StoreWrite::PutWithdrawal(request) => {
                    state.withdrawals.insert(request.id, request);
                }
                StoreWrite::InsertPayout(payout) => {
                    state.payouts.insert(payout.withdrawal_id, payout);
                }
            }
        }
        Ok(())
    }
}
