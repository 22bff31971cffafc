use crate::domain::affiliate::{Affiliate, AffiliateId};
use crate::domain::commission::{CommissionEntry, SaleId};
use crate::domain::ports::{LedgerSnapshot, LedgerStore, StoreWrite};
use crate::domain::withdrawal::{PayoutRecord, WithdrawalId, WithdrawalRequest};
use crate::error::{PersistenceError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for affiliate rows.
pub const CF_AFFILIATES: &str = "affiliates";
/// Column Family for the immutable commission entries, keyed by sale id.
pub const CF_ENTRIES: &str = "commission_entries";
/// Column Family for withdrawal requests.
pub const CF_WITHDRAWALS: &str = "withdrawals";
/// Column Family for payout records, keyed by withdrawal id.
pub const CF_PAYOUTS: &str = "payouts";
/// Column Family for store bookkeeping such as the withdrawal id sequence.
pub const CF_META: &str = "meta";

const WITHDRAWAL_SEQUENCE_KEY: &[u8] = b"withdrawal_sequence";

/// A persistent store implementation using RocksDB.
///
/// Each record type lives in its own Column Family under a big-endian id key,
/// so iteration order matches id order. Commits go through a `WriteBatch` and
/// are atomic; snapshots read through a RocksDB snapshot.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    /// Last allocated withdrawal id. Every allocation is written through to
    /// `CF_META` before it is handed out.
    last_withdrawal_id: Arc<Mutex<u32>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist and resumes the
    /// withdrawal id sequence after the highest id ever allocated, whether or
    /// not the transaction that drew it committed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_AFFILIATES, CF_ENTRIES, CF_WITHDRAWALS, CF_PAYOUTS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;
        let mut store = Self {
            db: Arc::new(db),
            last_withdrawal_id: Arc::new(Mutex::new(0)),
        };

        let stored = store.last_key(CF_WITHDRAWALS)?.unwrap_or(0);
        let allocated = store.stored_sequence()?.unwrap_or(0);
        store.last_withdrawal_id = Arc::new(Mutex::new(stored.max(allocated)));
        Ok(store)
    }

    fn stored_sequence(&self) -> Result<Option<u32>> {
        let cf = self.cf(CF_META)?;
        match self.db.get_pinned_cf(cf, WITHDRAWAL_SEQUENCE_KEY)? {
            Some(bytes) => Ok(Some(decode_id(&bytes, CF_META)?)),
            None => Ok(None),
        }
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PersistenceError::Storage(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
            .into()
        })
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, id: u32) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn exists(&self, cf_name: &str, id: u32) -> Result<bool> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, id.to_be_bytes())?.is_some())
    }

    fn last_key(&self, cf_name: &str) -> Result<Option<u32>> {
        let cf = self.cf(cf_name)?;
        match self.db.iterator_cf(cf, IteratorMode::End).next() {
            Some(item) => {
                let (key, _) = item?;
                Ok(Some(decode_id(&key, cf_name)?))
            }
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf_name: &str,
        id: u32,
        value: &T,
    ) -> Result<()> {
        let cf = self.cf(cf_name)?;
        batch.put_cf(cf, id.to_be_bytes(), serde_json::to_vec(value)?);
        Ok(())
    }
}

fn decode_id(bytes: &[u8], cf_name: &str) -> Result<u32> {
    let bytes: [u8; 4] = bytes.try_into().map_err(|_| {
        PersistenceError::Storage(Box::new(std::io::Error::other(format!(
            "malformed id in {cf_name}"
        ))))
    })?;
    Ok(u32::from_be_bytes(bytes))
}

fn collect_cf<T: DeserializeOwned>(
    snapshot: &rocksdb::Snapshot<'_>,
    cf: &ColumnFamily,
) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for item in snapshot.iterator_cf(cf, IteratorMode::Start) {
        let (_key, value) = item?;
        records.push(serde_json::from_slice(&value)?);
    }
    Ok(records)
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn affiliate(&self, id: AffiliateId) -> Result<Option<Affiliate>> {
        self.get(CF_AFFILIATES, id)
    }

    async fn commission_entry(&self, sale_id: SaleId) -> Result<Option<CommissionEntry>> {
        self.get(CF_ENTRIES, sale_id)
    }

    async fn withdrawal(&self, id: WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        self.get(CF_WITHDRAWALS, id)
    }

    async fn next_withdrawal_id(&self) -> Result<WithdrawalId> {
        let mut last = self.last_withdrawal_id.lock().await;
        let id = last.checked_add(1).ok_or_else(|| {
            PersistenceError::Constraint("withdrawal id sequence exhausted".into())
        })?;
        let cf = self.cf(CF_META)?;
        self.db.put_cf(cf, WITHDRAWAL_SEQUENCE_KEY, id.to_be_bytes())?;
        *last = id;
        Ok(id)
    }

    async fn snapshot(&self) -> Result<LedgerSnapshot> {
        let snapshot = self.db.snapshot();
        Ok(LedgerSnapshot {
            affiliates: collect_cf(&snapshot, self.cf(CF_AFFILIATES)?)?,
            entries: collect_cf(&snapshot, self.cf(CF_ENTRIES)?)?,
            withdrawals: collect_cf(&snapshot, self.cf(CF_WITHDRAWALS)?)?,
            payouts: collect_cf(&snapshot, self.cf(CF_PAYOUTS)?)?,
        })
    }

    async fn commit(&self, writes: Vec<StoreWrite>) -> Result<()> {
        // Callers hold the row locks for every key in the batch, so these
        // existence checks cannot race with another writer.
        let mut batch = WriteBatch::default();
        for write in &writes {
            match write {
                StoreWrite::PutAffiliate(affiliate) => {
                    self.put(&mut batch, CF_AFFILIATES, affiliate.id(), affiliate)?;
                }
                StoreWrite::InsertEntry(entry) => {
                    if self.exists(CF_ENTRIES, entry.sale_id)? {
                        return Err(PersistenceError::Constraint(format!(
                            "commission entry for sale {} already exists",
                            entry.sale_id
                        ))
                        .into());
                    }
                    self.put(&mut batch, CF_ENTRIES, entry.sale_id, entry)?;
                }
                StoreWrite::PutWithdrawal(request) => {
                    self.put(&mut batch, CF_WITHDRAWALS, request.id, request)?;
                }
                StoreWrite::InsertPayout(payout) => {
                    if self.exists(CF_PAYOUTS, payout.withdrawal_id)? {
                        return Err(PersistenceError::Constraint(format!(
                            "payout for withdrawal {} already exists",
                            payout.withdrawal_id
                        ))
                        .into());
                    }
                    self.put(&mut batch, CF_PAYOUTS, payout.withdrawal_id, payout)?;
                }
            }
        }
        self.db.write(batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Amount;
    use crate::error::LedgerError;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn payout(withdrawal_id: WithdrawalId) -> PayoutRecord {
        PayoutRecord {
            withdrawal_id,
            affiliate_id: 1,
            amount: Amount::new(dec!(60)).unwrap(),
            processed_at: Utc::now(),
            processed_by: "admin".into(),
        }
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        for name in [CF_AFFILIATES, CF_ENTRIES, CF_WITHDRAWALS, CF_PAYOUTS, CF_META] {
            assert!(store.db.cf_handle(name).is_some());
        }
    }

    #[tokio::test]
    async fn test_rocksdb_commit_and_snapshot() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        let affiliate = Affiliate::new(1, "ACME", Utc::now()).unwrap();
        store
            .commit(vec![
                StoreWrite::PutAffiliate(affiliate.clone()),
                StoreWrite::InsertPayout(payout(1)),
            ])
            .await
            .unwrap();

        assert_eq!(store.affiliate(1).await.unwrap().unwrap(), affiliate);
        assert!(store.affiliate(2).await.unwrap().is_none());

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.affiliates, vec![affiliate]);
        assert_eq!(snapshot.payouts.len(), 1);
    }

    #[tokio::test]
    async fn test_rocksdb_duplicate_payout_rejected() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        store
            .commit(vec![StoreWrite::InsertPayout(payout(1))])
            .await
            .unwrap();

        let result = store.commit(vec![StoreWrite::InsertPayout(payout(1))]).await;
        assert!(matches!(
            result,
            Err(LedgerError::PersistenceError(PersistenceError::Constraint(_)))
        ));
    }

    #[tokio::test]
    async fn test_rocksdb_resumes_withdrawal_sequence() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            let id = store.next_withdrawal_id().await.unwrap();
            let request = WithdrawalRequest::new(id, 1, Amount::new(dec!(5)).unwrap(), Utc::now());
            store
                .commit(vec![StoreWrite::PutWithdrawal(request)])
                .await
                .unwrap();
        }

        let reopened = RocksDBStore::open(dir.path()).unwrap();
        assert_eq!(reopened.next_withdrawal_id().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rocksdb_never_reuses_uncommitted_ids() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            assert_eq!(store.next_withdrawal_id().await.unwrap(), 1);
            // Drawn by a transaction that never commits.
            assert_eq!(store.next_withdrawal_id().await.unwrap(), 2);
        }

        let reopened = RocksDBStore::open(dir.path()).unwrap();
        assert_eq!(reopened.next_withdrawal_id().await.unwrap(), 3);
    }
}
