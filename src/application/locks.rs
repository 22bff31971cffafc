use crate::domain::affiliate::AffiliateId;
use crate::domain::commission::SaleId;
use crate::domain::withdrawal::WithdrawalId;
use crate::error::{PersistenceError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Idle lock entries are pruned once the table grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

/// A lockable ledger row.
///
/// Operations that need two rows take the registry, sale or withdrawal row
/// first and the affiliate row second. Nothing ever locks an affiliate and then
/// another row, so lock waits cannot form a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKey {
    /// The affiliate code namespace. Held while a registration checks that its
    /// code is free.
    Registry,
    Sale(SaleId),
    Withdrawal(WithdrawalId),
    Affiliate(AffiliateId),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry => f.write_str("registry"),
            Self::Sale(id) => write!(f, "sale:{id}"),
            Self::Withdrawal(id) => write!(f, "withdrawal:{id}"),
            Self::Affiliate(id) => write!(f, "affiliate:{id}"),
        }
    }
}

/// Holds a row exclusively until dropped.
#[derive(Debug)]
pub struct RowGuard {
    key: RowKey,
    _guard: OwnedMutexGuard<()>,
}

impl RowGuard {
    pub fn key(&self) -> RowKey {
        self.key
    }
}

/// Table of per-row async mutexes with a bounded wait.
#[derive(Debug)]
pub struct RowLocks {
    rows: Mutex<HashMap<RowKey, Arc<Mutex<()>>>>,
    timeout: Duration,
}

impl RowLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Waits up to the configured timeout for exclusive access to `key`.
    pub async fn acquire(&self, key: RowKey) -> Result<RowGuard> {
        let row = {
            let mut rows = self.rows.lock().await;
            if rows.len() > PRUNE_THRESHOLD {
                rows.retain(|_, row| Arc::strong_count(row) > 1);
            }
            rows.entry(key).or_default().clone()
        };

        match tokio::time::timeout(self.timeout, row.lock_owned()).await {
            Ok(guard) => Ok(RowGuard { key, _guard: guard }),
            Err(_) => {
                tracing::warn!(
                    row = %key,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "lock wait timed out"
                );
                Err(PersistenceError::LockTimeout(key.to_string()).into())
            }
        }
    }
}
