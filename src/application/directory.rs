use super::ledger::LedgerContext;
use super::locks::RowKey;
use crate::domain::affiliate::{Affiliate, AffiliateId, AffiliateStatus};
use crate::domain::ports::StoreWrite;
use crate::error::{LedgerError, Result};
use chrono::Utc;
use tracing::info;

/// Registers affiliates and changes their status. Never touches balances.
#[derive(Clone)]
pub struct AffiliateDirectory {
    ctx: LedgerContext,
}

impl AffiliateDirectory {
    pub(crate) fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    #[tracing::instrument(skip(self, code), fields(code = %code.as_ref()))]
    pub async fn register(&self, id: AffiliateId, code: impl AsRef<str>) -> Result<Affiliate> {
        let affiliate = Affiliate::new(id, code.as_ref(), Utc::now())?;
        let _registry = self.ctx.locks.acquire(RowKey::Registry).await?;
        let _row = self.ctx.locks.acquire(RowKey::Affiliate(id)).await?;

        if self.ctx.store.affiliate(id).await?.is_some() {
            return Err(LedgerError::validation(format!(
                "affiliate {id} is already registered"
            )));
        }
        let snapshot = self.ctx.store.snapshot().await?;
        if snapshot
            .affiliates
            .iter()
            .any(|a| a.code().eq_ignore_ascii_case(affiliate.code()))
        {
            return Err(LedgerError::validation(format!(
                "affiliate code {} is already taken",
                affiliate.code()
            )));
        }

        self.ctx
            .store
            .commit(vec![StoreWrite::PutAffiliate(affiliate.clone())])
            .await?;
        info!(affiliate_id = id, "affiliate registered");
        Ok(affiliate)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_status(&self, id: AffiliateId, status: AffiliateStatus) -> Result<Affiliate> {
        let _row = self.ctx.locks.acquire(RowKey::Affiliate(id)).await?;
        let mut affiliate = self.get(id).await?;
        if affiliate.status() != status {
            affiliate.set_status(status);
            self.ctx
                .store
                .commit(vec![StoreWrite::PutAffiliate(affiliate.clone())])
                .await?;
            info!(affiliate_id = id, %status, "affiliate status changed");
        }
        Ok(affiliate)
    }

    /// Every affiliate, in ascending id order.
    pub async fn list(&self) -> Result<Vec<Affiliate>> {
        let mut affiliates = self.ctx.store.snapshot().await?.affiliates;
        affiliates.sort_by_key(Affiliate::id);
        Ok(affiliates)
    }

    pub async fn get(&self, id: AffiliateId) -> Result<Affiliate> {
        self.ctx
            .store
            .affiliate(id)
            .await?
            .ok_or_else(|| LedgerError::validation(format!("unknown affiliate {id}")))
    }
}
