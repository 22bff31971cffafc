use super::money::{Amount, Balance};
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type AffiliateId = u32;

/// Longest affiliate code accepted at registration.
pub const MAX_CODE_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AffiliateStatus {
    Active,
    Suspended,
}

impl fmt::Display for AffiliateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Suspended => f.write_str("suspended"),
        }
    }
}

/// A referral partner and its materialized commission balances.
///
/// The balance fields are private: they move only through [`Affiliate::accrue`],
/// [`Affiliate::reserve`], [`Affiliate::settle`] and [`Affiliate::release`], which
/// are crate-private and called exclusively by the accrual, withdrawal and
/// payout services. At every commit the balances satisfy
/// `earned = pending + paid + reserved`, where `reserved` is the sum of the
/// affiliate's pending withdrawal requests.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Affiliate {
    id: AffiliateId,
    code: String,
    commission_earned: Balance,
    commission_pending: Balance,
    commission_paid: Balance,
    total_sales: u64,
    status: AffiliateStatus,
    created_at: DateTime<Utc>,
}

impl Affiliate {
    /// Creates an active affiliate with zeroed balances.
    pub fn new(
        id: AffiliateId,
        code: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let code = code.into();
        validate_code(&code)?;
        Ok(Self {
            id,
            code,
            commission_earned: Balance::ZERO,
            commission_pending: Balance::ZERO,
            commission_paid: Balance::ZERO,
            total_sales: 0,
            status: AffiliateStatus::Active,
            created_at,
        })
    }

    pub fn id(&self) -> AffiliateId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn earned(&self) -> Balance {
        self.commission_earned
    }

    pub fn pending(&self) -> Balance {
        self.commission_pending
    }

    pub fn paid(&self) -> Balance {
        self.commission_paid
    }

    pub fn total_sales(&self) -> u64 {
        self.total_sales
    }

    pub fn status(&self) -> AffiliateStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_active(&self) -> bool {
        self.status == AffiliateStatus::Active
    }

    pub(crate) fn set_status(&mut self, status: AffiliateStatus) {
        self.status = status;
    }

    /// Credits a commission: earned and pending both grow by `amount`.
    /// Declines without changing anything if either balance would overflow.
    pub(crate) fn accrue(&mut self, amount: Amount) -> Result<()> {
        let earned = self.commission_earned.checked_add(amount)?;
        let pending = self.commission_pending.checked_add(amount)?;
        self.commission_earned = earned;
        self.commission_pending = pending;
        self.total_sales += 1;
        Ok(())
    }

    /// Earmarks `amount` of the pending balance for a withdrawal request.
    pub(crate) fn reserve(&mut self, amount: Amount) -> Result<()> {
        if !self.commission_pending.covers(amount) {
            return Err(LedgerError::InsufficientBalance {
                requested: amount.value(),
                pending: self.commission_pending.value(),
            });
        }
        self.commission_pending -= amount;
        Ok(())
    }

    /// Pays out a reservation. Pending was already reduced by [`Affiliate::reserve`].
    pub(crate) fn settle(&mut self, amount: Amount) -> Result<()> {
        self.commission_paid = self.commission_paid.checked_add(amount)?;
        Ok(())
    }

    /// Returns a rejected reservation to the pending balance.
    pub(crate) fn release(&mut self, amount: Amount) -> Result<()> {
        self.commission_pending = self.commission_pending.checked_add(amount)?;
        Ok(())
    }
}

fn validate_code(code: &str) -> Result<()> {
    if code.is_empty() {
        return Err(LedgerError::validation("affiliate code must not be empty"));
    }
    if code.len() > MAX_CODE_LEN {
        return Err(LedgerError::validation(format!(
            "affiliate code must be at most {MAX_CODE_LEN} characters"
        )));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LedgerError::validation(format!(
            "affiliate code {code:?} may only contain letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}
