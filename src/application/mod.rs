//! Application layer: the ledger services.
//!
//! [`ledger::CommissionLedger`] is the entry point. It shares one store, one
//! row lock table and one audit sink between the accrual recorder, the
//! withdrawal manager, the payout processor and the read-side aggregator and
//! report builder. Only the accrual, withdrawal and payout services change
//! affiliate balances.

pub mod accrual;
pub mod balances;
pub mod directory;
pub mod ledger;
pub mod locks;
pub mod payouts;
mod projections;
pub mod report;
pub mod withdrawals;
