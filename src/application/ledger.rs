use super::accrual::CommissionRecorder;
use super::balances::BalanceAggregator;
use super::directory::AffiliateDirectory;
use super::locks::RowLocks;
use super::payouts::PayoutProcessor;
use super::report::ReportBuilder;
use super::withdrawals::WithdrawalManager;
use crate::config::LedgerConfig;
use crate::domain::audit::{AuditEvent, AuditOperation, AuditOutcome};
use crate::domain::ports::{AuditSinkRef, LedgerStoreRef};
use crate::error::Result;
use crate::infrastructure::audit::TracingAuditSink;
use crate::infrastructure::in_memory::InMemoryLedgerStore;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Everything a ledger service needs: the store, the shared row locks, the
/// audit sink and configuration. Cloning shares all of them.
#[derive(Clone)]
pub(crate) struct LedgerContext {
    pub(crate) store: LedgerStoreRef,
    pub(crate) locks: Arc<RowLocks>,
    pub(crate) audit: AuditSinkRef,
    pub(crate) config: Arc<LedgerConfig>,
}

impl LedgerContext {
    pub(crate) async fn audit(
        &self,
        actor: impl Into<String>,
        operation: AuditOperation,
        amount: Option<Decimal>,
        target: impl Into<String>,
        outcome: AuditOutcome,
    ) {
        self.audit
            .record(AuditEvent {
                actor: actor.into(),
                operation,
                amount,
                target: target.into(),
                outcome,
                at: Utc::now(),
            })
            .await;
    }
}

/// Maps an operation result onto the audit outcome vocabulary.
pub(crate) fn outcome_of<T>(result: &Result<T>) -> AuditOutcome {
    match result {
        Ok(_) => AuditOutcome::Applied,
        Err(e) if e.is_declined() => AuditOutcome::Declined(e.to_string()),
        Err(e) => AuditOutcome::Failed(e.to_string()),
    }
}

/// The main entry point of the commission ledger.
///
/// `CommissionLedger` wires one store, one row lock table and one audit sink
/// into the individual services. Every service handed out by the ledger shares
/// those, so locks taken by a payout are honoured by a concurrent withdrawal
/// request on the same affiliate.
#[derive(Clone)]
pub struct CommissionLedger {
    ctx: LedgerContext,
}

impl CommissionLedger {
    /// Creates a new `CommissionLedger`.
    ///
    /// # Arguments
    ///
    /// * `store` - Backend holding affiliates, entries, withdrawals and payouts.
    /// * `audit` - Collaborator receiving audit metadata for money movements.
    /// * `config` - Lock timeout and report sizes.
    pub fn new(store: LedgerStoreRef, audit: AuditSinkRef, config: LedgerConfig) -> Self {
        Self {
            ctx: LedgerContext {
                store,
                locks: Arc::new(RowLocks::new(config.lock_timeout)),
                audit,
                config: Arc::new(config),
            },
        }
    }

    /// An in-memory ledger that audits through `tracing`.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(TracingAuditSink),
            LedgerConfig::default(),
        )
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.ctx.config
    }

    pub fn directory(&self) -> AffiliateDirectory {
        AffiliateDirectory::new(self.ctx.clone())
    }

    pub fn accruals(&self) -> CommissionRecorder {
        CommissionRecorder::new(self.ctx.clone())
    }

    pub fn withdrawals(&self) -> WithdrawalManager {
        WithdrawalManager::new(self.ctx.clone())
    }

    pub fn payouts(&self) -> PayoutProcessor {
        PayoutProcessor::new(self.ctx.clone())
    }

    pub fn balances(&self) -> BalanceAggregator {
        BalanceAggregator::new(self.ctx.clone())
    }

    pub fn reports(&self) -> ReportBuilder {
        ReportBuilder::new(self.ctx.clone())
    }

    #[cfg(test)]
    pub(crate) fn context(&self) -> &LedgerContext {
        &self.ctx
    }
}
