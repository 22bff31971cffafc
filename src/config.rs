use std::time::Duration;

/// Tunables for the ledger services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// How long a mutating operation waits for a row lock before giving up
    /// with a retryable persistence error.
    pub lock_timeout: Duration,
    /// Rows in the report's top earner list.
    pub top_earner_limit: usize,
    /// Rows in the report's recent payout list.
    pub recent_payout_limit: usize,
}

impl LedgerConfig {
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_TOP_EARNERS: usize = 10;
    pub const DEFAULT_RECENT_PAYOUTS: usize = 10;

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
            top_earner_limit: Self::DEFAULT_TOP_EARNERS,
            recent_payout_limit: Self::DEFAULT_RECENT_PAYOUTS,
        }
    }
}
