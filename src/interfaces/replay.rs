use crate::application::ledger::CommissionLedger;
use crate::interfaces::commands::LedgerCommand;
use crate::interfaces::csv::command_reader::CommandReader;
use std::io::Read;
use tracing::{error, warn};

/// How a command stream went, row by row.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    /// Unreadable rows and commands refused by a business rule.
    pub skipped: usize,
    /// Commands that hit a storage failure and were rolled back. Resubmitting
    /// them may succeed.
    pub failed: usize,
}

impl ReplaySummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Applies every readable row in order. Unreadable rows and declined
/// commands are logged and skipped; storage failures are logged at `error`
/// and counted separately.
pub async fn replay<R: Read>(ledger: &CommissionLedger, reader: CommandReader<R>) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    for (row, record) in reader.records().enumerate() {
        let row = row + 1;
        let command = match record.and_then(LedgerCommand::try_from) {
            Ok(command) => command,
            Err(e) => {
                warn!(row, "Error reading command: {}", e);
                summary.skipped += 1;
                continue;
            }
        };
        match command.apply(ledger).await {
            Ok(_) => summary.applied += 1,
            Err(e) if e.is_retryable() => {
                error!(row, "Error processing command (retryable): {}", e);
                summary.failed += 1;
            }
            Err(e) => {
                warn!(row, "Error processing command: {}", e);
                summary.skipped += 1;
            }
        }
    }
    summary
}
