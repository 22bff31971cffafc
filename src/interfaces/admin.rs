use crate::application::ledger::CommissionLedger;
use crate::domain::withdrawal::WithdrawalId;
use serde::{Deserialize, Serialize};

/// An administrator action, tagged by `op` on the wire:
/// `{"op":"process_payout","withdrawal_id":1,"admin_id":"ops"}`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AdminAction {
    ProcessPayout {
        withdrawal_id: WithdrawalId,
        admin_id: String,
    },
    RejectWithdrawal {
        withdrawal_id: WithdrawalId,
        admin_id: String,
    },
}

/// What the admin screen shows after an action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    /// Set when the action failed in storage and may be resubmitted as is.
    pub retryable: bool,
}

impl ActionOutcome {
    fn succeeded(message: String) -> Self {
        Self {
            success: true,
            message,
            retryable: false,
        }
    }
}

/// Runs an admin action. Failures are reported in the outcome, never raised,
/// so a repeated click on an already processed withdrawal simply answers
/// with a failure message.
pub async fn handle(ledger: &CommissionLedger, action: AdminAction) -> ActionOutcome {
    let result = match action {
        AdminAction::ProcessPayout {
            withdrawal_id,
            admin_id,
        } => ledger
            .payouts()
            .process(withdrawal_id, &admin_id)
            .await
            .map(|receipt| receipt.message()),
        AdminAction::RejectWithdrawal {
            withdrawal_id,
            admin_id,
        } => ledger
            .payouts()
            .reject(withdrawal_id, &admin_id)
            .await
            .map(|request| {
                format!(
                    "Rejected withdrawal #{}, {} returned to pending",
                    request.id, request.amount_requested
                )
            }),
    };
    match result {
        Ok(message) => ActionOutcome::succeeded(message),
        Err(e) => ActionOutcome {
            success: false,
            retryable: e.is_retryable(),
            message: e.to_string(),
        },
    }
}
