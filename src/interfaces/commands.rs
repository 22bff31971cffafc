use crate::application::ledger::CommissionLedger;
use crate::domain::affiliate::{AffiliateId, AffiliateStatus};
use crate::domain::commission::{AccrualOutcome, SaleFinalized};
use crate::domain::withdrawal::WithdrawalId;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Register,
    Suspend,
    Reinstate,
    Sale,
    Request,
    Process,
    Reject,
}

/// One row of a command stream. Which columns are required depends on the
/// command type; see [`LedgerCommand`].
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct CommandRecord {
    pub r#type: CommandType,
    #[serde(default)]
    pub affiliate: Option<AffiliateId>,
    /// Sale id for `sale`, withdrawal id for `process` and `reject`.
    #[serde(default)]
    pub reference: Option<u32>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub commission: Option<Decimal>,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// A validated ledger command.
#[derive(Debug, PartialEq, Clone)]
pub enum LedgerCommand {
    Register {
        affiliate: AffiliateId,
        code: String,
    },
    SetStatus {
        affiliate: AffiliateId,
        status: AffiliateStatus,
    },
    Sale(SaleFinalized),
    Request {
        affiliate: AffiliateId,
        amount: Decimal,
    },
    Process {
        withdrawal: WithdrawalId,
        admin: String,
    },
    Reject {
        withdrawal: WithdrawalId,
        admin: String,
    },
}

fn required<T>(value: Option<T>, command: CommandType, column: &str) -> Result<T> {
    value.ok_or_else(|| {
        LedgerError::validation(format!("{command:?} command is missing column '{column}'"))
    })
}

impl TryFrom<CommandRecord> for LedgerCommand {
    type Error = LedgerError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let kind = record.r#type;
        Ok(match kind {
            CommandType::Register => Self::Register {
                affiliate: required(record.affiliate, kind, "affiliate")?,
                code: required(record.code, kind, "code")?,
            },
            CommandType::Suspend | CommandType::Reinstate => Self::SetStatus {
                affiliate: required(record.affiliate, kind, "affiliate")?,
                status: if kind == CommandType::Suspend {
                    AffiliateStatus::Suspended
                } else {
                    AffiliateStatus::Active
                },
            },
            CommandType::Sale => Self::Sale(SaleFinalized {
                sale_id: required(record.reference, kind, "reference")?,
                affiliate_id: record.affiliate,
                amount_paid: required(record.amount, kind, "amount")?,
                commission_amount: record.commission.unwrap_or(Decimal::ZERO),
            }),
            CommandType::Request => Self::Request {
                affiliate: required(record.affiliate, kind, "affiliate")?,
                amount: required(record.amount, kind, "amount")?,
            },
            CommandType::Process => Self::Process {
                withdrawal: required(record.reference, kind, "reference")?,
                admin: required(record.actor, kind, "actor")?,
            },
            CommandType::Reject => Self::Reject {
                withdrawal: required(record.reference, kind, "reference")?,
                admin: required(record.actor, kind, "actor")?,
            },
        })
    }
}

impl LedgerCommand {
    /// Applies the command and describes what happened.
    pub async fn apply(self, ledger: &CommissionLedger) -> Result<String> {
        match self {
            Self::Register { affiliate, code } => {
                let affiliate = ledger.directory().register(affiliate, code).await?;
                Ok(format!("registered affiliate {} ({})", affiliate.id(), affiliate.code()))
            }
            Self::SetStatus { affiliate, status } => {
                let affiliate = ledger.directory().set_status(affiliate, status).await?;
                Ok(format!("affiliate {} is now {}", affiliate.code(), affiliate.status()))
            }
            Self::Sale(sale) => Ok(match ledger.accruals().record_sale(sale).await? {
                AccrualOutcome::Recorded(entry) => format!(
                    "credited {} to affiliate {} for sale {}",
                    entry.amount, entry.affiliate_id, entry.sale_id
                ),
                AccrualOutcome::Duplicate(sale_id) => {
                    format!("sale {sale_id} already credited, ignored")
                }
                AccrualOutcome::NoReferral(sale_id) => {
                    format!("sale {sale_id} has no referral, nothing to credit")
                }
            }),
            Self::Request { affiliate, amount } => {
                let request = ledger.withdrawals().create_request(affiliate, amount).await?;
                Ok(format!(
                    "withdrawal #{} of {} reserved for affiliate {}",
                    request.id, request.amount_requested, affiliate
                ))
            }
            Self::Process { withdrawal, admin } => {
                let receipt = ledger.payouts().process(withdrawal, &admin).await?;
                Ok(receipt.message())
            }
            Self::Reject { withdrawal, admin } => {
                let request = ledger.payouts().reject(withdrawal, &admin).await?;
                Ok(format!(
                    "withdrawal #{} rejected, {} returned to pending",
                    request.id, request.amount_requested
                ))
            }
        }
    }
}
