use super::affiliate::AffiliateId;
use super::money::Amount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type SaleId = u32;

/// Emitted by checkout when an order is finalized.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SaleFinalized {
    pub sale_id: SaleId,
    /// `None` when the sale was not referred by an affiliate.
    pub affiliate_id: Option<AffiliateId>,
    pub amount_paid: Decimal,
    pub commission_amount: Decimal,
}

/// One commission-earning event. Written once at accrual, never updated.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct CommissionEntry {
    pub sale_id: SaleId,
    pub affiliate_id: AffiliateId,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum AccrualOutcome {
    Recorded(CommissionEntry),
    /// The sale was already credited; nothing changed.
    Duplicate(SaleId),
    /// The sale carried no affiliate; nothing changed.
    NoReferral(SaleId),
}

impl AccrualOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sale_event_without_affiliate() {
        let json = r#"{"sale_id": 9, "affiliate_id": null,
            "amount_paid": "49.99", "commission_amount": "0"}"#;
        let event: SaleFinalized = serde_json::from_str(json).unwrap();
        assert_eq!(event.sale_id, 9);
        assert_eq!(event.affiliate_id, None);
        assert_eq!(event.amount_paid, dec!(49.99));
    }
}
