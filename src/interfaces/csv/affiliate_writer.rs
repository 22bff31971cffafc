use crate::domain::affiliate::Affiliate;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct AffiliateRow<'a> {
    affiliate: u32,
    code: &'a str,
    earned: String,
    pending: String,
    paid: String,
    total_sales: u64,
    status: String,
}

fn currency(value: Decimal) -> String {
    format!("{:.2}", value)
}

impl<'a> From<&'a Affiliate> for AffiliateRow<'a> {
    fn from(affiliate: &'a Affiliate) -> Self {
        Self {
            affiliate: affiliate.id(),
            code: affiliate.code(),
            earned: currency(affiliate.earned().value()),
            pending: currency(affiliate.pending().value()),
            paid: currency(affiliate.paid().value()),
            total_sales: affiliate.total_sales(),
            status: affiliate.status().to_string(),
        }
    }
}

/// Writes affiliate balances as CSV with two-decimal amounts.
pub struct AffiliateWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AffiliateWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_affiliates<'a>(
        &mut self,
        affiliates: impl IntoIterator<Item = &'a Affiliate>,
    ) -> Result<()> {
        for affiliate in affiliates {
            self.writer.serialize(AffiliateRow::from(affiliate))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
