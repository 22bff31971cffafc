#![allow(dead_code)]

use commission_ledger::application::ledger::CommissionLedger;
use commission_ledger::config::LedgerConfig;
use commission_ledger::domain::commission::SaleFinalized;
use commission_ledger::infrastructure::audit::RecordingAuditSink;
use commission_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use rust_decimal::Decimal;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;

pub const HEADER: [&str; 7] = [
    "type",
    "affiliate",
    "reference",
    "amount",
    "commission",
    "actor",
    "code",
];

/// Writes a command CSV with the standard header to a temporary file.
pub fn command_file(rows: &[[&str; 7]]) -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(file.path()).unwrap();
    wtr.write_record(HEADER).unwrap();
    for row in rows {
        wtr.write_record(row).unwrap();
    }
    wtr.flush().unwrap();
    file
}

/// Registers `affiliates` affiliates and spreads `sales` sales of 10.00
/// commission across them round-robin.
pub fn generate_sales_csv(path: &Path, affiliates: u32, sales: u32) -> Result<(), Error> {
    let mut wtr = csv::WriterBuilder::new().from_path(path)?;
    wtr.write_record(HEADER)?;

    for id in 1..=affiliates {
        let code = format!("AFF{id}");
        wtr.write_record(["register", &id.to_string(), "", "", "", "", &code])?;
    }
    for sale in 1..=sales {
        let affiliate = (sale % affiliates + 1).to_string();
        wtr.write_record(["sale", &affiliate, &sale.to_string(), "100.00", "10.00", "", ""])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn ledger() -> (CommissionLedger, RecordingAuditSink) {
    let audit = RecordingAuditSink::new();
    let ledger = CommissionLedger::new(
        Arc::new(InMemoryLedgerStore::new()),
        Arc::new(audit.clone()),
        LedgerConfig::default(),
    );
    (ledger, audit)
}

pub fn sale(
    sale_id: u32,
    affiliate_id: u32,
    amount_paid: Decimal,
    commission: Decimal,
) -> SaleFinalized {
    SaleFinalized {
        sale_id,
        affiliate_id: Some(affiliate_id),
        amount_paid,
        commission_amount: commission,
    }
}

/// Checks `earned = pending + paid + reserved` for every affiliate.
pub async fn assert_balanced(ledger: &CommissionLedger) {
    let pending = ledger.withdrawals().list_pending().await.unwrap();
    for affiliate in ledger.directory().list().await.unwrap() {
        let reserved: Decimal = pending
            .iter()
            .filter(|w| w.affiliate_id == affiliate.id())
            .map(|w| w.amount_requested.value())
            .sum();
        assert_eq!(
            affiliate.earned().value(),
            affiliate.pending().value() + affiliate.paid().value() + reserved,
            "affiliate {} out of balance",
            affiliate.code()
        );
        assert!(affiliate.pending().value() >= Decimal::ZERO);
    }
}
