//! Domain layer: ledger records, value objects and the ports the application
//! layer depends on.

pub mod affiliate;
pub mod audit;
pub mod commission;
pub mod money;
pub mod ports;
pub mod report;
pub mod withdrawal;
