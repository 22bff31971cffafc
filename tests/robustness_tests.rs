use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

#[test]
fn test_malformed_csv_handling() {
    let csv = common::command_file(&[
        ["register", "1", "", "", "", "", "ACME"],
        ["sale", "1", "1", "100", "10", "", ""],
        // Unknown command type
        ["refund", "1", "2", "", "", "", ""],
        // Request without an amount
        ["request", "1", "", "", "", "", ""],
        // Valid sale again
        ["sale", "1", "3", "200", "20", "", ""],
    ]);

    Command::new(cargo_bin!("commission-ledger"))
        .arg("replay")
        .arg(csv.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading command"))
        .stdout(predicate::str::contains("1,ACME,30.00,30.00,0.00,2,active"));
}

#[test]
fn test_invalid_data_types() {
    let csv = common::command_file(&[
        ["register", "1", "", "", "", "", "ACME"],
        // Text in commission field
        ["sale", "1", "1", "100", "ten", "", ""],
        // Non-integer affiliate id
        ["sale", "abc", "2", "100", "10", "", ""],
        // Valid sale
        ["sale", "1", "3", "50", "5", "", ""],
    ]);

    Command::new(cargo_bin!("commission-ledger"))
        .arg("replay")
        .arg(csv.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading command"))
        .stdout(predicate::str::contains("1,ACME,5.00,5.00,0.00,1,active"));
}

#[test]
fn test_declined_commands_do_not_mutate() {
    let csv = common::command_file(&[
        ["register", "1", "", "", "", "", "ACME"],
        // Duplicate code, case-insensitive
        ["register", "2", "", "", "", "", "acme"],
        ["sale", "1", "1", "100", "10", "", ""],
        // Sub-cent and zero commissions
        ["sale", "1", "2", "100", "0.001", "", ""],
        ["sale", "1", "3", "100", "0", "", ""],
        // Sale for an unregistered affiliate
        ["sale", "9", "4", "100", "10", "", ""],
        // Over-withdrawal and negative withdrawal
        ["request", "1", "", "10.01", "", "", ""],
        ["request", "1", "", "-1", "", "", ""],
        // Blank admin on an unknown withdrawal
        ["process", "", "7", "", "", " ", ""],
    ]);

    Command::new(cargo_bin!("commission-ledger"))
        .arg("replay")
        .arg(csv.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error processing command"))
        .stdout(predicate::str::contains("1,ACME,10.00,10.00,0.00,1,active"))
        .stdout(predicate::str::contains(",acme,").not());
}

#[test]
fn test_suspended_affiliate_keeps_accruing_but_cannot_withdraw() {
    let csv = common::command_file(&[
        ["register", "1", "", "", "", "", "ACME"],
        ["suspend", "1", "", "", "", "", ""],
        ["sale", "1", "1", "100", "10", "", ""],
        ["request", "1", "", "5", "", "", ""],
    ]);

    Command::new(cargo_bin!("commission-ledger"))
        .arg("replay")
        .arg(csv.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("cannot request withdrawals"))
        .stdout(predicate::str::contains("1,ACME,10.00,10.00,0.00,1,suspended"));
}

#[test]
fn test_rejected_withdrawal_restores_pending() {
    let csv = common::command_file(&[
        ["register", "1", "", "", "", "", "ACME"],
        ["sale", "1", "1", "100", "10", "", ""],
        ["request", "1", "", "7.50", "", "", ""],
        ["reject", "", "1", "", "", "ops", ""],
        // Already rejected
        ["process", "", "1", "", "", "ops", ""],
    ]);

    Command::new(cargo_bin!("commission-ledger"))
        .arg("replay")
        .arg(csv.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("already processed or invalid state (rejected)"))
        .stdout(predicate::str::contains("1,ACME,10.00,10.00,0.00,1,active"));
}

#[test]
fn test_large_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sales.csv");
    common::generate_sales_csv(&path, 5, 5_000).expect("Failed to generate sales CSV");

    Command::new(cargo_bin!("commission-ledger"))
        .arg("replay")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1,AFF1,10000.00,10000.00,0.00,1000,active"));
}
