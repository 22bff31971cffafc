use commission_ledger::error::LedgerError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_overdraw() {
    let (ledger, _) = common::ledger();
    ledger.directory().register(1, "A").await.unwrap();
    ledger
        .accruals()
        .record_sale(common::sale(1, 1, dec!(1000), dec!(100)))
        .await
        .unwrap();

    // 20 requests of 15 against a pending balance of 100: six fit.
    let handles: Vec<_> = (0..20)
        .map(|_| {
            let withdrawals = ledger.withdrawals();
            tokio::spawn(async move { withdrawals.create_request(1, dec!(15)).await })
        })
        .collect();

    let mut granted = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(request) => granted.push(request),
            Err(LedgerError::InsufficientBalance { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(granted.len(), 6);
    let ids: HashSet<_> = granted.iter().map(|r| r.id).collect();
    assert_eq!(ids.len(), granted.len());

    let balance = ledger.balances().affiliate_balance(1).await.unwrap();
    assert_eq!(balance.pending, dec!(10));
    common::assert_balanced(&ledger).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payouts_and_accruals() {
    let (ledger, _) = common::ledger();
    ledger.directory().register(1, "A").await.unwrap();
    ledger
        .accruals()
        .record_sale(common::sale(1, 1, dec!(1000), dec!(100)))
        .await
        .unwrap();
    let mut requests = Vec::new();
    for _ in 0..5 {
        requests.push(ledger.withdrawals().create_request(1, dec!(10)).await.unwrap());
    }

    let mut handles = Vec::new();
    for request in &requests {
        // Two admins click the same withdrawal.
        for admin in ["ops-1", "ops-2"] {
            let payouts = ledger.payouts();
            let id = request.id;
            handles.push(tokio::spawn(async move { payouts.process(id, admin).await.is_ok() }));
        }
    }
    for sale_id in 2..12 {
        let accruals = ledger.accruals();
        handles.push(tokio::spawn(async move {
            accruals
                .record_sale(common::sale(sale_id, 1, dec!(100), dec!(10)))
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }
    // Five payouts (one per withdrawal) plus ten accruals.
    assert_eq!(successes, 15);

    let affiliate = ledger.directory().get(1).await.unwrap();
    assert_eq!(affiliate.earned().value(), dec!(200));
    assert_eq!(affiliate.paid().value(), dec!(50));
    assert_eq!(affiliate.pending().value(), dec!(150));
    assert_eq!(affiliate.total_sales(), 11);

    let summary = ledger.balances().commission_summary().await.unwrap();
    assert_eq!(summary.pending_withdrawal_count, 0);
    assert_eq!(
        summary.totals.total_paid,
        requests.iter().map(|r| r.amount_requested.value()).sum::<Decimal>()
    );
    common::assert_balanced(&ledger).await;
}
