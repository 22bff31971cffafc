//! Pure derivations over a [`LedgerSnapshot`]. Shared by the balance
//! aggregator, the report builder and the withdrawal queue listing so that
//! every reader orders and joins rows the same way.

use crate::domain::affiliate::{Affiliate, AffiliateId};
use crate::domain::money::Balance;
use crate::domain::ports::LedgerSnapshot;
use crate::domain::report::{
    AffiliateBalance, BalanceDrift, CommissionTotals, PayoutRow, TopEarnerRow, WithdrawalRow,
};
use crate::domain::withdrawal::WithdrawalRequest;
use std::collections::HashMap;

pub(crate) fn balance_of(affiliate: &Affiliate) -> AffiliateBalance {
    AffiliateBalance {
        earned: affiliate.earned().value(),
        pending: affiliate.pending().value(),
        paid: affiliate.paid().value(),
    }
}

fn codes(snapshot: &LedgerSnapshot) -> HashMap<AffiliateId, &str> {
    snapshot
        .affiliates
        .iter()
        .map(|a| (a.id(), a.code()))
        .collect()
}

pub(crate) fn totals(snapshot: &LedgerSnapshot) -> CommissionTotals {
    let sum =
        |f: fn(&Affiliate) -> Balance| -> Balance { snapshot.affiliates.iter().map(f).sum() };
    CommissionTotals {
        total_pending: sum(Affiliate::pending).value(),
        total_earned: sum(Affiliate::earned).value(),
        total_paid: sum(Affiliate::paid).value(),
    }
}

/// Highest earners first; equal earnings fall back to ascending id.
pub(crate) fn top_earners(snapshot: &LedgerSnapshot, limit: usize) -> Vec<TopEarnerRow> {
    let mut ranked: Vec<&Affiliate> = snapshot.affiliates.iter().collect();
    ranked.sort_by(|a, b| b.earned().cmp(&a.earned()).then(a.id().cmp(&b.id())));
    ranked
        .into_iter()
        .take(limit)
        .map(|a| TopEarnerRow {
            code: a.code().to_string(),
            commission_earned: a.earned().value(),
            commission_pending: a.pending().value(),
            total_sales: a.total_sales(),
        })
        .collect()
}

/// Pending requests, oldest first.
pub(crate) fn pending_requests(snapshot: &LedgerSnapshot) -> Vec<WithdrawalRequest> {
    let mut pending: Vec<WithdrawalRequest> = snapshot
        .withdrawals
        .iter()
        .filter(|w| w.is_pending())
        .cloned()
        .collect();
    pending.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then(a.id.cmp(&b.id)));
    pending
}

pub(crate) fn pending_withdrawal_rows(snapshot: &LedgerSnapshot) -> Vec<WithdrawalRow> {
    let codes = codes(snapshot);
    pending_requests(snapshot)
        .into_iter()
        .filter_map(|w| {
            let code = codes.get(&w.affiliate_id)?;
            Some(WithdrawalRow {
                withdrawal_id: w.id,
                code: code.to_string(),
                amount_requested: w.amount_requested.value(),
                requested_at: w.requested_at,
            })
        })
        .collect()
}

/// Latest payouts first, at most `limit` of them.
pub(crate) fn recent_payouts(snapshot: &LedgerSnapshot, limit: usize) -> Vec<PayoutRow> {
    let codes = codes(snapshot);
    let mut payouts: Vec<_> = snapshot.payouts.iter().collect();
    payouts.sort_by(|a, b| {
        b.processed_at
            .cmp(&a.processed_at)
            .then(b.withdrawal_id.cmp(&a.withdrawal_id))
    });
    payouts
        .into_iter()
        .filter_map(|p| {
            let code = codes.get(&p.affiliate_id)?;
            Some(PayoutRow {
                withdrawal_id: p.withdrawal_id,
                code: code.to_string(),
                amount_requested: p.amount.value(),
                processed_at: p.processed_at,
                processed_by: p.processed_by.clone(),
            })
        })
        .take(limit)
        .collect()
}

#[derive(Default)]
struct Derived {
    earned: Balance,
    paid: Balance,
    reserved: Balance,
    sales: u64,
}

/// Re-derives every affiliate's balances from the ledger records and returns
/// the affiliates whose materialized values disagree.
pub(crate) fn reconcile(snapshot: &LedgerSnapshot) -> Vec<BalanceDrift> {
    let mut derived: HashMap<AffiliateId, Derived> = HashMap::new();
    for entry in &snapshot.entries {
        let d = derived.entry(entry.affiliate_id).or_default();
        d.earned = d.earned + Balance::from(entry.amount);
        d.sales += 1;
    }
    for payout in &snapshot.payouts {
        let d = derived.entry(payout.affiliate_id).or_default();
        d.paid = d.paid + Balance::from(payout.amount);
    }
    for request in snapshot.withdrawals.iter().filter(|w| w.is_pending()) {
        let d = derived.entry(request.affiliate_id).or_default();
        d.reserved = d.reserved + Balance::from(request.amount_requested);
    }

    snapshot
        .affiliates
        .iter()
        .filter_map(|affiliate| {
            let d = derived.remove(&affiliate.id()).unwrap_or_default();
            let expected = AffiliateBalance {
                earned: d.earned.value(),
                pending: (d.earned - d.paid - d.reserved).value(),
                paid: d.paid.value(),
            };
            let recorded = balance_of(affiliate);
            if recorded == expected && affiliate.total_sales() == d.sales {
                return None;
            }
            Some(BalanceDrift {
                affiliate_id: affiliate.id(),
                code: affiliate.code().to_string(),
                recorded,
                derived: expected,
                recorded_sales: affiliate.total_sales(),
                derived_sales: d.sales,
            })
        })
        .collect()
}
