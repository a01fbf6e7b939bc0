//! Greedy settlement planning.
//!
//! The plan is advisory: it is derived from the current balances on demand
//! and never stored. The greedy pairing keeps the number of transfers low
//! but is not guaranteed to be globally minimal.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{Balances, Money};

/// One suggested payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: Money,
}

struct Party<'a> {
    member_id: &'a str,
    remaining: Money,
}

/// Largest amount first, ties broken by member id.
fn by_amount_then_id(a: &Party<'_>, b: &Party<'_>) -> Ordering {
    b.remaining
        .cmp(&a.remaining)
        .then_with(|| a.member_id.cmp(b.member_id))
}

/// Plans transfers that bring every balance to within one cent of zero.
///
/// Members whose balance is within [`Money::TOLERANCE`] of zero are treated as
/// settled. The largest debtor repeatedly pays the largest creditor
/// `min(debt, credit)` until one side runs out.
pub fn plan(balances: &Balances) -> Vec<Transfer> {
    let mut debtors: Vec<Party<'_>> = Vec::new();
    let mut creditors: Vec<Party<'_>> = Vec::new();
    for (member_id, balance) in balances.iter() {
        if balance < -Money::TOLERANCE {
            debtors.push(Party {
                member_id,
                remaining: balance.abs(),
            });
        } else if balance > Money::TOLERANCE {
            creditors.push(Party {
                member_id,
                remaining: balance,
            });
        }
    }
    debtors.sort_by(by_amount_then_id);
    creditors.sort_by(by_amount_then_id);

    let mut transfers = Vec::new();
    let (mut d, mut c) = (0, 0);
    while d < debtors.len() && c < creditors.len() {
        let amount = debtors[d].remaining.min(creditors[c].remaining);
        transfers.push(Transfer {
            from: debtors[d].member_id.to_string(),
            to: creditors[c].member_id.to_string(),
            amount,
        });
        debtors[d].remaining -= amount;
        creditors[c].remaining -= amount;
        if debtors[d].remaining < Money::TOLERANCE {
            d += 1;
        }
        if creditors[c].remaining < Money::TOLERANCE {
            c += 1;
        }
    }

    tracing::debug!(
        "settlement plan: {} transfers across {} members",
        transfers.len(),
        balances.len()
    );
    transfers
}
