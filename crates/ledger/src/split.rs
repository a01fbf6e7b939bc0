//! Split calculation.
//!
//! Turns an expense (total, payers, participants and a [`SplitMethod`]) into
//! per-member owed amounts. Every method follows the same remainder policy:
//! shares are rounded to cents independently and the last member of a
//! deterministically ordered list absorbs whatever is left, so the
//! allocations always sum to the expense amount exactly.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    LedgerError, Money, ResultLedger,
    money::{absorb_remainder, amount_too_large, checked_sum, floor_cents, round_cents},
};

/// A member paired with an amount (paid, owed or delta depending on context).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAmount {
    pub member_id: String,
    pub amount: Money,
}

impl MemberAmount {
    pub fn new(member_id: impl Into<String>, amount: Money) -> Self {
        Self {
            member_id: member_id.into(),
            amount,
        }
    }
}

/// How an expense is divided among its participants.
///
/// Details are keyed by member id. Percentages are in `0..=100`, shares are
/// arbitrary non-negative weights and exact amounts are in major units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "details", rename_all = "snake_case")]
pub enum SplitMethod {
    Equal,
    Percentage(BTreeMap<String, Decimal>),
    Shares(BTreeMap<String, Decimal>),
    Exact(BTreeMap<String, Decimal>),
}

impl SplitMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Percentage(_) => "percentage",
            Self::Shares(_) => "shares",
            Self::Exact(_) => "exact",
        }
    }

    fn details(&self) -> Option<&BTreeMap<String, Decimal>> {
        match self {
            Self::Equal => None,
            Self::Percentage(details) | Self::Shares(details) | Self::Exact(details) => {
                Some(details)
            }
        }
    }

    /// Checks the method-specific input against the expense before any
    /// allocation happens.
    ///
    /// - percentages must sum to 100 (±0.01)
    /// - shares must have a positive total
    /// - exact amounts must sum to `amount` (±0.01)
    ///
    /// All values must be non-negative, every participant needs an entry and
    /// no entry may name a non-participant.
    pub fn validate(&self, amount: Money, participants: &[String]) -> ResultLedger<()> {
        let Some(details) = self.details() else {
            return Ok(());
        };
        let label = self.as_str();

        for (member_id, value) in details {
            if !participants.iter().any(|p| p == member_id) {
                return Err(LedgerError::InvalidSplit(format!(
                    "{label} given for non-participant {member_id}"
                )));
            }
            if value.is_sign_negative() && !value.is_zero() {
                return Err(LedgerError::InvalidSplit(format!(
                    "{label} for {member_id} must not be negative"
                )));
            }
        }
        for participant in participants {
            if !details.contains_key(participant) {
                return Err(LedgerError::InvalidSplit(format!(
                    "missing {label} for {participant}"
                )));
            }
        }

        let total = decimal_total(details.values().copied(), label)?;
        let tolerance = Money::TOLERANCE.to_decimal();
        match self {
            Self::Equal => Ok(()),
            Self::Percentage(_) => {
                if (total - Decimal::ONE_HUNDRED).abs() > tolerance {
                    return Err(LedgerError::InvalidSplit(format!(
                        "percentages must sum to 100, got {total}"
                    )));
                }
                Ok(())
            }
            Self::Shares(_) => {
                if total <= Decimal::ZERO {
                    return Err(LedgerError::InvalidSplit(
                        "total shares must be > 0".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Exact(_) => {
                if (total - amount.to_decimal()).abs() > tolerance {
                    return Err(LedgerError::InvalidSplit(format!(
                        "exact amounts sum to {total}, expected {amount}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Where the rounding remainder lands when payers also participate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicy {
    /// Payers are ordinary participants; the last participant in the order
    /// supplied absorbs the remainder.
    #[default]
    LastParticipant,
    /// Non-paying participants are allocated first from the method's
    /// distribution over all participants; paying participants then split
    /// the residual among themselves by their own relative weights.
    PayersAbsorbResidual,
}

#[derive(Clone, Copy, Debug)]
pub struct SplitRequest<'a> {
    pub amount: Money,
    pub payers: &'a [MemberAmount],
    pub participants: &'a [String],
    pub method: &'a SplitMethod,
}

/// An exact figure the calculator had to move so the split sums to the total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactAdjustment {
    pub member_id: String,
    pub requested: Money,
    pub allocated: Money,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Participants in the order supplied, followed by payers that do not
    /// participate (allocated zero).
    pub allocations: Vec<MemberAmount>,
    pub adjustments: Vec<ExactAdjustment>,
}

impl SplitOutcome {
    pub fn total(&self) -> Money {
        self.allocations.iter().map(|a| a.amount).sum()
    }

    pub fn owed_by(&self, member_id: &str) -> Option<Money> {
        self.allocations
            .iter()
            .find(|a| a.member_id == member_id)
            .map(|a| a.amount)
    }
}

/// Validates the payer list and moves any drift (at most one cent) onto the
/// last payer so the paid amounts sum to `amount` exactly.
pub fn normalize_payers(amount: Money, payers: &[MemberAmount]) -> ResultLedger<Vec<MemberAmount>> {
    if payers.is_empty() {
        return Err(LedgerError::InvalidAmount(
            "at least one payer is required".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(payers.len());
    for payer in payers {
        if payer.member_id.trim().is_empty() {
            return Err(LedgerError::InvalidMember(
                "payer id must not be empty".to_string(),
            ));
        }
        if !seen.insert(payer.member_id.as_str()) {
            return Err(LedgerError::InvalidAmount(format!(
                "duplicate payer: {}",
                payer.member_id
            )));
        }
        if !payer.amount.is_positive() {
            return Err(LedgerError::InvalidAmount(format!(
                "paid amount for {} must be > 0",
                payer.member_id
            )));
        }
    }

    let paid = checked_sum(payers.iter().map(|p| p.amount))?;
    if !paid.within_tolerance(amount) {
        return Err(LedgerError::InvalidAmount(format!(
            "payers total {paid} does not match amount {amount}"
        )));
    }

    let mut amounts: Vec<Money> = payers.iter().map(|p| p.amount).collect();
    absorb_remainder(amount, &mut amounts)?;
    if amounts.iter().any(|a| !a.is_positive()) {
        return Err(LedgerError::InvalidAmount(
            "paid amounts must be > 0".to_string(),
        ));
    }

    Ok(payers
        .iter()
        .zip(amounts)
        .map(|(payer, amount)| MemberAmount::new(payer.member_id.clone(), amount))
        .collect())
}

/// Computes the owed amount of every participant (and a zero entry for
/// payers who do not participate).
///
/// Fails without partial output on a non-positive amount, an empty or
/// duplicated participant list, payers that do not sum to the amount within
/// one cent, or a missing method detail.
pub fn allocate(request: &SplitRequest<'_>, policy: AllocationPolicy) -> ResultLedger<SplitOutcome> {
    validate_request(request)?;
    let weights = participant_weights(request)?;

    let owed = match policy {
        AllocationPolicy::LastParticipant => {
            distribute(request.amount, request.method, &weights)?
        }
        AllocationPolicy::PayersAbsorbResidual => residual_split(request, &weights)?,
    };

    let mut adjustments = Vec::new();
    if let SplitMethod::Exact(_) = request.method {
        for ((member_id, requested), allocated) in
            request.participants.iter().zip(&weights).zip(&owed)
        {
            let requested = round_cents(*requested)?;
            if requested != *allocated {
                adjustments.push(ExactAdjustment {
                    member_id: member_id.clone(),
                    requested,
                    allocated: *allocated,
                });
            }
        }
    }

    let mut allocations: Vec<MemberAmount> = request
        .participants
        .iter()
        .zip(owed)
        .map(|(member_id, amount)| MemberAmount::new(member_id.clone(), amount))
        .collect();
    for payer in request.payers {
        if !request.participants.contains(&payer.member_id) {
            allocations.push(MemberAmount::new(payer.member_id.clone(), Money::ZERO));
        }
    }

    Ok(SplitOutcome {
        allocations,
        adjustments,
    })
}

fn validate_request(request: &SplitRequest<'_>) -> ResultLedger<()> {
    if !request.amount.is_positive() {
        return Err(LedgerError::InvalidAmount("amount must be > 0".to_string()));
    }
    if request.participants.is_empty() {
        return Err(LedgerError::InvalidSplit(
            "at least one participant is required".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(request.participants.len());
    for participant in request.participants {
        if participant.trim().is_empty() {
            return Err(LedgerError::InvalidMember(
                "participant id must not be empty".to_string(),
            ));
        }
        if !seen.insert(participant.as_str()) {
            return Err(LedgerError::InvalidSplit(format!(
                "duplicate participant: {participant}"
            )));
        }
    }
    // Same checks as normalization; the normalized list is discarded here.
    normalize_payers(request.amount, request.payers).map(|_| ())
}

fn participant_weights(request: &SplitRequest<'_>) -> ResultLedger<Vec<Decimal>> {
    let Some(details) = request.method.details() else {
        return Ok(vec![Decimal::ONE; request.participants.len()]);
    };
    request
        .participants
        .iter()
        .map(|participant| {
            details.get(participant).copied().ok_or_else(|| {
                LedgerError::InvalidSplit(format!(
                    "missing {} for {participant}",
                    request.method.as_str()
                ))
            })
        })
        .collect()
}

fn decimal_total(values: impl IntoIterator<Item = Decimal>, label: &str) -> ResultLedger<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .ok_or_else(|| LedgerError::InvalidSplit(format!("{label} total too large")))
}

/// `total * weight / denominator`, rounded to cents.
fn weighted_share(total: Decimal, weight: Decimal, denominator: Decimal) -> ResultLedger<Money> {
    let share = total
        .checked_mul(weight)
        .and_then(|product| product.checked_div(denominator))
        .ok_or_else(|| LedgerError::InvalidSplit("split weight too large".to_string()))?;
    round_cents(share)
}

/// Per-member amounts before the remainder is absorbed.
fn base_shares(total: Money, method: &SplitMethod, weights: &[Decimal]) -> ResultLedger<Vec<Money>> {
    let total_dec = total.to_decimal();
    match method {
        SplitMethod::Equal => {
            let count = Decimal::from(weights.len());
            let share = floor_cents(total_dec / count)?;
            Ok(vec![share; weights.len()])
        }
        SplitMethod::Percentage(_) => weights
            .iter()
            .map(|pct| weighted_share(total_dec, *pct, Decimal::ONE_HUNDRED))
            .collect(),
        SplitMethod::Shares(_) => {
            let total_shares = decimal_total(weights.iter().copied(), "shares")?;
            if total_shares.is_zero() {
                return Err(LedgerError::InvalidSplit(
                    "total shares must be > 0".to_string(),
                ));
            }
            weights
                .iter()
                .map(|shares| weighted_share(total_dec, *shares, total_shares))
                .collect()
        }
        SplitMethod::Exact(_) => weights.iter().map(|exact| round_cents(*exact)).collect(),
    }
}

fn distribute(total: Money, method: &SplitMethod, weights: &[Decimal]) -> ResultLedger<Vec<Money>> {
    let mut owed = base_shares(total, method, weights)?;
    absorb_remainder(total, &mut owed)?;
    Ok(owed)
}

fn equal_split(total: Money, count: usize) -> ResultLedger<Vec<Money>> {
    distribute(total, &SplitMethod::Equal, &vec![Decimal::ONE; count])
}

/// Splits `total` proportionally to `weights`, equally when they are all 0.
fn proportional_split(total: Money, weights: &[Decimal]) -> ResultLedger<Vec<Money>> {
    let sum = decimal_total(weights.iter().copied(), "weights")?;
    if sum.is_zero() {
        return equal_split(total, weights.len());
    }
    let total_dec = total.to_decimal();
    let mut owed = weights
        .iter()
        .map(|w| weighted_share(total_dec, *w, sum))
        .collect::<ResultLedger<Vec<_>>>()?;
    absorb_remainder(total, &mut owed)?;
    Ok(owed)
}

fn residual_split(request: &SplitRequest<'_>, weights: &[Decimal]) -> ResultLedger<Vec<Money>> {
    let (paying, others): (Vec<usize>, Vec<usize>) = (0..request.participants.len())
        .partition(|&i| {
            request
                .payers
                .iter()
                .any(|p| p.member_id == request.participants[i])
        });
    if paying.is_empty() || others.is_empty() {
        return distribute(request.amount, request.method, weights);
    }

    let base = base_shares(request.amount, request.method, weights)?;
    let mut owed = vec![Money::ZERO; weights.len()];
    for &i in &others {
        owed[i] = base[i];
    }
    let allocated = checked_sum(others.iter().map(|&i| owed[i]))?;
    let residual = request
        .amount
        .checked_sub(allocated)
        .ok_or_else(amount_too_large)?;

    let paying_owed = match request.method {
        SplitMethod::Equal => equal_split(residual, paying.len())?,
        _ => {
            let paying_weights: Vec<Decimal> = paying.iter().map(|&i| weights[i]).collect();
            proportional_split(residual, &paying_weights)?
        }
    };
    for (&i, amount) in paying.iter().zip(paying_owed) {
        owed[i] = amount;
    }
    Ok(owed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn paid_by(member: &str, amount: Money) -> Vec<MemberAmount> {
        vec![MemberAmount::new(member, amount)]
    }

    fn details(entries: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        entries
            .iter()
            .map(|(id, value)| (id.to_string(), *value))
            .collect()
    }

    fn owed(outcome: &SplitOutcome) -> Vec<i64> {
        outcome.allocations.iter().map(|a| a.amount.cents()).collect()
    }

    fn run(
        amount: i64,
        payers: &[MemberAmount],
        participants: &[String],
        method: &SplitMethod,
        policy: AllocationPolicy,
    ) -> ResultLedger<SplitOutcome> {
        allocate(
            &SplitRequest {
                amount: Money::new(amount),
                payers,
                participants,
                method,
            },
            policy,
        )
    }

    #[test]
    fn equal_split_among_three_with_payer_included() {
        let participants = ids(&["m1", "m2", "m3"]);
        let payers = paid_by("m1", Money::new(30_000));
        let outcome = run(
            30_000,
            &payers,
            &participants,
            &SplitMethod::Equal,
            AllocationPolicy::default(),
        )
        .unwrap();
        assert_eq!(owed(&outcome), vec![10_000, 10_000, 10_000]);
        assert!(outcome.adjustments.is_empty());
    }

    #[test]
    fn equal_split_last_participant_absorbs_cent() {
        let participants = ids(&["m1", "m2", "m3"]);
        let payers = paid_by("m1", Money::new(10_000));
        let outcome = run(
            10_000,
            &payers,
            &participants,
            &SplitMethod::Equal,
            AllocationPolicy::LastParticipant,
        )
        .unwrap();
        assert_eq!(owed(&outcome), vec![3333, 3333, 3334]);
        assert_eq!(outcome.total(), Money::new(10_000));
    }

    #[test]
    fn equal_split_totals_match_for_many_sizes() {
        for count in 1..=50 {
            let participants: Vec<String> = (0..count).map(|i| format!("m{i}")).collect();
            for amount in [1, 7, 99, 100, 1_001, 9_999, 10_000, 123_457, 5_000_000] {
                let payers = paid_by("m0", Money::new(amount));
                let outcome = run(
                    amount,
                    &payers,
                    &participants,
                    &SplitMethod::Equal,
                    AllocationPolicy::LastParticipant,
                )
                .unwrap();
                assert_eq!(outcome.total(), Money::new(amount), "n={count} amount={amount}");
                assert_eq!(outcome.allocations.len(), count);
            }
        }
    }

    #[test]
    fn percentage_split_totals_match_for_many_sizes() {
        for count in 1..=50usize {
            let participants: Vec<String> = (0..count).map(|i| format!("m{i}")).collect();
            // 100 / count truncated to 2 decimals, last one takes the rest.
            let each = (Decimal::ONE_HUNDRED / Decimal::from(count)).trunc_with_scale(2);
            let mut entries: BTreeMap<String, Decimal> =
                participants.iter().map(|p| (p.clone(), each)).collect();
            let last = Decimal::ONE_HUNDRED - each * Decimal::from(count - 1);
            entries.insert(participants[count - 1].clone(), last);
            let method = SplitMethod::Percentage(entries);
            for amount in [1, 100, 9_999, 10_000, 33_333] {
                method.validate(Money::new(amount), &participants).unwrap();
                let payers = paid_by("m0", Money::new(amount));
                for policy in [
                    AllocationPolicy::LastParticipant,
                    AllocationPolicy::PayersAbsorbResidual,
                ] {
                    let outcome = run(amount, &payers, &participants, &method, policy).unwrap();
                    assert_eq!(outcome.total(), Money::new(amount), "n={count} amount={amount}");
                }
            }
        }
    }

    #[test]
    fn shares_split_rounds_then_absorbs() {
        let participants = ids(&["a", "b", "c"]);
        let method = SplitMethod::Shares(details(&[
            ("a", Decimal::from(1)),
            ("b", Decimal::from(1)),
            ("c", Decimal::from(1)),
        ]));
        let payers = paid_by("a", Money::new(200));
        let outcome = run(
            200,
            &payers,
            &participants,
            &method,
            AllocationPolicy::LastParticipant,
        )
        .unwrap();
        // 0.666.. rounds to 0.67 twice, last gets 0.66.
        assert_eq!(owed(&outcome), vec![67, 67, 66]);
    }

    #[test]
    fn shares_split_totals_match_for_uneven_weights() {
        for count in 1..=50usize {
            let participants: Vec<String> = (0..count).map(|i| format!("m{i}")).collect();
            let entries: BTreeMap<String, Decimal> = participants
                .iter()
                .enumerate()
                .map(|(i, p)| (p.clone(), Decimal::from(i % 4 + 1)))
                .collect();
            let method = SplitMethod::Shares(entries);
            for amount in [1, 50, 10_000, 77_777] {
                let payers = paid_by("m0", Money::new(amount));
                let outcome = run(
                    amount,
                    &payers,
                    &participants,
                    &method,
                    AllocationPolicy::LastParticipant,
                )
                .unwrap();
                assert_eq!(outcome.total(), Money::new(amount));
            }
        }
    }

    #[test]
    fn exact_split_reports_adjusted_last_figure() {
        let participants = ids(&["a", "b", "c"]);
        let third = Decimal::new(33_333, 3);
        let method = SplitMethod::Exact(details(&[("a", third), ("b", third), ("c", third)]));
        method.validate(Money::new(10_000), &participants).unwrap();

        let payers = paid_by("a", Money::new(10_000));
        let outcome = run(
            10_000,
            &payers,
            &participants,
            &method,
            AllocationPolicy::LastParticipant,
        )
        .unwrap();
        assert_eq!(owed(&outcome), vec![3333, 3333, 3334]);
        assert_eq!(
            outcome.adjustments,
            vec![ExactAdjustment {
                member_id: "c".to_string(),
                requested: Money::new(3333),
                allocated: Money::new(3334),
            }]
        );
    }

    #[test]
    fn exact_split_without_drift_has_no_adjustment() {
        let participants = ids(&["a", "b"]);
        let method = SplitMethod::Exact(details(&[
            ("a", Decimal::new(1250, 2)),
            ("b", Decimal::new(750, 2)),
        ]));
        let payers = paid_by("b", Money::new(2000));
        let outcome = run(
            2000,
            &payers,
            &participants,
            &method,
            AllocationPolicy::LastParticipant,
        )
        .unwrap();
        assert_eq!(owed(&outcome), vec![1250, 750]);
        assert!(outcome.adjustments.is_empty());
    }

    #[test]
    fn payer_outside_participants_is_allocated_zero() {
        let participants = ids(&["b", "c"]);
        let payers = paid_by("a", Money::new(1000));
        let outcome = run(
            1000,
            &payers,
            &participants,
            &SplitMethod::Equal,
            AllocationPolicy::LastParticipant,
        )
        .unwrap();
        assert_eq!(outcome.owed_by("a"), Some(Money::ZERO));
        assert_eq!(outcome.owed_by("b"), Some(Money::new(500)));
        assert_eq!(outcome.owed_by("c"), Some(Money::new(500)));
        assert_eq!(outcome.allocations.last().unwrap().member_id, "a");
    }

    #[test]
    fn residual_policy_lets_payer_absorb_the_cent() {
        let participants = ids(&["m1", "m2", "m3"]);
        let payers = paid_by("m1", Money::new(10_000));
        let outcome = run(
            10_000,
            &payers,
            &participants,
            &SplitMethod::Equal,
            AllocationPolicy::PayersAbsorbResidual,
        )
        .unwrap();
        assert_eq!(owed(&outcome), vec![3334, 3333, 3333]);
    }

    #[test]
    fn residual_policy_renormalizes_payer_percentages() {
        let participants = ids(&["a", "b", "c"]);
        let method = SplitMethod::Percentage(details(&[
            ("a", Decimal::new(3333, 2)),
            ("b", Decimal::new(3333, 2)),
            ("c", Decimal::new(3334, 2)),
        ]));
        let payers = vec![
            MemberAmount::new("a", Money::new(500)),
            MemberAmount::new("b", Money::new(500)),
        ];

        let uniform = run(
            1000,
            &payers,
            &participants,
            &method,
            AllocationPolicy::LastParticipant,
        )
        .unwrap();
        assert_eq!(owed(&uniform), vec![333, 333, 334]);

        // c is settled first (3.334 -> 3.33); a and b split the 6.67 left
        // 50/50 with the last payer absorbing.
        let residual = run(
            1000,
            &payers,
            &participants,
            &method,
            AllocationPolicy::PayersAbsorbResidual,
        )
        .unwrap();
        assert_eq!(owed(&residual), vec![334, 333, 333]);
    }

    #[test]
    fn residual_policy_without_overlap_matches_uniform() {
        let participants = ids(&["b", "c", "d"]);
        let payers = paid_by("a", Money::new(1000));
        let uniform = run(
            1000,
            &payers,
            &participants,
            &SplitMethod::Equal,
            AllocationPolicy::LastParticipant,
        )
        .unwrap();
        let residual = run(
            1000,
            &payers,
            &participants,
            &SplitMethod::Equal,
            AllocationPolicy::PayersAbsorbResidual,
        )
        .unwrap();
        assert_eq!(uniform, residual);
    }

    #[test]
    fn rejects_malformed_requests() {
        let participants = ids(&["a", "b"]);
        let payers = paid_by("a", Money::new(1000));
        let policy = AllocationPolicy::LastParticipant;

        assert!(matches!(
            run(0, &payers, &participants, &SplitMethod::Equal, policy),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            run(1000, &payers, &[], &SplitMethod::Equal, policy),
            Err(LedgerError::InvalidSplit(_))
        ));
        assert!(matches!(
            run(1000, &payers, &ids(&["a", "a"]), &SplitMethod::Equal, policy),
            Err(LedgerError::InvalidSplit(_))
        ));
        let short = paid_by("a", Money::new(990));
        assert!(matches!(
            run(1000, &short, &participants, &SplitMethod::Equal, policy),
            Err(LedgerError::InvalidAmount(_))
        ));
        let missing = SplitMethod::Shares(details(&[("a", Decimal::ONE)]));
        assert!(matches!(
            run(1000, &payers, &participants, &missing, policy),
            Err(LedgerError::InvalidSplit(_))
        ));
    }

    #[test]
    fn oversized_weights_are_rejected() {
        let participants = ids(&["a", "b"]);
        let payers = paid_by("a", Money::new(1_000_000_000_000));
        let policy = AllocationPolicy::LastParticipant;
        let huge = Decimal::from_i128_with_scale(10_i128.pow(27), 0);

        let shares = SplitMethod::Shares(details(&[("a", huge), ("b", huge)]));
        assert!(matches!(
            run(1_000_000_000_000, &payers, &participants, &shares, policy),
            Err(LedgerError::InvalidSplit(_))
        ));
        let unbounded = SplitMethod::Shares(details(&[("a", Decimal::MAX), ("b", Decimal::ONE)]));
        assert!(matches!(
            unbounded.validate(Money::new(1_000), &participants),
            Err(LedgerError::InvalidSplit(_))
        ));
        assert!(matches!(
            run(1_000_000_000_000, &payers, &participants, &unbounded, policy),
            Err(LedgerError::InvalidSplit(_))
        ));
    }

    #[test]
    fn oversized_exact_amounts_are_rejected() {
        let participants = ids(&["a", "b"]);
        let exact = SplitMethod::Exact(details(&[("a", Decimal::MAX), ("b", Decimal::MAX)]));
        assert!(matches!(
            exact.validate(Money::new(1_000), &participants),
            Err(LedgerError::InvalidSplit(_))
        ));

        let payers = paid_by("a", Money::new(1_000));
        let exact = SplitMethod::Exact(details(&[
            ("a", Decimal::from(i64::MAX)),
            ("b", Decimal::ZERO),
        ]));
        assert!(matches!(
            run(1_000, &payers, &participants, &exact, AllocationPolicy::LastParticipant),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn overflowing_payer_total_is_rejected() {
        let payers = vec![
            MemberAmount::new("a", Money::new(i64::MAX)),
            MemberAmount::new("b", Money::new(i64::MAX)),
        ];
        assert!(matches!(
            normalize_payers(Money::new(100), &payers),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn normalize_payers_absorbs_one_cent_drift() {
        let payers = vec![
            MemberAmount::new("a", Money::new(3333)),
            MemberAmount::new("b", Money::new(3333)),
            MemberAmount::new("c", Money::new(3333)),
        ];
        let normalized = normalize_payers(Money::new(10_000), &payers).unwrap();
        let amounts: Vec<i64> = normalized.iter().map(|p| p.amount.cents()).collect();
        assert_eq!(amounts, vec![3333, 3333, 3334]);

        let dup = vec![
            MemberAmount::new("a", Money::new(500)),
            MemberAmount::new("a", Money::new(500)),
        ];
        assert!(normalize_payers(Money::new(1000), &dup).is_err());
        assert!(normalize_payers(Money::new(1000), &[]).is_err());
    }

    #[test]
    fn validate_checks_method_details() {
        let participants = ids(&["a", "b"]);
        let bad_pct = SplitMethod::Percentage(details(&[
            ("a", Decimal::from(60)),
            ("b", Decimal::from(30)),
        ]));
        assert!(matches!(
            bad_pct.validate(Money::new(1000), &participants),
            Err(LedgerError::InvalidSplit(_))
        ));

        let outsider = SplitMethod::Shares(details(&[
            ("a", Decimal::ONE),
            ("b", Decimal::ONE),
            ("z", Decimal::ONE),
        ]));
        assert!(outsider.validate(Money::new(1000), &participants).is_err());

        let negative = SplitMethod::Shares(details(&[
            ("a", Decimal::from(-1)),
            ("b", Decimal::from(2)),
        ]));
        assert!(negative.validate(Money::new(1000), &participants).is_err());

        let zero_shares = SplitMethod::Shares(details(&[
            ("a", Decimal::ZERO),
            ("b", Decimal::ZERO),
        ]));
        assert!(zero_shares.validate(Money::new(1000), &participants).is_err());

        let exact_off = SplitMethod::Exact(details(&[
            ("a", Decimal::from(5)),
            ("b", Decimal::from(4)),
        ]));
        assert!(exact_off.validate(Money::new(1000), &participants).is_err());

        assert!(SplitMethod::Equal.validate(Money::new(1000), &participants).is_ok());
    }

    #[test]
    fn split_method_serializes_as_tagged_variant() {
        let method = SplitMethod::Shares(details(&[("a", Decimal::from(2))]));
        let json = serde_json::to_value(&method).unwrap();
        assert_eq!(json["method"], "shares");
        let back: SplitMethod = serde_json::from_value(json).unwrap();
        assert_eq!(back, method);

        let equal = serde_json::to_value(SplitMethod::Equal).unwrap();
        assert_eq!(equal["method"], "equal");
    }
}
