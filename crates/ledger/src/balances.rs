//! Member balances.
//!
//! A balance is signed: positive means the group owes the member, negative
//! means the member owes the group. Within a group the balances always sum
//! to zero; every change is applied as a [`BalanceBatch`] whose deltas also
//! sum to zero.

use std::collections::BTreeMap;

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, Money, ResultLedger, checked_sum};

/// Balances of one group keyed by member id.
///
/// Members with no recorded activity read as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances(BTreeMap<String, Money>);

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, member_id: &str) -> Money {
        self.0.get(member_id).copied().unwrap_or(Money::ZERO)
    }

    pub fn set(&mut self, member_id: impl Into<String>, balance: Money) {
        self.0.insert(member_id.into(), balance);
    }

    /// Sum of all balances; fails instead of overflowing.
    pub fn total(&self) -> ResultLedger<Money> {
        checked_sum(self.0.values().copied())
    }

    pub fn is_balanced(&self) -> bool {
        self.total().is_ok_and(Money::is_zero)
    }

    /// Fails with `Unbalanced` unless the balances sum to zero.
    pub fn ensure_balanced(&self) -> ResultLedger<()> {
        let total = self.total()?;
        if !total.is_zero() {
            return Err(LedgerError::Unbalanced(format!(
                "balances sum to {total}, expected 0.00"
            )));
        }
        Ok(())
    }

    /// Member ids in lexicographic order with their balance.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Money)> {
        self.0.iter().map(|(id, balance)| (id.as_str(), *balance))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds every delta of `batch`, failing on overflow without touching
    /// `self`.
    pub fn apply(&mut self, batch: &BalanceBatch) -> ResultLedger<()> {
        let mut next = self.0.clone();
        for (member_id, delta) in batch.iter() {
            let entry = next.entry(member_id.to_string()).or_insert(Money::ZERO);
            *entry = entry.checked_add(delta).ok_or_else(|| {
                LedgerError::InvalidAmount(format!("balance overflow for {member_id}"))
            })?;
        }
        self.0 = next;
        Ok(())
    }
}

impl FromIterator<(String, Money)> for Balances {
    fn from_iter<I: IntoIterator<Item = (String, Money)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A set of balance deltas committed atomically.
///
/// Deltas for the same member are merged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BalanceBatch {
    deltas: BTreeMap<String, Money>,
}

impl BalanceBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increases `member_id`'s balance (the group owes them more).
    pub fn credit(&mut self, member_id: &str, amount: Money) {
        *self
            .deltas
            .entry(member_id.to_string())
            .or_insert(Money::ZERO) += amount;
    }

    /// Decreases `member_id`'s balance (they owe the group more).
    pub fn debit(&mut self, member_id: &str, amount: Money) {
        *self
            .deltas
            .entry(member_id.to_string())
            .or_insert(Money::ZERO) -= amount;
    }

    /// The batch that exactly undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            deltas: self
                .deltas
                .iter()
                .map(|(member_id, delta)| (member_id.clone(), -*delta))
                .collect(),
        }
    }

    pub fn total(&self) -> ResultLedger<Money> {
        checked_sum(self.deltas.values().copied())
    }

    pub fn delta(&self, member_id: &str) -> Money {
        self.deltas.get(member_id).copied().unwrap_or(Money::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Money)> {
        self.deltas.iter().map(|(id, delta)| (id.as_str(), *delta))
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.deltas.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Fails with `Unbalanced` unless the deltas sum to zero.
    pub fn ensure_zero_sum(&self) -> ResultLedger<()> {
        let total = self.total()?;
        if !total.is_zero() {
            return Err(LedgerError::Unbalanced(format!(
                "batch deltas sum to {total}, expected 0.00"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub member_id: String,
    pub balance_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub(crate) fn row(group_id: Uuid, member_id: &str, balance: Money) -> Self {
        Self {
            group_id: ActiveValue::Set(group_id.to_string()),
            member_id: ActiveValue::Set(member_id.to_string()),
            balance_minor: ActiveValue::Set(balance.cents()),
        }
    }
}

impl From<Vec<Model>> for Balances {
    fn from(models: Vec<Model>) -> Self {
        models
            .into_iter()
            .map(|m| (m.member_id, Money::new(m.balance_minor)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_merges_and_inverts() {
        let mut batch = BalanceBatch::new();
        batch.credit("a", Money::new(300));
        batch.debit("a", Money::new(100));
        batch.debit("b", Money::new(100));
        batch.debit("c", Money::new(100));

        assert_eq!(batch.delta("a"), Money::new(200));
        batch.ensure_zero_sum().unwrap();

        let inverse = batch.inverse();
        assert_eq!(inverse.delta("a"), Money::new(-200));
        assert_eq!(inverse.delta("b"), Money::new(100));

        let mut balances = Balances::new();
        balances.apply(&batch).unwrap();
        balances.apply(&inverse).unwrap();
        assert!(balances.iter().all(|(_, balance)| balance.is_zero()));
    }

    #[test]
    fn unbalanced_batch_is_reported() {
        let mut batch = BalanceBatch::new();
        batch.credit("a", Money::new(100));
        batch.debit("b", Money::new(99));
        assert!(matches!(
            batch.ensure_zero_sum(),
            Err(LedgerError::Unbalanced(_))
        ));
    }

    #[test]
    fn overflow_leaves_balances_untouched() {
        let mut balances = Balances::new();
        balances.set("a", Money::new(i64::MAX));
        balances.set("b", Money::new(-5));

        let mut batch = BalanceBatch::new();
        batch.debit("b", Money::new(1));
        batch.credit("a", Money::new(1));
        assert!(balances.apply(&batch).is_err());
        assert_eq!(balances.get("b"), Money::new(-5));
    }

    #[test]
    fn unknown_member_reads_zero() {
        let balances = Balances::new();
        assert_eq!(balances.get("ghost"), Money::ZERO);
        assert!(balances.is_balanced());
    }
}
