//! Expenses.
//!
//! An [`Expense`] is immutable once created. Its payers and computed
//! allocations are frozen into `expense_shares` rows so that deleting it can
//! undo exactly what creating it applied, without running the split again.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    BalanceBatch, Currency, LedgerError, MemberAmount, Money, ResultLedger, SplitMethod,
    expense_shares,
    util::{model_currency, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: Uuid,
    pub description: String,
    pub amount: Money,
    pub currency: Currency,
    /// Paid amounts, summing to `amount` exactly.
    pub payers: Vec<MemberAmount>,
    pub participants: Vec<String>,
    pub split: SplitMethod,
    /// Owed amounts for participants and payers, summing to `amount` exactly.
    pub allocations: Vec<MemberAmount>,
    pub category: Option<String>,
    pub note: Option<String>,
    pub created_by: String,
    pub idempotency_key: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

fn share_position(position: usize) -> ResultLedger<i32> {
    i32::try_from(position)
        .map_err(|_| LedgerError::InvalidSplit("too many allocations".to_string()))
}

impl Expense {
    /// Deltas applied on creation: payers are credited what they fronted and
    /// every allocation is debited.
    pub fn balance_batch(&self) -> BalanceBatch {
        let mut batch = BalanceBatch::new();
        for payer in &self.payers {
            batch.credit(&payer.member_id, payer.amount);
        }
        for allocation in &self.allocations {
            batch.debit(&allocation.member_id, allocation.amount);
        }
        batch
    }

    pub fn paid_by(&self, member_id: &str) -> Money {
        self.payers
            .iter()
            .find(|p| p.member_id == member_id)
            .map_or(Money::ZERO, |p| p.amount)
    }

    pub fn owed_by(&self, member_id: &str) -> Money {
        self.allocations
            .iter()
            .find(|a| a.member_id == member_id)
            .map_or(Money::ZERO, |a| a.amount)
    }

    pub(crate) fn share_rows(&self) -> ResultLedger<Vec<expense_shares::ActiveModel>> {
        self.allocations
            .iter()
            .enumerate()
            .map(|(position, allocation)| {
                Ok(expense_shares::ActiveModel {
                    expense_id: ActiveValue::Set(self.id.to_string()),
                    member_id: ActiveValue::Set(allocation.member_id.clone()),
                    position: ActiveValue::Set(share_position(position)?),
                    paid_minor: ActiveValue::Set(self.paid_by(&allocation.member_id).cents()),
                    owed_minor: ActiveValue::Set(allocation.amount.cents()),
                    participant: ActiveValue::Set(
                        self.participants.contains(&allocation.member_id),
                    ),
                })
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub description: String,
    pub amount_minor: i64,
    pub currency: String,
    pub split_method: String,
    /// JSON encoding of the full `SplitMethod`.
    pub split_details: String,
    pub category: Option<String>,
    pub note: Option<String>,
    pub created_by: String,
    pub idempotency_key: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
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
    #[sea_orm(has_many = "super::expense_shares::Entity")]
    Shares,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::expense_shares::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shares.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&Expense> for ActiveModel {
    type Error = LedgerError;

    fn try_from(expense: &Expense) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(expense.id.to_string()),
            group_id: ActiveValue::Set(expense.group_id.to_string()),
            description: ActiveValue::Set(expense.description.clone()),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            currency: ActiveValue::Set(expense.currency.code().to_string()),
            split_method: ActiveValue::Set(expense.split.as_str().to_string()),
            split_details: ActiveValue::Set(serde_json::to_string(&expense.split)?),
            category: ActiveValue::Set(expense.category.clone()),
            note: ActiveValue::Set(expense.note.clone()),
            created_by: ActiveValue::Set(expense.created_by.clone()),
            idempotency_key: ActiveValue::Set(expense.idempotency_key.clone()),
            occurred_at: ActiveValue::Set(expense.occurred_at),
            created_at: ActiveValue::Set(expense.created_at),
        })
    }
}

impl TryFrom<(Model, Vec<expense_shares::Model>)> for Expense {
    type Error = LedgerError;

    fn try_from((model, mut shares): (Model, Vec<expense_shares::Model>)) -> ResultLedger<Self> {
        shares.sort_by_key(|s| s.position);
        let split: SplitMethod = serde_json::from_str(&model.split_details)?;
        if split.as_str() != model.split_method {
            return Err(LedgerError::InvalidSplit(format!(
                "stored split method {} does not match details",
                model.split_method
            )));
        }

        let payers = shares
            .iter()
            .filter(|s| s.paid_minor != 0)
            .map(|s| MemberAmount::new(s.member_id.clone(), Money::new(s.paid_minor)))
            .collect();
        let participants = shares
            .iter()
            .filter(|s| s.participant)
            .map(|s| s.member_id.clone())
            .collect();
        let allocations = shares
            .into_iter()
            .map(|s| MemberAmount::new(s.member_id, Money::new(s.owed_minor)))
            .collect();

        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            description: model.description,
            amount: Money::new(model.amount_minor),
            currency: model_currency(&model.currency)?,
            payers,
            participants,
            split,
            allocations,
            category: model.category,
            note: model.note,
            created_by: model.created_by,
            idempotency_key: model.idempotency_key,
            occurred_at: model.occurred_at,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Expense {
        let now = Utc::now();
        Expense {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            description: "Dinner".to_string(),
            amount: Money::new(30_000),
            currency: Currency::Hkd,
            payers: vec![MemberAmount::new("m1", Money::new(30_000))],
            participants: vec!["m1".to_string(), "m2".to_string(), "m3".to_string()],
            split: SplitMethod::Equal,
            allocations: vec![
                MemberAmount::new("m1", Money::new(10_000)),
                MemberAmount::new("m2", Money::new(10_000)),
                MemberAmount::new("m3", Money::new(10_000)),
            ],
            category: None,
            note: None,
            created_by: "m1".to_string(),
            idempotency_key: None,
            occurred_at: now,
            created_at: now,
        }
    }

    #[test]
    fn payer_delta_nets_paid_against_own_share() {
        let batch = sample().balance_batch();
        assert_eq!(batch.delta("m1"), Money::new(20_000));
        assert_eq!(batch.delta("m2"), Money::new(-10_000));
        assert_eq!(batch.delta("m3"), Money::new(-10_000));
        assert!(batch.total().unwrap().is_zero());
    }

    #[test]
    fn share_position_rejects_out_of_range_index() {
        assert_eq!(share_position(3).unwrap(), 3);
        assert!(matches!(
            share_position(usize::MAX),
            Err(LedgerError::InvalidSplit(_))
        ));
    }

    #[test]
    fn share_rows_restore_the_same_expense() {
        let expense = sample();
        let model = ActiveModel::try_from(&expense).unwrap();
        let model = Model {
            id: model.id.unwrap(),
            group_id: model.group_id.unwrap(),
            description: model.description.unwrap(),
            amount_minor: model.amount_minor.unwrap(),
            currency: model.currency.unwrap(),
            split_method: model.split_method.unwrap(),
            split_details: model.split_details.unwrap(),
            category: model.category.unwrap(),
            note: model.note.unwrap(),
            created_by: model.created_by.unwrap(),
            idempotency_key: model.idempotency_key.unwrap(),
            occurred_at: model.occurred_at.unwrap(),
            created_at: model.created_at.unwrap(),
        };
        let shares = expense
            .share_rows()
            .unwrap()
            .into_iter()
            .map(|row| expense_shares::Model {
                expense_id: row.expense_id.unwrap(),
                member_id: row.member_id.unwrap(),
                position: row.position.unwrap(),
                paid_minor: row.paid_minor.unwrap(),
                owed_minor: row.owed_minor.unwrap(),
                participant: row.participant.unwrap(),
            })
            .rev()
            .collect();

        let restored = Expense::try_from((model, shares)).unwrap();
        assert_eq!(restored, expense);
    }
}
