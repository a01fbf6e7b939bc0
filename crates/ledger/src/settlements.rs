//! Settlement records: real-world payments between two members.
//!
//! A record is independent of any planned transfer. Recording one credits
//! the payer and debits the recipient, the mirror image of an expense
//! payment; deleting it applies the exact inverse.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    BalanceBatch, Currency, LedgerError, Money, ResultLedger,
    util::{model_currency, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub id: Uuid,
    pub group_id: Uuid,
    pub from: String,
    pub to: String,
    pub amount: Money,
    pub currency: Currency,
    /// Free text such as "cash" or "bank transfer".
    pub method: Option<String>,
    pub remarks: Option<String>,
    pub created_by: String,
    pub idempotency_key: Option<String>,
    pub settled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SettlementRecord {
    pub fn balance_batch(&self) -> BalanceBatch {
        let mut batch = BalanceBatch::new();
        batch.credit(&self.from, self.amount);
        batch.debit(&self.to, self.amount);
        batch
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub from_member: String,
    pub to_member: String,
    pub amount_minor: i64,
    pub currency: String,
    pub method: Option<String>,
    pub remarks: Option<String>,
    pub created_by: String,
    pub idempotency_key: Option<String>,
    pub settled_at: DateTimeUtc,
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
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&SettlementRecord> for ActiveModel {
    fn from(record: &SettlementRecord) -> Self {
        Self {
            id: ActiveValue::Set(record.id.to_string()),
            group_id: ActiveValue::Set(record.group_id.to_string()),
            from_member: ActiveValue::Set(record.from.clone()),
            to_member: ActiveValue::Set(record.to.clone()),
            amount_minor: ActiveValue::Set(record.amount.cents()),
            currency: ActiveValue::Set(record.currency.code().to_string()),
            method: ActiveValue::Set(record.method.clone()),
            remarks: ActiveValue::Set(record.remarks.clone()),
            created_by: ActiveValue::Set(record.created_by.clone()),
            idempotency_key: ActiveValue::Set(record.idempotency_key.clone()),
            settled_at: ActiveValue::Set(record.settled_at),
            created_at: ActiveValue::Set(record.created_at),
        }
    }
}

impl TryFrom<Model> for SettlementRecord {
    type Error = LedgerError;

    fn try_from(model: Model) -> ResultLedger<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "settlement")?,
            group_id: parse_uuid(&model.group_id, "group")?,
            from: model.from_member,
            to: model.to_member,
            amount: Money::new(model.amount_minor),
            currency: model_currency(&model.currency)?,
            method: model.method,
            remarks: model.remarks,
            created_by: model.created_by,
            idempotency_key: model.idempotency_key,
            settled_at: model.settled_at,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_credits_payer_and_debits_recipient() {
        let now = Utc::now();
        let record = SettlementRecord {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            from: "m2".to_string(),
            to: "m1".to_string(),
            amount: Money::new(10_000),
            currency: Currency::Hkd,
            method: Some("cash".to_string()),
            remarks: None,
            created_by: "m2".to_string(),
            idempotency_key: None,
            settled_at: now,
            created_at: now,
        };
        let batch = record.balance_batch();
        assert_eq!(batch.delta("m2"), Money::new(10_000));
        assert_eq!(batch.delta("m1"), Money::new(-10_000));

        let model = ActiveModel::from(&record);
        assert_eq!(model.amount_minor.unwrap(), 10_000);
        assert_eq!(model.currency.unwrap(), "HKD");
    }
}
