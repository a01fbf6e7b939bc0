//! A `Group` is the unit of consistency of the ledger: balances, expenses and
//! settlements all belong to exactly one group and every invariant is checked
//! per group.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, LedgerError, Member, ResultLedger, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub currency: Currency,
    /// Roster in registry order.
    pub members: Vec<Member>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn member(&self, member_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == member_id)
    }

    pub fn is_member(&self, member_id: &str) -> bool {
        self.member(member_id).is_some()
    }

    /// Display name for `member_id`, falling back to the id itself.
    pub fn display_name<'a>(&'a self, member_id: &'a str) -> &'a str {
        self.member(member_id)
            .map_or(member_id, |member| member.name.as_str())
    }

    /// Fails with `InvalidMember` unless `member_id` is on the roster.
    pub fn require_member(&self, member_id: &str) -> ResultLedger<()> {
        if self.is_member(member_id) {
            return Ok(());
        }
        Err(LedgerError::InvalidMember(format!(
            "{member_id} is not a member of group {}",
            self.name
        )))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub currency: String,
    /// Optimistic-concurrency token, bumped by every balance-affecting write.
    pub version: i64,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::members::Entity")]
    Members,
    #[sea_orm(has_many = "super::balances::Entity")]
    Balances,
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
    #[sea_orm(has_many = "super::settlements::Entity")]
    Settlements,
}

impl Related<super::members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::balances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Balances.def()
    }
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::settlements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Settlements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Group> for ActiveModel {
    fn from(group: &Group) -> Self {
        Self {
            id: ActiveValue::Set(group.id.to_string()),
            name: ActiveValue::Set(group.name.clone()),
            currency: ActiveValue::Set(group.currency.code().to_string()),
            version: ActiveValue::Set(0),
            created_by: ActiveValue::Set(group.created_by.clone()),
            created_at: ActiveValue::Set(group.created_at),
        }
    }
}

impl TryFrom<(Model, Vec<super::members::Model>)> for Group {
    type Error = LedgerError;

    fn try_from((model, members): (Model, Vec<super::members::Model>)) -> Result<Self, Self::Error> {
        let mut members = members;
        members.sort_by_key(|m| m.position);
        Ok(Self {
            id: parse_uuid(&model.id, "group")?,
            name: model.name,
            currency: crate::util::model_currency(&model.currency)?,
            members: members
                .into_iter()
                .map(Member::try_from)
                .collect::<ResultLedger<Vec<_>>>()?,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}
