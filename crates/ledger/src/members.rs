//! Group members.
//!
//! Membership is owned by the surrounding application: the ledger only reads
//! the roster a group was created with, to validate ids and to render names.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LedgerError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    #[default]
    Real,
    /// Placeholder added by an owner before the real person joins.
    Dummy,
}

impl MemberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Real => "real",
            Self::Dummy => "dummy",
        }
    }
}

impl TryFrom<&str> for MemberKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "real" => Ok(Self::Real),
            "dummy" => Ok(Self::Dummy),
            other => Err(LedgerError::InvalidMember(format!(
                "invalid member kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Admin,
    #[default]
    Member,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

impl TryFrom<&str> for MemberRole {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            other => Err(LedgerError::InvalidMember(format!(
                "invalid member role: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub kind: MemberKind,
    pub role: MemberRole,
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: MemberKind::Real,
            role: MemberRole::Member,
        }
    }

    #[must_use]
    pub fn dummy(mut self) -> Self {
        self.kind = MemberKind::Dummy;
        self
    }

    #[must_use]
    pub fn role(mut self, role: MemberRole) -> Self {
        self.role = role;
        self
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "group_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub member_id: String,
    pub name: String,
    pub kind: String,
    pub role: String,
    pub position: i32,
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
    pub(crate) fn from_member(group_id: Uuid, position: i32, member: &Member) -> Self {
        Self {
            group_id: ActiveValue::Set(group_id.to_string()),
            member_id: ActiveValue::Set(member.id.clone()),
            name: ActiveValue::Set(member.name.clone()),
            kind: ActiveValue::Set(member.kind.as_str().to_string()),
            role: ActiveValue::Set(member.role.as_str().to_string()),
            position: ActiveValue::Set(position),
        }
    }
}

impl TryFrom<Model> for Member {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: MemberKind::try_from(model.kind.as_str())?,
            role: MemberRole::try_from(model.role.as_str())?,
            id: model.member_id,
            name: model.name,
        })
    }
}
