use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{Group, LedgerError, ResultLedger, groups, members};

use super::Ledger;

/// A group as read at the start of a write, with the version the write must
/// still observe when it commits.
pub(super) struct GroupSnapshot {
    pub(super) group: Group,
    pub(super) version: i64,
}

impl Ledger {
    pub(super) async fn require_group_model<C: ConnectionTrait>(
        &self,
        db: &C,
        group_id: Uuid,
    ) -> ResultLedger<groups::Model> {
        groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound("group not exists".to_string()))
    }

    pub(super) async fn load_group<C: ConnectionTrait>(
        &self,
        db: &C,
        group_id: Uuid,
    ) -> ResultLedger<GroupSnapshot> {
        let model = self.require_group_model(db, group_id).await?;
        let version = model.version;
        let roster = members::Entity::find()
            .filter(members::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(members::Column::Position)
            .all(db)
            .await?;
        Ok(GroupSnapshot {
            group: Group::try_from((model, roster))?,
            version,
        })
    }

    /// Fails with `InvalidMember` unless every id is on the roster.
    pub(super) fn require_members<'a>(
        group: &Group,
        member_ids: impl IntoIterator<Item = &'a str>,
    ) -> ResultLedger<()> {
        for member_id in member_ids {
            group.require_member(member_id)?;
        }
        Ok(())
    }
}
