use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, TransactionTrait};
use uuid::Uuid;

use crate::{
    Group, LedgerError, Member, Money, NewGroupCmd, ResultLedger, groups, members,
    util::normalize_required_name,
};

use super::{Ledger, with_tx};

fn normalize_roster(members: Vec<Member>) -> ResultLedger<Vec<Member>> {
    if members.is_empty() {
        return Err(LedgerError::InvalidGroup(
            "a group needs at least one member".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(members.len());
    members
        .into_iter()
        .map(|member| {
            let id = normalize_required_name(&member.id, "member id", LedgerError::InvalidMember)?;
            let name = normalize_required_name(&member.name, "member name", LedgerError::InvalidMember)?;
            if !seen.insert(id.clone()) {
                return Err(LedgerError::InvalidMember(format!("duplicate member: {id}")));
            }
            Ok(Member { id, name, ..member })
        })
        .collect()
}

impl Ledger {
    /// Creates a group with a fixed currency and its initial roster.
    ///
    /// Every member starts with a zero balance. `created_by` must be on the
    /// roster.
    pub async fn create_group(&self, cmd: NewGroupCmd) -> ResultLedger<Uuid> {
        let name = normalize_required_name(&cmd.name, "group name", LedgerError::InvalidGroup)?;
        let group = Group {
            id: Uuid::new_v4(),
            name,
            currency: cmd.currency,
            members: normalize_roster(cmd.members)?,
            created_by: cmd.created_by,
            created_at: Utc::now(),
        };
        group.require_member(&group.created_by)?;

        with_tx!(self, |db_tx| {
            groups::ActiveModel::from(&group).insert(&db_tx).await?;
            for (position, member) in group.members.iter().enumerate() {
                let position = i32::try_from(position)
                    .map_err(|_| LedgerError::InvalidGroup("too many members".to_string()))?;
                members::ActiveModel::from_member(group.id, position, member)
                    .insert(&db_tx)
                    .await?;
                self.write_balance(&db_tx, group.id, &member.id, Money::ZERO)
                    .await?;
            }
            Ok::<_, LedgerError>(())
        })?;

        tracing::info!(
            "group {} created: {} ({} members, {})",
            group.id,
            group.name,
            group.members.len(),
            group.currency
        );
        Ok(group.id)
    }

    /// Returns the group with its roster in registry order.
    pub async fn group(&self, group_id: Uuid) -> ResultLedger<Group> {
        Ok(self.load_group(&self.database, group_id).await?.group)
    }
}
