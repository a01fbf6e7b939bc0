use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder,
    TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Balances, Group, LedgerError, LedgerEvent, ResultLedger, SettleCmd, SettlementRecord,
    settlements,
    util::{ensure_group_currency, normalize_optional_text},
};

use super::{Ledger, access::GroupSnapshot, with_tx};

fn build_settlement(group: &Group, cmd: &SettleCmd) -> ResultLedger<SettlementRecord> {
    group.require_member(&cmd.member_id)?;
    ensure_group_currency(group.currency, cmd.currency.unwrap_or(group.currency))?;
    if !cmd.amount.is_positive() {
        return Err(LedgerError::InvalidAmount("amount must be > 0".to_string()));
    }
    if cmd.from == cmd.to {
        return Err(LedgerError::InvalidMember(
            "payer and recipient must differ".to_string(),
        ));
    }
    Ledger::require_members(group, [cmd.from.as_str(), cmd.to.as_str()])?;

    Ok(SettlementRecord {
        id: Uuid::new_v4(),
        group_id: group.id,
        from: cmd.from.clone(),
        to: cmd.to.clone(),
        amount: cmd.amount,
        currency: group.currency,
        method: normalize_optional_text(cmd.method.as_deref()),
        remarks: normalize_optional_text(cmd.remarks.as_deref()),
        created_by: cmd.member_id.clone(),
        idempotency_key: normalize_optional_text(cmd.idempotency_key.as_deref()),
        settled_at: cmd.settled_at,
        created_at: Utc::now(),
    })
}

impl Ledger {
    /// Records a real-world payment: `from` is credited, `to` is debited.
    ///
    /// The amount does not have to match any planned transfer.
    pub async fn record_settlement(&self, group_id: Uuid, cmd: SettleCmd) -> ResultLedger<Uuid> {
        let cmd = &cmd;
        let (settlement_id, balances) = self
            .retry_on_conflict("record settlement", move || {
                self.record_settlement_attempt(group_id, cmd)
            })
            .await?;

        if let Some(balances) = balances {
            tracing::info!(
                "settlement {} recorded in group {}: {} -> {} {}",
                settlement_id,
                group_id,
                cmd.from,
                cmd.to,
                cmd.amount
            );
            self.notify(LedgerEvent::SettlementRecorded {
                group_id,
                settlement_id,
                balances,
            });
        }
        Ok(settlement_id)
    }

    async fn record_settlement_attempt(
        &self,
        group_id: Uuid,
        cmd: &SettleCmd,
    ) -> ResultLedger<(Uuid, Option<Balances>)> {
        with_tx!(self, |db_tx| {
            let GroupSnapshot { group, version } = self.load_group(&db_tx, group_id).await?;
            let existing = match cmd.idempotency_key.as_deref() {
                Some(key) => {
                    self.find_settlement_by_key(&db_tx, group_id, &cmd.member_id, key)
                        .await?
                }
                None => None,
            };

            match existing {
                Some(settlement_id) => Ok::<_, LedgerError>((settlement_id, None)),
                None => {
                    let record = build_settlement(&group, cmd)?;
                    settlements::ActiveModel::from(&record)
                        .insert(&db_tx)
                        .await?;
                    let balances = self
                        .commit_batch(&db_tx, group_id, version, &record.balance_batch())
                        .await?;
                    Ok((record.id, Some(balances)))
                }
            }
        })
    }

    /// Deletes a settlement record and reverses its balance effect exactly.
    pub async fn delete_settlement(&self, group_id: Uuid, settlement_id: Uuid) -> ResultLedger<()> {
        let balances = self
            .retry_on_conflict("delete settlement", move || {
                self.delete_settlement_attempt(group_id, settlement_id)
            })
            .await?;

        tracing::info!(
            "settlement {} deleted from group {}",
            settlement_id,
            group_id
        );
        self.notify(LedgerEvent::SettlementDeleted {
            group_id,
            settlement_id,
            balances,
        });
        Ok(())
    }

    async fn delete_settlement_attempt(
        &self,
        group_id: Uuid,
        settlement_id: Uuid,
    ) -> ResultLedger<Balances> {
        with_tx!(self, |db_tx| {
            let version = self.require_group_model(&db_tx, group_id).await?.version;
            let record = self
                .require_settlement(&db_tx, group_id, settlement_id)
                .await?;
            settlements::Entity::delete_by_id(settlement_id.to_string())
                .exec(&db_tx)
                .await?;
            self.commit_batch(&db_tx, group_id, version, &record.balance_batch().inverse())
                .await
        })
    }

    pub async fn settlement(
        &self,
        group_id: Uuid,
        settlement_id: Uuid,
    ) -> ResultLedger<SettlementRecord> {
        self.require_group_model(&self.database, group_id).await?;
        self.require_settlement(&self.database, group_id, settlement_id)
            .await
    }

    /// Settlement records of a group, oldest first.
    pub async fn list_settlements(&self, group_id: Uuid) -> ResultLedger<Vec<SettlementRecord>> {
        self.require_group_model(&self.database, group_id).await?;
        self.load_settlements(&self.database, group_id).await
    }

    pub(super) async fn load_settlements<C: ConnectionTrait>(
        &self,
        db: &C,
        group_id: Uuid,
    ) -> ResultLedger<Vec<SettlementRecord>> {
        settlements::Entity::find()
            .filter(settlements::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(settlements::Column::SettledAt)
            .order_by_asc(settlements::Column::CreatedAt)
            .order_by_asc(settlements::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(SettlementRecord::try_from)
            .collect()
    }

    async fn require_settlement<C: ConnectionTrait>(
        &self,
        db: &C,
        group_id: Uuid,
        settlement_id: Uuid,
    ) -> ResultLedger<SettlementRecord> {
        let model = settlements::Entity::find_by_id(settlement_id.to_string())
            .filter(settlements::Column::GroupId.eq(group_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound("settlement not exists".to_string()))?;
        SettlementRecord::try_from(model)
    }

    async fn find_settlement_by_key(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        created_by: &str,
        key: &str,
    ) -> ResultLedger<Option<Uuid>> {
        let Some(key) = normalize_optional_text(Some(key)) else {
            return Ok(None);
        };
        let existing = settlements::Entity::find()
            .filter(settlements::Column::GroupId.eq(group_id.to_string()))
            .filter(settlements::Column::CreatedBy.eq(created_by.to_string()))
            .filter(settlements::Column::IdempotencyKey.eq(key))
            .one(db)
            .await?;
        existing
            .map(|model| {
                Uuid::parse_str(&model.id)
                    .map_err(|_| LedgerError::InvalidId("invalid settlement id".to_string()))
            })
            .transpose()
    }
}
