use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder,
    TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    AllocationPolicy, Balances, Expense, ExpenseCmd, Group, LedgerError, LedgerEvent,
    ResultLedger, SplitRequest, allocate, expense_shares, expenses, normalize_payers,
    util::{ensure_group_currency, normalize_optional_text},
};

use super::{Ledger, access::GroupSnapshot, with_tx};

/// Validates `cmd` against the group and runs the split.
///
/// Pure: nothing is written, so a failure leaves no trace.
fn build_expense(group: &Group, cmd: &ExpenseCmd, policy: AllocationPolicy) -> ResultLedger<Expense> {
    group.require_member(&cmd.member_id)?;
    ensure_group_currency(group.currency, cmd.currency.unwrap_or(group.currency))?;
    if !cmd.amount.is_positive() {
        return Err(LedgerError::InvalidAmount("amount must be > 0".to_string()));
    }
    if cmd.participants.is_empty() {
        return Err(LedgerError::InvalidSplit(
            "at least one participant is required".to_string(),
        ));
    }

    let payers = normalize_payers(cmd.amount, &cmd.payers)?;
    Ledger::require_members(group, payers.iter().map(|p| p.member_id.as_str()))?;
    Ledger::require_members(group, cmd.participants.iter().map(String::as_str))?;
    cmd.split.validate(cmd.amount, &cmd.participants)?;

    let outcome = allocate(
        &SplitRequest {
            amount: cmd.amount,
            payers: &payers,
            participants: &cmd.participants,
            method: &cmd.split,
        },
        policy,
    )?;
    for adjustment in &outcome.adjustments {
        tracing::warn!(
            "exact share of {} adjusted from {} to {} to match the total",
            adjustment.member_id,
            adjustment.requested,
            adjustment.allocated
        );
    }

    Ok(Expense {
        id: Uuid::new_v4(),
        group_id: group.id,
        description: cmd.description.trim().to_string(),
        amount: cmd.amount,
        currency: group.currency,
        payers,
        participants: cmd.participants.clone(),
        split: cmd.split.clone(),
        allocations: outcome.allocations,
        category: normalize_optional_text(cmd.meta.category.as_deref()),
        note: normalize_optional_text(cmd.meta.note.as_deref()),
        created_by: cmd.member_id.clone(),
        idempotency_key: normalize_optional_text(cmd.meta.idempotency_key.as_deref()),
        occurred_at: cmd.meta.occurred_at,
        created_at: Utc::now(),
    })
}

impl Ledger {
    /// Creates an expense and applies its balance deltas.
    ///
    /// Payers are credited what they paid, every allocation is debited. A
    /// repeated submission with the same idempotency key (per group and
    /// acting member) returns the existing id without touching balances.
    pub async fn create_expense(&self, group_id: Uuid, cmd: ExpenseCmd) -> ResultLedger<Uuid> {
        let cmd = &cmd;
        let (expense_id, balances) = self
            .retry_on_conflict("create expense", move || {
                self.create_expense_attempt(group_id, cmd)
            })
            .await?;

        if let Some(balances) = balances {
            tracing::info!(
                "expense {} created in group {}: {} {}",
                expense_id,
                group_id,
                cmd.amount,
                cmd.description.trim()
            );
            self.notify(LedgerEvent::ExpenseCreated {
                group_id,
                expense_id,
                balances,
            });
        }
        Ok(expense_id)
    }

    async fn create_expense_attempt(
        &self,
        group_id: Uuid,
        cmd: &ExpenseCmd,
    ) -> ResultLedger<(Uuid, Option<Balances>)> {
        with_tx!(self, |db_tx| {
            let GroupSnapshot { group, version } = self.load_group(&db_tx, group_id).await?;
            let existing = match cmd.meta.idempotency_key.as_deref() {
                Some(key) => {
                    self.find_expense_by_key(&db_tx, group_id, &cmd.member_id, key)
                        .await?
                }
                None => None,
            };

            match existing {
                Some(expense_id) => Ok::<_, LedgerError>((expense_id, None)),
                None => {
                    let expense = build_expense(&group, cmd, self.settings.allocation_policy)?;
                    self.insert_expense(&db_tx, &expense).await?;
                    let balances = self
                        .commit_batch(&db_tx, group_id, version, &expense.balance_batch())
                        .await?;
                    Ok((expense.id, Some(balances)))
                }
            }
        })
    }

    /// Deletes an expense and applies the exact inverse of its creation.
    ///
    /// The inverse is built from the stored payers and allocations, never by
    /// running the split again.
    pub async fn delete_expense(&self, group_id: Uuid, expense_id: Uuid) -> ResultLedger<()> {
        let balances = self
            .retry_on_conflict("delete expense", move || {
                self.delete_expense_attempt(group_id, expense_id)
            })
            .await?;

        tracing::info!("expense {} deleted from group {}", expense_id, group_id);
        self.notify(LedgerEvent::ExpenseDeleted {
            group_id,
            expense_id,
            balances,
        });
        Ok(())
    }

    async fn delete_expense_attempt(
        &self,
        group_id: Uuid,
        expense_id: Uuid,
    ) -> ResultLedger<Balances> {
        with_tx!(self, |db_tx| {
            let version = self.require_group_model(&db_tx, group_id).await?.version;
            let expense = self.require_expense(&db_tx, group_id, expense_id).await?;
            let batch = expense.balance_batch().inverse();

            expense_shares::Entity::delete_many()
                .filter(expense_shares::Column::ExpenseId.eq(expense_id.to_string()))
                .exec(&db_tx)
                .await?;
            expenses::Entity::delete_by_id(expense_id.to_string())
                .exec(&db_tx)
                .await?;

            self.commit_batch(&db_tx, group_id, version, &batch).await
        })
    }

    /// Returns a stored expense with its frozen payers and allocations.
    pub async fn expense(&self, group_id: Uuid, expense_id: Uuid) -> ResultLedger<Expense> {
        self.require_group_model(&self.database, group_id).await?;
        self.require_expense(&self.database, group_id, expense_id)
            .await
    }

    /// Expenses of a group, oldest first (by `occurred_at`, then creation).
    pub async fn list_expenses(&self, group_id: Uuid) -> ResultLedger<Vec<Expense>> {
        self.require_group_model(&self.database, group_id).await?;
        self.load_expenses(&self.database, group_id).await
    }

    pub(super) async fn load_expenses<C: ConnectionTrait>(
        &self,
        db: &C,
        group_id: Uuid,
    ) -> ResultLedger<Vec<Expense>> {
        let models = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(expenses::Column::OccurredAt)
            .order_by_asc(expenses::Column::CreatedAt)
            .order_by_asc(expenses::Column::Id)
            .all(db)
            .await?;
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let mut shares: HashMap<String, Vec<expense_shares::Model>> = HashMap::new();
        for share in expense_shares::Entity::find()
            .filter(expense_shares::Column::ExpenseId.is_in(ids))
            .all(db)
            .await?
        {
            shares.entry(share.expense_id.clone()).or_default().push(share);
        }

        models
            .into_iter()
            .map(|model| {
                let rows = shares.remove(&model.id).unwrap_or_default();
                Expense::try_from((model, rows))
            })
            .collect()
    }

    async fn require_expense<C: ConnectionTrait>(
        &self,
        db: &C,
        group_id: Uuid,
        expense_id: Uuid,
    ) -> ResultLedger<Expense> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| LedgerError::KeyNotFound("expense not exists".to_string()))?;
        let shares = expense_shares::Entity::find()
            .filter(expense_shares::Column::ExpenseId.eq(model.id.clone()))
            .all(db)
            .await?;
        Expense::try_from((model, shares))
    }

    async fn find_expense_by_key(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        created_by: &str,
        key: &str,
    ) -> ResultLedger<Option<Uuid>> {
        let Some(key) = normalize_optional_text(Some(key)) else {
            return Ok(None);
        };
        let existing = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .filter(expenses::Column::CreatedBy.eq(created_by.to_string()))
            .filter(expenses::Column::IdempotencyKey.eq(key))
            .one(db)
            .await?;
        existing
            .map(|model| {
                Uuid::parse_str(&model.id)
                    .map_err(|_| LedgerError::InvalidId("invalid expense id".to_string()))
            })
            .transpose()
    }

    async fn insert_expense(&self, db: &DatabaseTransaction, expense: &Expense) -> ResultLedger<()> {
        expenses::ActiveModel::try_from(expense)?.insert(db).await?;
        expense_shares::Entity::insert_many(expense.share_rows()?)
            .exec(db)
            .await?;
        Ok(())
    }
}
