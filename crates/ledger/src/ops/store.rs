//! Balance storage.
//!
//! The only place that writes `balances` rows. Every change goes through
//! [`Ledger::commit_batch`], which checks the zero-sum invariant before and
//! after applying the batch and then bumps the group version with a
//! compare-and-swap.

use sea_orm::{
    ConnectionTrait, DatabaseTransaction, QueryFilter,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use crate::{BalanceBatch, Balances, LedgerError, Money, ResultLedger, balances, groups};

use super::Ledger;

impl Ledger {
    pub(super) async fn load_balances<C: ConnectionTrait>(
        &self,
        db: &C,
        group_id: Uuid,
    ) -> ResultLedger<Balances> {
        let rows = balances::Entity::find()
            .filter(balances::Column::GroupId.eq(group_id.to_string()))
            .all(db)
            .await?;
        Ok(Balances::from(rows))
    }

    pub(super) async fn write_balance(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        member_id: &str,
        balance: Money,
    ) -> ResultLedger<()> {
        balances::Entity::insert(balances::ActiveModel::row(group_id, member_id, balance))
            .on_conflict(
                OnConflict::columns([balances::Column::GroupId, balances::Column::MemberId])
                    .update_column(balances::Column::BalanceMinor)
                    .to_owned(),
            )
            .exec(db)
            .await?;
        Ok(())
    }

    /// Increments the group version if it still equals `expected`.
    ///
    /// Zero affected rows means another write committed since the group was
    /// read; the caller's transaction must be dropped and the whole
    /// read-modify-write retried.
    pub(super) async fn bump_version(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        expected: i64,
    ) -> ResultLedger<()> {
        let result = groups::Entity::update_many()
            .col_expr(
                groups::Column::Version,
                Expr::col(groups::Column::Version).add(1),
            )
            .filter(groups::Column::Id.eq(group_id.to_string()))
            .filter(groups::Column::Version.eq(expected))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(LedgerError::Conflict(format!(
                "group {group_id} was modified concurrently"
            )));
        }
        Ok(())
    }

    /// Applies `batch` to the stored balances of `group_id` as one unit.
    ///
    /// Returns the balances as they will be after commit.
    pub(super) async fn commit_batch(
        &self,
        db: &DatabaseTransaction,
        group_id: Uuid,
        version: i64,
        batch: &BalanceBatch,
    ) -> ResultLedger<Balances> {
        batch.ensure_zero_sum()?;
        let mut balances = self.load_balances(db, group_id).await?;
        balances.ensure_balanced()?;
        balances.apply(batch)?;
        balances.ensure_balanced()?;

        for member_id in batch.member_ids() {
            self.write_balance(db, group_id, member_id, balances.get(member_id))
                .await?;
        }
        self.bump_version(db, group_id, version).await?;
        Ok(balances)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use migration::MigratorTrait;
    use sea_orm::{Database, TransactionTrait};

    use super::*;
    use crate::{Currency, ErrorKind, Member, NewGroupCmd, SettleCmd};

    async fn ledger_with_group() -> (Ledger, Uuid) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let ledger = Ledger::builder().database(db).build().await.unwrap();
        let group_id = ledger
            .create_group(
                NewGroupCmd::new("Trip", Currency::Eur, "a")
                    .member(Member::new("a", "Ann"))
                    .member(Member::new("b", "Bob")),
            )
            .await
            .unwrap();
        (ledger, group_id)
    }

    fn transfer(from: &str, to: &str, cents: i64) -> BalanceBatch {
        let mut batch = BalanceBatch::new();
        batch.credit(from, Money::new(cents));
        batch.debit(to, Money::new(cents));
        batch
    }

    #[tokio::test]
    async fn stale_version_is_rejected_as_conflict() {
        let (ledger, group_id) = ledger_with_group().await;
        let stale = ledger
            .require_group_model(&ledger.database, group_id)
            .await
            .unwrap()
            .version;

        ledger
            .record_settlement(
                group_id,
                SettleCmd::new("a", "a", "b", Money::new(500), Utc::now()),
            )
            .await
            .unwrap();
        let committed = ledger.balances(group_id).await.unwrap();

        let db_tx = ledger.database.begin().await.unwrap();
        let err = ledger
            .commit_batch(&db_tx, group_id, stale, &transfer("b", "a", 100))
            .await
            .unwrap_err();
        db_tx.rollback().await.unwrap();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(ledger.balances(group_id).await.unwrap(), committed);
    }

    #[tokio::test]
    async fn current_version_commits_and_bumps() {
        let (ledger, group_id) = ledger_with_group().await;
        let version = ledger
            .require_group_model(&ledger.database, group_id)
            .await
            .unwrap()
            .version;

        let db_tx = ledger.database.begin().await.unwrap();
        let balances = ledger
            .commit_batch(&db_tx, group_id, version, &transfer("a", "b", 250))
            .await
            .unwrap();
        db_tx.commit().await.unwrap();

        assert_eq!(balances.get("a"), Money::new(250));
        assert_eq!(ledger.balances(group_id).await.unwrap(), balances);
        let bumped = ledger
            .require_group_model(&ledger.database, group_id)
            .await
            .unwrap()
            .version;
        assert_eq!(bumped, version + 1);
    }

    #[tokio::test]
    async fn unbalanced_batch_writes_nothing() {
        let (ledger, group_id) = ledger_with_group().await;
        let version = ledger
            .require_group_model(&ledger.database, group_id)
            .await
            .unwrap()
            .version;
        let mut lopsided = BalanceBatch::new();
        lopsided.credit("a", Money::new(100));

        let db_tx = ledger.database.begin().await.unwrap();
        let err = ledger
            .commit_batch(&db_tx, group_id, version, &lopsided)
            .await
            .unwrap_err();
        db_tx.rollback().await.unwrap();

        assert!(matches!(err, LedgerError::Unbalanced(_)));
        assert!(ledger.balances(group_id).await.unwrap().iter().all(|(_, b)| b.is_zero()));
    }
}
