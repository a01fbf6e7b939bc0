use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{
    Balances, LedgerError, Money, ResultLedger, Transfer, plan, util::ensure_group_currency,
};

use super::{Ledger, access::GroupSnapshot, with_tx};

impl Ledger {
    /// Current balances of every member of the group.
    pub async fn balances(&self, group_id: Uuid) -> ResultLedger<Balances> {
        self.require_group_model(&self.database, group_id).await?;
        self.load_balances(&self.database, group_id).await
    }

    /// Suggested transfers that would settle the group.
    ///
    /// Read-only; the result may be stale as soon as another write commits.
    pub async fn settlement_plan(&self, group_id: Uuid) -> ResultLedger<Vec<Transfer>> {
        let balances = self.balances(group_id).await?;
        Ok(plan(&balances))
    }

    /// Rebuilds the stored balances by replaying every expense and settlement
    /// of the group.
    ///
    /// - Validates every stored record against the group currency.
    /// - Fails with `Unbalanced` if the replayed balances do not sum to zero.
    pub async fn recompute_balances(&self, group_id: Uuid) -> ResultLedger<Balances> {
        let (balances, repaired) = self
            .retry_on_conflict("recompute balances", move || {
                self.recompute_balances_attempt(group_id)
            })
            .await?;
        if repaired {
            tracing::warn!(
                "balances of group {} differed from the ledger and were rewritten",
                group_id
            );
        } else {
            tracing::info!("balances of group {} verified", group_id);
        }
        Ok(balances)
    }

    async fn recompute_balances_attempt(&self, group_id: Uuid) -> ResultLedger<(Balances, bool)> {
        with_tx!(self, |db_tx| {
            let GroupSnapshot { group, version } = self.load_group(&db_tx, group_id).await?;

            let mut replayed = Balances::new();
            for member in &group.members {
                replayed.set(member.id.clone(), Money::ZERO);
            }
            for expense in self.load_expenses(&db_tx, group_id).await? {
                ensure_group_currency(group.currency, expense.currency)?;
                let batch = expense.balance_batch();
                batch.ensure_zero_sum()?;
                replayed.apply(&batch)?;
            }
            for record in self.load_settlements(&db_tx, group_id).await? {
                ensure_group_currency(group.currency, record.currency)?;
                replayed.apply(&record.balance_batch())?;
            }
            replayed.ensure_balanced()?;

            let stored = self.load_balances(&db_tx, group_id).await?;
            for (member_id, _) in stored.iter() {
                if replayed.iter().all(|(id, _)| id != member_id) {
                    replayed.set(member_id, Money::ZERO);
                }
            }
            for (member_id, balance) in replayed.iter() {
                self.write_balance(&db_tx, group_id, member_id, balance)
                    .await?;
            }
            self.bump_version(&db_tx, group_id, version).await?;

            let repaired = stored != replayed;
            Ok::<_, LedgerError>((replayed, repaired))
        })
    }
}
