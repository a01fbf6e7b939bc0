//! Post-commit notifications.
//!
//! Every successful balance-affecting write emits one [`LedgerEvent`] carrying
//! the group's balances as committed. Observers run after the DB transaction
//! and cannot fail the write.

use serde::Serialize;
use uuid::Uuid;

use crate::Balances;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    ExpenseCreated {
        group_id: Uuid,
        expense_id: Uuid,
        balances: Balances,
    },
    ExpenseDeleted {
        group_id: Uuid,
        expense_id: Uuid,
        balances: Balances,
    },
    SettlementRecorded {
        group_id: Uuid,
        settlement_id: Uuid,
        balances: Balances,
    },
    SettlementDeleted {
        group_id: Uuid,
        settlement_id: Uuid,
        balances: Balances,
    },
}

impl LedgerEvent {
    pub fn group_id(&self) -> Uuid {
        match self {
            Self::ExpenseCreated { group_id, .. }
            | Self::ExpenseDeleted { group_id, .. }
            | Self::SettlementRecorded { group_id, .. }
            | Self::SettlementDeleted { group_id, .. } => *group_id,
        }
    }

    pub fn balances(&self) -> &Balances {
        match self {
            Self::ExpenseCreated { balances, .. }
            | Self::ExpenseDeleted { balances, .. }
            | Self::SettlementRecorded { balances, .. }
            | Self::SettlementDeleted { balances, .. } => balances,
        }
    }
}

/// Receives ledger events, e.g. to refresh cross-group summaries.
pub trait LedgerObserver: Send + Sync {
    fn notify(&self, event: &LedgerEvent);
}
