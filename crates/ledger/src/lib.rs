//! Group ledger engine for shared trip expenses.
//!
//! A [`Ledger`] keeps, per group, the signed balance of every member and the
//! expenses and settlements that produced it. Balances always sum to zero:
//! every write applies a zero-sum [`BalanceBatch`] atomically, and deleting an
//! expense or settlement applies the exact inverse of what creating it did.
//!
//! ```no_run
//! # async fn run(db: sea_orm::DatabaseConnection) -> Result<(), ledger::LedgerError> {
//! use chrono::Utc;
//! use ledger::{Currency, ExpenseCmd, Ledger, Member, Money, NewGroupCmd};
//!
//! let ledger = Ledger::builder().database(db).build().await?;
//! let group_id = ledger
//!     .create_group(
//!         NewGroupCmd::new("Lisbon", Currency::Eur, "ann")
//!             .member(Member::new("ann", "Ann"))
//!             .member(Member::new("bob", "Bob")),
//!     )
//!     .await?;
//! ledger
//!     .create_expense(
//!         group_id,
//!         ExpenseCmd::new("ann", "Dinner", Money::new(6_000), Utc::now())
//!             .paid_by("ann")
//!             .participants(["ann", "bob"]),
//!     )
//!     .await?;
//! let plan = ledger.settlement_plan(group_id).await?;
//! # let _ = plan;
//! # Ok(())
//! # }
//! ```

pub use balances::{BalanceBatch, Balances};
pub use commands::{ExpenseCmd, ExpenseMeta, NewGroupCmd, SettleCmd};
pub use currency::Currency;
pub use error::{ErrorKind, LedgerError};
pub use events::{LedgerEvent, LedgerObserver};
pub use expenses::Expense;
pub use groups::Group;
pub use members::{Member, MemberKind, MemberRole};
pub use money::{Money, absorb_remainder, checked_sum, floor_cents, round_cents};
pub use ops::{Ledger, LedgerBuilder, LedgerSettings};
pub use planner::{Transfer, plan};
pub use settlements::SettlementRecord;
pub use split::{
    AllocationPolicy, ExactAdjustment, MemberAmount, SplitMethod, SplitOutcome, SplitRequest,
    allocate, normalize_payers,
};

mod balances;
mod commands;
mod currency;
mod error;
mod events;
mod expense_shares;
mod expenses;
mod groups;
mod members;
mod money;
mod ops;
mod planner;
mod settlements;
mod split;
mod util;

type ResultLedger<T> = Result<T, LedgerError>;
