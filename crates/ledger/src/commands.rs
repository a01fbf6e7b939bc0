//! Command structs for ledger operations.
//!
//! These types group parameters for write operations (group creation,
//! expenses, settlements), keeping call sites readable and avoiding long
//! argument lists.

use chrono::{DateTime, Utc};

use crate::{Currency, Member, MemberAmount, Money, SplitMethod};

/// Create a group with its initial roster.
#[derive(Clone, Debug)]
pub struct NewGroupCmd {
    pub name: String,
    pub currency: Currency,
    pub members: Vec<Member>,
    pub created_by: String,
}

impl NewGroupCmd {
    #[must_use]
    pub fn new(name: impl Into<String>, currency: Currency, created_by: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            currency,
            members: Vec::new(),
            created_by: created_by.into(),
        }
    }

    #[must_use]
    pub fn member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    #[must_use]
    pub fn members(mut self, members: impl IntoIterator<Item = Member>) -> Self {
        self.members.extend(members);
        self
    }
}

/// Common metadata for expense creation.
#[derive(Clone, Debug)]
pub struct ExpenseMeta {
    pub category: Option<String>,
    pub note: Option<String>,
    pub idempotency_key: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ExpenseMeta {
    #[must_use]
    pub fn new(occurred_at: DateTime<Utc>) -> Self {
        Self {
            category: None,
            note: None,
            idempotency_key: None,
            occurred_at,
        }
    }
}

/// Create an expense.
///
/// `currency` defaults to none, meaning "the group's currency"; when set it
/// must match.
#[derive(Clone, Debug)]
pub struct ExpenseCmd {
    pub description: String,
    pub amount: Money,
    pub currency: Option<Currency>,
    pub payers: Vec<MemberAmount>,
    pub participants: Vec<String>,
    pub split: SplitMethod,
    pub meta: ExpenseMeta,
    pub member_id: String,
}

impl ExpenseCmd {
    #[must_use]
    pub fn new(
        member_id: impl Into<String>,
        description: impl Into<String>,
        amount: Money,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            description: description.into(),
            amount,
            currency: None,
            payers: Vec::new(),
            participants: Vec::new(),
            split: SplitMethod::Equal,
            meta: ExpenseMeta::new(occurred_at),
            member_id: member_id.into(),
        }
    }

    /// Single payer covering the whole amount.
    #[must_use]
    pub fn paid_by(mut self, member_id: impl Into<String>) -> Self {
        self.payers = vec![MemberAmount::new(member_id, self.amount)];
        self
    }

    #[must_use]
    pub fn payer(mut self, member_id: impl Into<String>, amount: Money) -> Self {
        self.payers.push(MemberAmount::new(member_id, amount));
        self
    }

    #[must_use]
    pub fn participants<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.participants = members.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn split(mut self, split: SplitMethod) -> Self {
        self.split = split;
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.meta.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.meta.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.meta.idempotency_key = Some(key.into());
        self
    }
}

/// Record a payment from `from` to `to`.
#[derive(Clone, Debug)]
pub struct SettleCmd {
    pub from: String,
    pub to: String,
    pub amount: Money,
    pub currency: Option<Currency>,
    pub method: Option<String>,
    pub remarks: Option<String>,
    pub idempotency_key: Option<String>,
    pub settled_at: DateTime<Utc>,
    pub member_id: String,
}

impl SettleCmd {
    #[must_use]
    pub fn new(
        member_id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
        amount: Money,
        settled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
            currency: None,
            method: None,
            remarks: None,
            idempotency_key: None,
            settled_at,
            member_id: member_id.into(),
        }
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}
