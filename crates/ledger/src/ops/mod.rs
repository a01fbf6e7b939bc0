use std::{fmt, future::Future, sync::Arc};

use sea_orm::DatabaseConnection;
use serde::Deserialize;

use crate::{AllocationPolicy, LedgerError, LedgerEvent, LedgerObserver, ResultLedger};

mod access;
mod balances;
mod expenses;
mod groups;
mod settlements;
mod store;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Tunables of a [`Ledger`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Extra attempts of a whole read-modify-write after a concurrent update.
    pub max_conflict_retries: u32,
    pub allocation_policy: AllocationPolicy,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            allocation_policy: AllocationPolicy::default(),
        }
    }
}

pub struct Ledger {
    database: DatabaseConnection,
    settings: LedgerSettings,
    observers: Vec<Arc<dyn LedgerObserver>>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("database", &self.database)
            .field("settings", &self.settings)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Ledger {
    /// Return a builder for `Ledger`. Help to build the struct.
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::default()
    }

    pub fn settings(&self) -> LedgerSettings {
        self.settings
    }

    fn notify(&self, event: LedgerEvent) {
        for observer in &self.observers {
            observer.notify(&event);
        }
    }

    async fn retry_on_conflict<T, F, Fut>(&self, op: &str, attempt: F) -> ResultLedger<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ResultLedger<T>>,
    {
        retry_on_conflict(self.settings.max_conflict_retries, op, attempt).await
    }
}

/// Re-runs `attempt` while it fails with a retryable error, at most
/// `max_retries` extra times.
pub(crate) async fn retry_on_conflict<T, F, Fut>(
    max_retries: u32,
    op: &str,
    mut attempt: F,
) -> ResultLedger<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ResultLedger<T>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Err(err) if err.is_retryable() && retries < max_retries => {
                retries += 1;
                tracing::warn!("{op}: {err}, retrying ({retries}/{max_retries})");
            }
            Err(LedgerError::Conflict(msg)) => {
                return Err(LedgerError::Conflict(format!(
                    "{op} gave up after {retries} retries: {msg}"
                )));
            }
            result => return result,
        }
    }
}

/// The builder for `Ledger`
#[derive(Default)]
pub struct LedgerBuilder {
    database: DatabaseConnection,
    settings: LedgerSettings,
    observers: Vec<Arc<dyn LedgerObserver>>,
}

impl LedgerBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> LedgerBuilder {
        self.database = db;
        self
    }

    pub fn settings(mut self, settings: LedgerSettings) -> LedgerBuilder {
        self.settings = settings;
        self
    }

    /// Register an observer notified after every committed write.
    pub fn observer(mut self, observer: Arc<dyn LedgerObserver>) -> LedgerBuilder {
        self.observers.push(observer);
        self
    }

    /// Construct `Ledger`
    pub async fn build(self) -> ResultLedger<Ledger> {
        Ok(Ledger {
            database: self.database,
            settings: self.settings,
            observers: self.observers,
        })
    }
}
