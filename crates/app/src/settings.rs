//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and `TRIPSPLIT_*` environment variables, e.g.
//! `TRIPSPLIT_APP__LEVEL=debug`.
//!
//! ```toml
//! [app]
//! level = "info"
//!
//! [database]
//! sqlite = "tripsplit.db"
//!
//! [ledger]
//! max_conflict_retries = 3
//! allocation_policy = "last_participant"
//! ```

use config::{Config, ConfigError, Environment, File};
use ledger::LedgerSettings;
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "settings";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("tripsplit.db".to_string())
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Self::Memory => "sqlite::memory:".to_string(),
            Self::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub ledger: LedgerSettings,
}

impl Settings {
    /// Loads settings from `path` (required when given) or from an optional
    /// `settings.toml` in the working directory.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(
                File::with_name(path.unwrap_or(DEFAULT_CONFIG_PATH)).required(path.is_some()),
            )
            .add_source(Environment::with_prefix("TRIPSPLIT").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;
    use ledger::AllocationPolicy;

    use super::*;

    fn from_toml(raw: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let settings = from_toml("");
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database.url(), "sqlite:tripsplit.db?mode=rwc");
        assert_eq!(settings.ledger, LedgerSettings::default());
    }

    #[test]
    fn ledger_section_is_read() {
        let settings = from_toml(
            r#"
            database = "memory"

            [ledger]
            max_conflict_retries = 5
            allocation_policy = "payers_absorb_residual"
            "#,
        );
        assert_eq!(settings.database, Database::Memory);
        assert_eq!(settings.ledger.max_conflict_retries, 5);
        assert_eq!(
            settings.ledger.allocation_policy,
            AllocationPolicy::PayersAbsorbResidual
        );
    }
}
