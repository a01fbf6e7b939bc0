//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! mapping logic so the ledger decodes stored rows consistently.

use uuid::Uuid;

use crate::{Currency, LedgerError, ResultLedger};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultLedger<Uuid> {
    Uuid::parse_str(value).map_err(|_| LedgerError::InvalidId(format!("invalid {label} id")))
}

/// Parse a currency code stored in the DB into a strongly typed `Currency`.
pub(crate) fn model_currency(value: &str) -> ResultLedger<Currency> {
    Currency::try_from(value)
        .map_err(|_| LedgerError::InvalidId(format!("invalid stored currency: {value}")))
}

/// Ensure a stored currency matches the group currency.
pub(crate) fn ensure_group_currency(group_currency: Currency, actual: Currency) -> ResultLedger<()> {
    if group_currency != actual {
        return Err(LedgerError::CurrencyMismatch(format!(
            "group currency is {}, got {}",
            group_currency.code(),
            actual.code()
        )));
    }
    Ok(())
}

/// Trim optional free text, mapping blank strings to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Trim a required name, rejecting blank input with the given error variant.
pub(crate) fn normalize_required_name(
    value: &str,
    label: &str,
    err: fn(String) -> LedgerError,
) -> ResultLedger<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(err(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}
