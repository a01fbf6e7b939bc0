use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// ISO currency code a group is denominated in.
///
/// The currency is chosen when the group is created and never changes
/// afterwards; every expense and settlement of the group is stored in it.
///
/// ## Minor units
///
/// The ledger stores monetary values as an `i64` number of **minor units**
/// (see `Money`). Only currencies with two minor units are supported, so
/// `10.50 HKD` ⇄ `1050` for every variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Hkd,
    Chf,
    Cad,
    Aud,
    Sgd,
    Twd,
    Nzd,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
            Currency::Hkd => "HKD",
            Currency::Chf => "CHF",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
            Currency::Sgd => "SGD",
            Currency::Twd => "TWD",
            Currency::Nzd => "NZD",
        }
    }

    /// Number of fraction digits used when formatting/parsing amounts.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        2
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            "GBP" => Ok(Currency::Gbp),
            "HKD" => Ok(Currency::Hkd),
            "CHF" => Ok(Currency::Chf),
            "CAD" => Ok(Currency::Cad),
            "AUD" => Ok(Currency::Aud),
            "SGD" => Ok(Currency::Sgd),
            "TWD" => Ok(Currency::Twd),
            "NZD" => Ok(Currency::Nzd),
            other => Err(LedgerError::CurrencyMismatch(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!(Currency::try_from("hkd").unwrap(), Currency::Hkd);
        assert_eq!(Currency::try_from(" Eur ").unwrap(), Currency::Eur);
        assert!(Currency::try_from("JPY").is_err());
    }

    #[test]
    fn code_round_trips_through_parse() {
        for currency in [Currency::Usd, Currency::Gbp, Currency::Twd] {
            assert_eq!(Currency::try_from(currency.code()).unwrap(), currency);
        }
    }
}
