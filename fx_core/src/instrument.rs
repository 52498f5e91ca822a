//! Currency-pair instrument names, e.g. `EUR_USD`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::FxError;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z]+_[a-zA-Z]+$").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Instrument {
    name: String,
    base: String,
    quote: String,
}

impl Instrument {
    pub fn new(name: &str) -> Result<Self, FxError> {
        if !name_pattern().is_match(name) {
            return Err(FxError::InvalidInstrument(name.to_string()));
        }
        let upper = name.to_uppercase();
        let mut parts = upper.split('_');
        let base = parts.next().unwrap().to_string();
        let quote = parts.next().unwrap().to_string();
        Ok(Self {
            name: upper,
            base,
            quote,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_name(&self) -> &str {
        &self.base
    }

    pub fn quote_name(&self) -> &str {
        &self.quote
    }

    /// 2 decimals for JPY-quoted pairs, 4 otherwise.
    /// <https://www.fxpro.com/trading-tools/calculators/pip>
    pub fn pip_point(&self) -> i32 {
        if self.quote == "JPY" {
            2
        } else {
            4
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_eur_usd() {
        let i = Instrument::new("eur_usd").unwrap();
        assert_eq!(i.base_name(), "EUR");
        assert_eq!(i.quote_name(), "USD");
        assert_eq!(i.name(), "EUR_USD");
        assert_eq!(i.pip_point(), 4);
    }

    #[test]
    fn jpy_quote_has_two_pip_decimals() {
        let i = Instrument::new("USD_JPY").unwrap();
        assert_eq!(i.pip_point(), 2);
    }

    #[test]
    fn rejects_malformed_name() {
        let err = Instrument::new("123456").unwrap_err();
        assert!(matches!(err, FxError::InvalidInstrument(_)));
    }
}
