// src/models.rs
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Canonical ticker: trimmed and uppercased, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let sym = raw.trim().to_uppercase();
        if sym.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        Ok(Symbol(sym))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Latest price and previous close. `None` means the source had no data.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PriceQuote {
    pub current: Option<f64>,
    pub previous: Option<f64>,
}

impl PriceQuote {
    pub fn new(current: f64, previous: f64) -> Self {
        Self {
            current: Some(current),
            previous: Some(previous),
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.current.is_some() && self.previous.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioLot {
    pub symbol: Symbol,
    pub quantity: f64,
    pub buy_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedWatchlistRow {
    pub symbol: Symbol,
    #[serde(serialize_with = "cents_opt")]
    pub current: Option<f64>,
    #[serde(serialize_with = "cents_opt")]
    pub previous: Option<f64>,
    #[serde(serialize_with = "cents_opt")]
    pub change: Option<f64>,
    #[serde(serialize_with = "cents_opt")]
    pub pct_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedPortfolioRow {
    pub symbol: Symbol,
    pub quantity: f64,
    #[serde(serialize_with = "cents")]
    pub buy_price: f64,
    #[serde(serialize_with = "cents")]
    pub invested: f64,
    #[serde(serialize_with = "cents_opt")]
    pub current: Option<f64>,
    #[serde(serialize_with = "cents_opt")]
    pub current_value: Option<f64>,
    #[serde(serialize_with = "cents_opt")]
    pub pl: Option<f64>,
    #[serde(serialize_with = "cents_opt")]
    pub pl_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PortfolioTotals {
    #[serde(serialize_with = "cents")]
    pub total_invested: f64,
    #[serde(serialize_with = "cents")]
    pub total_current: f64,
    #[serde(serialize_with = "cents")]
    pub total_pl: f64,
    #[serde(serialize_with = "cents")]
    pub total_pl_pct: f64,
}

/// Raw quote as fetched, one per distinct symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteRow {
    pub symbol: Symbol,
    #[serde(serialize_with = "cents_opt")]
    pub current: Option<f64>,
    #[serde(serialize_with = "cents_opt")]
    pub previous: Option<f64>,
}

/// Output of one refresh pass.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub updated_at: DateTime<Utc>,
    pub watchlist: Vec<DerivedWatchlistRow>,
    pub portfolio: Vec<DerivedPortfolioRow>,
    pub totals: PortfolioTotals,
    pub quotes: Vec<QuoteRow>,
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn cents<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round2(*v))
}

fn cents_opt<S: Serializer>(v: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(v) => s.serialize_some(&round2(*v)),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn symbol_is_trimmed_and_uppercased() {
        assert_eq!(Symbol::parse("  bhp.ax ").unwrap().as_str(), "BHP.AX");
    }

    #[test]
    fn blank_symbol_is_rejected() {
        assert_eq!(Symbol::parse("   "), Err(ValidationError::EmptySymbol));
        assert_eq!(Symbol::parse(""), Err(ValidationError::EmptySymbol));
    }

    #[test]
    fn rows_serialize_rounded_to_cents() {
        let row = DerivedWatchlistRow {
            symbol: Symbol::parse("AAPL").unwrap(),
            current: Some(150.0),
            previous: Some(140.0),
            change: Some(10.0),
            pct_change: Some(10.0 / 140.0 * 100.0),
        };
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({
                "symbol": "AAPL",
                "current": 150.0,
                "previous": 140.0,
                "change": 10.0,
                "pct_change": 7.14
            })
        );
    }

    #[test]
    fn absent_fields_serialize_as_null() {
        let row = QuoteRow {
            symbol: Symbol::parse("XYZ").unwrap(),
            current: None,
            previous: None,
        };
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({"symbol": "XYZ", "current": null, "previous": null})
        );
    }
}
