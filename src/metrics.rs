// src/metrics.rs
use crate::models::{
    DerivedPortfolioRow, DerivedWatchlistRow, PortfolioLot, PortfolioTotals, PriceQuote, Symbol,
};
use std::collections::HashMap;

fn quote_for(quotes: &HashMap<Symbol, PriceQuote>, symbol: &Symbol) -> PriceQuote {
    quotes.get(symbol).copied().unwrap_or_default()
}

pub fn derive_watchlist(
    symbols: &[Symbol],
    quotes: &HashMap<Symbol, PriceQuote>,
) -> Vec<DerivedWatchlistRow> {
    symbols
        .iter()
        .map(|symbol| {
            let quote = quote_for(quotes, symbol);
            let change = match (quote.current, quote.previous) {
                (Some(current), Some(previous)) => Some(current - previous),
                _ => None,
            };
            let pct_change = match (change, quote.previous) {
                (Some(change), Some(previous)) if previous != 0.0 => {
                    Some(change / previous * 100.0)
                }
                _ => None,
            };
            DerivedWatchlistRow {
                symbol: symbol.clone(),
                current: quote.current,
                previous: quote.previous,
                change,
                pct_change,
            }
        })
        .collect()
}

pub fn derive_portfolio(
    lots: &[PortfolioLot],
    quotes: &HashMap<Symbol, PriceQuote>,
) -> (Vec<DerivedPortfolioRow>, PortfolioTotals) {
    let mut totals = PortfolioTotals::default();

    let rows = lots
        .iter()
        .map(|lot| {
            let current = quote_for(quotes, &lot.symbol).current;
            let invested = lot.buy_price * lot.quantity;
            let current_value = current.map(|price| price * lot.quantity);
            let pl = current_value.map(|value| value - invested);
            let pl_pct = pl.filter(|_| invested != 0.0).map(|pl| pl / invested * 100.0);

            totals.total_invested += invested;
            if let Some(value) = current_value {
                totals.total_current += value;
            }

            DerivedPortfolioRow {
                symbol: lot.symbol.clone(),
                quantity: lot.quantity,
                buy_price: lot.buy_price,
                invested,
                current,
                current_value,
                pl,
                pl_pct,
            }
        })
        .collect();

    totals.total_pl = totals.total_current - totals.total_invested;
    totals.total_pl_pct = if totals.total_invested != 0.0 {
        totals.total_pl / totals.total_invested * 100.0
    } else {
        0.0
    };

    (rows, totals)
}
