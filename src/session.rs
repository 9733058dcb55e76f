// src/session.rs
use crate::error::ValidationError;
use crate::models::{PortfolioLot, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyExists,
}

/// Watchlist and portfolio for one running tracker. Nothing here is persisted.
#[derive(Debug, Default, Clone)]
pub struct Session {
    watchlist: Vec<Symbol>,
    portfolio: Vec<PortfolioLot>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watchlist(&self) -> &[Symbol] {
        &self.watchlist
    }

    pub fn portfolio(&self) -> &[PortfolioLot] {
        &self.portfolio
    }

    pub fn add_symbol(&mut self, raw: &str) -> Result<(Symbol, AddOutcome), ValidationError> {
        let symbol = Symbol::parse(raw)?;
        if self.watchlist.contains(&symbol) {
            return Ok((symbol, AddOutcome::AlreadyExists));
        }
        self.watchlist.push(symbol.clone());
        Ok((symbol, AddOutcome::Added))
    }

    /// Returns the removed symbol, or `None` if it was not on the watchlist.
    pub fn remove_symbol(&mut self, raw: &str) -> Option<Symbol> {
        let symbol = Symbol::parse(raw).ok()?;
        let pos = self.watchlist.iter().position(|s| *s == symbol)?;
        Some(self.watchlist.remove(pos))
    }

    pub fn add_lot(
        &mut self,
        raw: &str,
        quantity: f64,
        buy_price: f64,
    ) -> Result<&PortfolioLot, ValidationError> {
        let symbol = Symbol::parse(raw)?;
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(ValidationError::InvalidQuantity(quantity));
        }
        if !buy_price.is_finite() || buy_price < 0.0 {
            return Err(ValidationError::InvalidBuyPrice(buy_price));
        }
        self.portfolio.push(PortfolioLot {
            symbol,
            quantity,
            buy_price,
        });
        Ok(&self.portfolio[self.portfolio.len() - 1])
    }

    pub fn remove_lot(&mut self, index: usize) -> Result<PortfolioLot, ValidationError> {
        if index >= self.portfolio.len() {
            return Err(ValidationError::LotOutOfRange {
                index,
                len: self.portfolio.len(),
            });
        }
        Ok(self.portfolio.remove(index))
    }

    /// Watchlist first, then portfolio symbols, first occurrence wins.
    pub fn symbols_to_fetch(&self) -> Vec<Symbol> {
        let mut out: Vec<Symbol> = Vec::new();
        for symbol in self
            .watchlist
            .iter()
            .chain(self.portfolio.iter().map(|lot| &lot.symbol))
        {
            if !out.contains(symbol) {
                out.push(symbol.clone());
            }
        }
        out
    }
}
