// src/lib.rs
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod session;
pub mod source;
pub mod tracker;

pub use cache::QuoteCache;
pub use config::Config;
pub use error::{ApiError, ConfigError, FetchError, ValidationError};
pub use metrics::{derive_portfolio, derive_watchlist};
pub use models::{
    DerivedPortfolioRow, DerivedWatchlistRow, PortfolioLot, PortfolioTotals, PriceQuote, QuoteRow,
    Snapshot, Symbol,
};
pub use session::{AddOutcome, Session};
pub use source::{lookup_quote, PriceSource, YahooSource};
pub use tracker::{run_refresher, Tracker};
