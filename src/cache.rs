// src/cache.rs
use crate::error::FetchError;
use crate::models::{PriceQuote, Symbol};
use crate::source::{lookup_quote, PriceSource};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration, Instant};

struct CacheEntry {
    fetched_at: Instant,
    quote: PriceQuote,
}

/// Short-lived quote cache in front of a [`PriceSource`].
///
/// Failed lookups are stored as absent quotes, so a broken symbol is retried
/// at most once per TTL.
pub struct QuoteCache {
    source: Arc<dyn PriceSource>,
    ttl: Duration,
    fetch_timeout: Duration,
    entries: Mutex<HashMap<Symbol, CacheEntry>>,
}

impl QuoteCache {
    pub fn new(source: Arc<dyn PriceSource>, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            source,
            ttl,
            fetch_timeout,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Quotes for every distinct symbol. Faults degrade to absent quotes.
    pub async fn get_quotes(&self, symbols: &[Symbol]) -> HashMap<Symbol, PriceQuote> {
        let mut entries = self.entries.lock().await;
        let mut quotes = HashMap::with_capacity(symbols.len());

        for symbol in symbols {
            if quotes.contains_key(symbol) {
                continue;
            }

            if let Some(entry) = entries.get(symbol) {
                if entry.fetched_at.elapsed() < self.ttl {
                    debug!("Cache hit for {}", symbol);
                    quotes.insert(symbol.clone(), entry.quote);
                    continue;
                }
            }

            let quote = self.fetch(symbol).await;
            entries.insert(
                symbol.clone(),
                CacheEntry {
                    fetched_at: Instant::now(),
                    quote,
                },
            );
            quotes.insert(symbol.clone(), quote);
        }

        quotes
    }

    async fn fetch(&self, symbol: &Symbol) -> PriceQuote {
        let result = match timeout(
            self.fetch_timeout,
            lookup_quote(self.source.as_ref(), symbol),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(symbol.to_string())),
        };

        result.unwrap_or_else(|e| {
            warn!("Failed to fetch quote for {}: {}", symbol, e);
            PriceQuote::absent()
        })
    }

    /// Drops entries older than the TTL and returns how many were removed.
    pub async fn evict_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
