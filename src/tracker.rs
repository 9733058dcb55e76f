// src/tracker.rs
use crate::cache::QuoteCache;
use crate::metrics::{derive_portfolio, derive_watchlist};
use crate::models::{QuoteRow, Snapshot};
use crate::session::Session;
use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock, RwLockReadGuard};
use tokio::time::{self, Duration, MissedTickBehavior};

/// Shared state of a running tracker: the session, the quote cache and the
/// last published snapshot.
pub struct Tracker {
    session: RwLock<Session>,
    cache: QuoteCache,
    snapshot: RwLock<Option<Snapshot>>,
    refresh_tx: mpsc::Sender<()>,
}

impl Tracker {
    /// The returned receiver feeds [`run_refresher`].
    pub fn new(session: Session, cache: QuoteCache) -> (Arc<Self>, mpsc::Receiver<()>) {
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let tracker = Arc::new(Self {
            session: RwLock::new(session),
            cache,
            snapshot: RwLock::new(None),
            refresh_tx,
        });
        (tracker, refresh_rx)
    }

    pub async fn session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().await
    }

    pub async fn update_session<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        let mut session = self.session.write().await;
        f(&mut session)
    }

    pub async fn latest(&self) -> Option<Snapshot> {
        self.snapshot.read().await.clone()
    }

    /// Asks the refresher for a pass. Requests made while one is pending collapse into it.
    pub fn request_refresh(&self) {
        if self.refresh_tx.try_send(()).is_err() {
            debug!("Refresh already pending");
        }
    }

    /// Fetch, derive and publish one snapshot.
    pub async fn run_pass(&self) -> Snapshot {
        let (symbols, watchlist, lots) = {
            let session = self.session.read().await;
            (
                session.symbols_to_fetch(),
                session.watchlist().to_vec(),
                session.portfolio().to_vec(),
            )
        };

        let quotes = self.cache.get_quotes(&symbols).await;
        let evicted = self.cache.evict_expired().await;
        if evicted > 0 {
            debug!("Evicted {} stale quotes", evicted);
        }

        let watchlist_rows = derive_watchlist(&watchlist, &quotes);
        let (portfolio_rows, totals) = derive_portfolio(&lots, &quotes);
        let quote_rows: Vec<QuoteRow> = symbols
            .iter()
            .map(|symbol| {
                let quote = quotes.get(symbol).copied().unwrap_or_default();
                QuoteRow {
                    symbol: symbol.clone(),
                    current: quote.current,
                    previous: quote.previous,
                }
            })
            .collect();

        let unpriced = quote_rows.iter().filter(|q| q.current.is_none()).count();
        info!(
            "Refreshed {} symbols ({} without a price), portfolio value {:.2}",
            quote_rows.len(),
            unpriced,
            totals.total_current
        );

        let snapshot = Snapshot {
            updated_at: Utc::now(),
            watchlist: watchlist_rows,
            portfolio: portfolio_rows,
            totals,
            quotes: quote_rows,
        };
        *self.snapshot.write().await = Some(snapshot.clone());
        snapshot
    }
}

/// Runs a pass on every tick or refresh request until `shutdown` flips.
/// Passes run back to back on this task and never overlap.
pub async fn run_refresher(
    tracker: Arc<Tracker>,
    mut requests: mpsc::Receiver<()>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Refreshing quotes every {}s", interval.as_secs());

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            Some(()) = requests.recv() => {
                debug!("Refresh requested");
                ticker.reset();
            }
            _ = shutdown.changed() => break,
        }
        tracker.run_pass().await;
    }

    info!("Refresher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::{PriceQuote, Symbol};
    use crate::source::PriceSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FixedSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceSource for FixedSource {
        async fn live_quote(&self, symbol: &Symbol) -> Result<PriceQuote, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match symbol.as_str() {
                "AAPL" => Ok(PriceQuote::new(150.0, 140.0)),
                _ => Err(FetchError::NoData(symbol.to_string())),
            }
        }

        async fn daily_closes(&self, symbol: &Symbol) -> Result<Vec<f64>, FetchError> {
            Err(FetchError::NoData(symbol.to_string()))
        }
    }

    fn tracker_with(source: &Arc<FixedSource>) -> (Arc<Tracker>, mpsc::Receiver<()>) {
        let cache = QuoteCache::new(
            source.clone(),
            Duration::from_secs(30),
            Duration::from_secs(5),
        );
        Tracker::new(Session::new(), cache)
    }

    #[tokio::test]
    async fn pass_publishes_snapshot() {
        let source = Arc::new(FixedSource::default());
        let (tracker, _rx) = tracker_with(&source);
        tracker
            .update_session(|s| {
                s.add_symbol("aapl").unwrap();
                s.add_symbol("XYZ").unwrap();
                s.add_lot("AAPL", 10.0, 100.0).unwrap();
            })
            .await;

        assert!(tracker.latest().await.is_none());
        let snapshot = tracker.run_pass().await;

        assert_eq!(snapshot.watchlist.len(), 2);
        assert_eq!(snapshot.watchlist[0].change, Some(10.0));
        assert_eq!(snapshot.watchlist[1].current, None);
        assert_eq!(snapshot.watchlist[1].change, None);
        assert_eq!(snapshot.portfolio[0].pl, Some(500.0));
        assert_eq!(snapshot.totals.total_current, 1500.0);

        let symbols: Vec<_> = snapshot.quotes.iter().map(|q| q.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "XYZ"]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(tracker.latest().await.is_some());
    }

    #[tokio::test]
    async fn empty_session_produces_empty_snapshot() {
        let source = Arc::new(FixedSource::default());
        let (tracker, _rx) = tracker_with(&source);

        let snapshot = tracker.run_pass().await;

        assert!(snapshot.watchlist.is_empty());
        assert!(snapshot.portfolio.is_empty());
        assert_eq!(snapshot.totals.total_pl_pct, 0.0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn refresher_runs_on_request_and_stops_on_shutdown() {
        let source = Arc::new(FixedSource::default());
        let (tracker, rx) = tracker_with(&source);
        tracker.update_session(|s| s.add_symbol("AAPL").map(|_| ())).await.unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_refresher(
            tracker.clone(),
            rx,
            Duration::from_secs(300),
            shutdown_rx,
        ));

        // First tick fires immediately.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let first = tracker.latest().await.unwrap();
        assert_eq!(first.watchlist.len(), 1);

        tracker.update_session(|s| s.add_symbol("MSFT").map(|_| ())).await.unwrap();
        tracker.request_refresh();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = tracker.latest().await.unwrap();
        assert_eq!(second.watchlist.len(), 2);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        // AAPL stays cached, MSFT is looked up once.
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
