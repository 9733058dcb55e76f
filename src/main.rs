// src/main.rs
use env_logger::Builder;
use log::{error, info, warn, LevelFilter};
use quote_tracker::{api, run_refresher, Config, QuoteCache, Session, Tracker, YahooSource};
use std::sync::Arc;
use tokio::sync::watch;
use warp::Filter;

#[tokio::main]
async fn main() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp_secs()
        .parse_default_env()
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };
    info!("Starting the quote tracker with {:?}", config);

    let source = match YahooSource::new(&config.source_url) {
        Ok(source) => Arc::new(source),
        Err(e) => {
            error!("Failed to build price source: {}", e);
            return;
        }
    };
    let cache = QuoteCache::new(source, config.cache_ttl, config.fetch_timeout);

    let mut session = Session::new();
    for raw in &config.watchlist {
        if let Err(e) = session.add_symbol(raw) {
            warn!("Skipping watchlist entry {:?}: {}", raw, e);
        }
    }

    let (tracker, refresh_rx) = Tracker::new(session, cache);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let refresher = tokio::spawn(run_refresher(
        tracker.clone(),
        refresh_rx,
        config.refresh_interval,
        shutdown_rx,
    ));

    let routes = api::routes(tracker).recover(api::handle_rejection);
    let bound = warp::serve(routes).try_bind_with_graceful_shutdown(config.addr, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutting down");
        let _ = shutdown_tx.send(true);
    });

    match bound {
        Ok((addr, server)) => {
            info!("Server running on http://{}", addr);
            server.await;
        }
        Err(e) => {
            error!("Failed to bind {}: {}", config.addr, e);
            refresher.abort();
            return;
        }
    }

    if let Err(e) = refresher.await {
        error!("Refresher task failed: {}", e);
    }
}
