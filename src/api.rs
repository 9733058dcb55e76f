// src/api.rs
use crate::error::ApiError;
use crate::session::AddOutcome;
use crate::tracker::Tracker;
use log::{info, warn};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

#[derive(Deserialize)]
pub struct AddSymbolRequest {
    pub symbol: String,
}

#[derive(Deserialize)]
pub struct AddLotRequest {
    pub symbol: String,
    pub quantity: f64,
    pub buy_price: f64,
}

pub fn routes(
    tracker: Arc<Tracker>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list_watchlist = warp::path!("watchlist")
        .and(warp::get())
        .and(with_tracker(tracker.clone()))
        .and_then(list_watchlist_handler);

    let add_symbol = warp::path!("watchlist")
        .and(warp::post())
        .and(with_tracker(tracker.clone()))
        .and(warp::body::json())
        .and_then(add_symbol_handler);

    let remove_symbol = warp::path!("watchlist" / String)
        .and(warp::delete())
        .and(with_tracker(tracker.clone()))
        .and_then(remove_symbol_handler);

    let list_portfolio = warp::path!("portfolio")
        .and(warp::get())
        .and(with_tracker(tracker.clone()))
        .and_then(list_portfolio_handler);

    let add_lot = warp::path!("portfolio")
        .and(warp::post())
        .and(with_tracker(tracker.clone()))
        .and(warp::body::json())
        .and_then(add_lot_handler);

    let remove_lot = warp::path!("portfolio" / usize)
        .and(warp::delete())
        .and(with_tracker(tracker.clone()))
        .and_then(remove_lot_handler);

    let snapshot = warp::path!("snapshot")
        .and(warp::get())
        .and(with_tracker(tracker.clone()))
        .and_then(snapshot_handler);

    let refresh = warp::path!("refresh")
        .and(warp::post())
        .and(with_tracker(tracker))
        .and_then(refresh_handler);

    list_watchlist
        .or(add_symbol)
        .or(remove_symbol)
        .or(list_portfolio)
        .or(add_lot)
        .or(remove_lot)
        .or(snapshot)
        .or(refresh)
}

fn with_tracker(
    tracker: Arc<Tracker>,
) -> impl Filter<Extract = (Arc<Tracker>,), Error = Infallible> + Clone {
    warp::any().map(move || tracker.clone())
}

fn message(
    text: impl Into<String>,
    status: StatusCode,
) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&json!({ "message": text.into() })), status)
}

async fn list_watchlist_handler(tracker: Arc<Tracker>) -> Result<impl Reply, Rejection> {
    let session = tracker.session().await;
    Ok(warp::reply::json(&session.watchlist()))
}

async fn add_symbol_handler(
    tracker: Arc<Tracker>,
    body: AddSymbolRequest,
) -> Result<impl Reply, Rejection> {
    match tracker.update_session(|s| s.add_symbol(&body.symbol)).await {
        Ok((symbol, AddOutcome::Added)) => {
            info!("Added {} to watchlist", symbol);
            tracker.request_refresh();
            Ok(message(format!("Added {}", symbol), StatusCode::CREATED))
        }
        Ok((symbol, AddOutcome::AlreadyExists)) => {
            Ok(message(format!("{} already exists", symbol), StatusCode::OK))
        }
        Err(e) => {
            warn!("Rejected watchlist symbol {:?}: {}", body.symbol, e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}

async fn remove_symbol_handler(
    segment: String,
    tracker: Arc<Tracker>,
) -> Result<impl Reply, Rejection> {
    let symbol = match percent_decode_str(&segment).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            return Err(warp::reject::custom(ApiError::bad_request(format!(
                "{} is not a valid symbol: {}",
                segment, e
            ))))
        }
    };

    match tracker.update_session(|s| s.remove_symbol(&symbol)).await {
        Some(removed) => {
            info!("Removed {} from watchlist", removed);
            tracker.request_refresh();
            Ok(message(format!("Removed {}", removed), StatusCode::OK))
        }
        None => Err(warp::reject::custom(ApiError::not_found(format!(
            "{} is not on the watchlist",
            symbol
        )))),
    }
}

async fn list_portfolio_handler(tracker: Arc<Tracker>) -> Result<impl Reply, Rejection> {
    let session = tracker.session().await;
    Ok(warp::reply::json(&session.portfolio()))
}

async fn add_lot_handler(
    tracker: Arc<Tracker>,
    body: AddLotRequest,
) -> Result<impl Reply, Rejection> {
    let added = tracker
        .update_session(|s| {
            s.add_lot(&body.symbol, body.quantity, body.buy_price)
                .map(|lot| lot.symbol.clone())
        })
        .await;

    match added {
        Ok(symbol) => {
            info!("Added lot {} x{} @ {}", symbol, body.quantity, body.buy_price);
            tracker.request_refresh();
            Ok(message(format!("Added {}", symbol), StatusCode::CREATED))
        }
        Err(e) => {
            warn!("Rejected portfolio lot: {}", e);
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}

async fn remove_lot_handler(index: usize, tracker: Arc<Tracker>) -> Result<impl Reply, Rejection> {
    match tracker.update_session(|s| s.remove_lot(index)).await {
        Ok(lot) => {
            info!("Removed lot {} ({})", index, lot.symbol);
            tracker.request_refresh();
            Ok(message(format!("Removed {}", lot.symbol), StatusCode::OK))
        }
        Err(e) => Err(warp::reject::custom(ApiError::from(e))),
    }
}

async fn snapshot_handler(tracker: Arc<Tracker>) -> Result<impl Reply, Rejection> {
    match tracker.latest().await {
        Some(snapshot) => Ok(warp::reply::json(&snapshot)),
        None => Err(warp::reject::custom(ApiError::unavailable("No quotes fetched yet"))),
    }
}

async fn refresh_handler(tracker: Arc<Tracker>) -> Result<impl Reply, Rejection> {
    tracker.request_refresh();
    Ok(message("Refresh requested", StatusCode::ACCEPTED))
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, text) = if let Some(e) = err.find::<ApiError>() {
        (e.status, e.message.clone())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        warn!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
    };

    Ok(warp::reply::with_status(warp::reply::json(&json!({ "error": text })), status))
}
