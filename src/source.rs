// src/source.rs
use crate::error::FetchError;
use crate::models::{PriceQuote, Symbol};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use serde::Deserialize;

/// Market data lookup. Implementations may fail or return partial data at will.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Live price and previous close, either of which may be missing.
    async fn live_quote(&self, symbol: &Symbol) -> Result<PriceQuote, FetchError>;

    /// Recent daily closes, oldest first.
    async fn daily_closes(&self, symbol: &Symbol) -> Result<Vec<f64>, FetchError>;
}

/// Live pair if complete, otherwise the last two daily closes.
pub async fn lookup_quote(
    source: &dyn PriceSource,
    symbol: &Symbol,
) -> Result<PriceQuote, FetchError> {
    match source.live_quote(symbol).await {
        Ok(quote) if quote.is_complete() => return Ok(quote),
        Ok(quote) => debug!("Incomplete live quote for {}: {:?}", symbol, quote),
        Err(e) => debug!("Live quote for {} failed, trying history: {}", symbol, e),
    }

    let closes = source.daily_closes(symbol).await?;
    match closes.as_slice() {
        [.., previous, current] => Ok(PriceQuote::new(*current, *previous)),
        _ => Err(FetchError::NoData(symbol.to_string())),
    }
}

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
}

#[derive(Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<IndicatorQuote>,
}

#[derive(Deserialize)]
struct IndicatorQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResponse {
    fn into_result(self, symbol: &Symbol) -> Result<ChartResult, FetchError> {
        if let Some(err) = self.chart.error {
            return Err(FetchError::Provider {
                symbol: symbol.to_string(),
                message: err.description.unwrap_or(err.code),
            });
        }
        self.chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| FetchError::NoData(symbol.to_string()))
    }
}

impl ChartResult {
    fn live_quote(&self) -> PriceQuote {
        PriceQuote {
            current: self.meta.regular_market_price,
            previous: self.meta.previous_close.or(self.meta.chart_previous_close),
        }
    }

    fn closes(&self) -> Vec<f64> {
        self.indicators
            .as_ref()
            .and_then(|ind| ind.quote.first())
            .map(|q| q.close.iter().flatten().copied().collect())
            .unwrap_or_default()
    }
}

/// Yahoo Finance chart endpoint.
pub struct YahooSource {
    client: Client,
    base_url: Url,
}

impl YahooSource {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) quote_tracker/0.1")
            .build()?;
        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    /// `{base}/v8/finance/chart/{symbol}`, with the symbol percent-encoded as one segment.
    fn chart_url(&self, symbol: &Symbol) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol.as_str()]);
        Ok(url)
    }

    async fn chart(&self, symbol: &Symbol, range: &str) -> Result<ChartResult, FetchError> {
        let url = self.chart_url(symbol)?;
        debug!("Fetching {} (range {})", url, range);

        let response = self
            .client
            .get(url)
            .query(&[("range", range), ("interval", "1d")])
            .send()
            .await?;

        let status = response.status();
        let body = match response.json::<ChartResponse>().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => return Err(FetchError::Status(status.as_u16())),
            Err(e) => return Err(e.into()),
        };
        let result = body.into_result(symbol)?;
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(result)
    }
}

#[async_trait]
impl PriceSource for YahooSource {
    async fn live_quote(&self, symbol: &Symbol) -> Result<PriceQuote, FetchError> {
        Ok(self.chart(symbol, "1d").await?.live_quote())
    }

    async fn daily_closes(&self, symbol: &Symbol) -> Result<Vec<f64>, FetchError> {
        Ok(self.chart(symbol, "5d").await?.closes())
    }
}
