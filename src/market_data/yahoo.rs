//! Yahoo Finance data source
//!
//! Fetches daily closes from Yahoo's v8 chart API. Adjusted closes are used
//! when present. Connect/timeout failures, 429 and 5xx responses are retried
//! with exponential backoff; everything else fails immediately.

use super::MarketDataSource;
use crate::error::DeepQuantError;
use crate::models::PriceBar;
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Live market data over HTTP (connection-pooled)
pub struct YahooSource {
    client: Client,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    fn chart_url(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp();
        let end_ts = end.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp();
        format!(
            "{}/{}?period1={}&period2={}&interval=1d&includeAdjustedClose=true",
            self.base_url, ticker, start_ts, end_ts
        )
    }

    async fn fetch_with_retry(&self, ticker: &str, url: &str) -> Result<ChartResponse> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(ticker, attempt, ?delay, "Retrying market data request");
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    warn!(ticker, error = %e, "Market data request failed");
                    last_error = Some(DeepQuantError::MarketData(format!(
                        "network unreachable: {}",
                        e
                    )));
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                warn!(ticker, %status, "Market data provider unavailable");
                last_error = Some(DeepQuantError::MarketData(format!(
                    "HTTP {} for {}",
                    status, ticker
                )));
                continue;
            }

            // Yahoo reports unknown symbols with a 404 and a JSON error body
            if !status.is_success() && status != StatusCode::NOT_FOUND {
                return Err(DeepQuantError::MarketData(format!(
                    "HTTP {} for {}",
                    status, ticker
                )));
            }

            return response.json::<ChartResponse>().await.map_err(|e| {
                DeepQuantError::MarketData(format!(
                    "unexpected response format for {}: {}",
                    ticker, e
                ))
            });
        }

        Err(last_error.unwrap_or_else(|| {
            DeepQuantError::MarketData("max retries exceeded".to_string())
        }))
    }
}

#[async_trait]
impl MarketDataSource for YahooSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    async fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
        let url = self.chart_url(ticker, start, end);
        let chart = self.fetch_with_retry(ticker, &url).await?;
        let bars = parse_chart(ticker, chart)?;
        debug!(ticker, bars = bars.len(), "Fetched market data");
        Ok(bars)
    }
}

fn parse_chart(ticker: &str, response: ChartResponse) -> Result<Vec<PriceBar>> {
    let results = match (response.chart.result, response.chart.error) {
        (Some(results), _) => results,
        (None, Some(err)) => {
            return Err(DeepQuantError::MarketData(format!(
                "{}: {} ({})",
                ticker, err.description, err.code
            )))
        }
        (None, None) => {
            return Err(DeepQuantError::MarketData(format!(
                "empty chart result for {}",
                ticker
            )))
        }
    };

    let Some(data) = results.into_iter().next() else {
        return Ok(Vec::new());
    };

    let timestamps = data.timestamp.unwrap_or_default();
    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();
    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut bars: Vec<PriceBar> = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let date = chrono::DateTime::from_timestamp(ts, 0)?.date_naive();
            let close = adj_closes
                .as_ref()
                .and_then(|v| v.get(i).copied().flatten())
                .or_else(|| closes.get(i).copied().flatten())?;
            (close.is_finite() && close > 0.0).then_some(PriceBar { date, close })
        })
        .collect();

    bars.sort_by_key(|bar| bar.date);
    bars.dedup_by_key(|bar| bar.date);
    Ok(bars)
}
