use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::DateTime;
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;
use crate::market::MarketData;
use crate::model::{HistoryPeriod, PricePoint, PriceSeries};

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DAILY_INTERVAL: &str = "1d";

/// Yahoo Finance v8 chart endpoint.
pub struct YahooFinance {
    client: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl YahooFinance {
    pub fn new(client: reqwest::Client, base_url: &str, requests_per_second: u32) -> Self {
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        }
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> Result<ChartResponse, Report<FetchError>> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let params = [("range", period.as_str()), ("interval", DAILY_INTERVAL)];

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .change_context(FetchError::Request {
                symbol: symbol.to_owned(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(Report::new(FetchError::NotFound {
                symbol: symbol.to_owned(),
            })
            .attach(format!("response body: {body}")));
        }
        if !status.is_success() {
            return Err(Report::new(FetchError::Request {
                symbol: symbol.to_owned(),
            })
            .attach(format!("HTTP status: {status}")));
        }

        response
            .json()
            .await
            .change_context(FetchError::ResponseParse {
                symbol: symbol.to_owned(),
            })
    }
}

impl MarketData for YahooFinance {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn fetch_history(
        &self,
        symbol: &str,
        period: HistoryPeriod,
    ) -> BoxFuture<'_, Result<PriceSeries, Report<FetchError>>> {
        let symbol = symbol.to_owned();
        Box::pin(async move {
            let chart = self.fetch_chart(&symbol, period).await?;
            let series = chart.into_series(&symbol)?;
            debug!(
                symbol = %symbol,
                period = %period,
                points = series.len(),
                "yahoo history fetched"
            );
            Ok(series)
        })
    }
}

// ── REST response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartResponse {
    fn into_series(self, symbol: &str) -> Result<PriceSeries, Report<FetchError>> {
        if let Some(err) = self.chart.error {
            return Err(Report::new(FetchError::NotFound {
                symbol: symbol.to_owned(),
            })
            .attach(format!("{}: {}", err.code, err.description)));
        }

        let Some(result) = self.chart.result.and_then(|r| r.into_iter().next()) else {
            return Err(Report::new(FetchError::NotFound {
                symbol: symbol.to_owned(),
            }));
        };

        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        // Rows without a close (holidays, halted sessions) are dropped.
        let mut points: Vec<PricePoint> = result
            .timestamp
            .iter()
            .zip(closes)
            .filter_map(|(&ts, close)| {
                let close = close.filter(|c| c.is_finite() && *c > 0.0)?;
                let timestamp = DateTime::from_timestamp(ts, 0)?;
                Some(PricePoint { timestamp, close })
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);
        points.dedup_by_key(|p| p.timestamp);

        PriceSeries::new(points).change_context(FetchError::ResponseParse {
            symbol: symbol.to_owned(),
        })
    }
}
