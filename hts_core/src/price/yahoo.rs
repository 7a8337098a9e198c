//! Blocking HTTP source for the `/v8/finance/chart` JSON API.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::candles::Bar;
use crate::error::FetchError;

use super::source::BarSource;
use super::Interval;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const TIMEOUT: Duration = Duration::from_secs(10);

pub struct YahooBarSource {
    base_url: String,
}

impl YahooBarSource {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }

    fn url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url.trim_end_matches('/'), symbol)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
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

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn no_data(symbol: &str, interval: Interval) -> FetchError {
    FetchError::NoData {
        symbol: symbol.to_string(),
        interval,
    }
}

/// Rows with any null price are dropped; a null volume counts as zero.
fn bars_from_chart(resp: ChartResponse, symbol: &str, interval: Interval) -> Result<Vec<Bar>, FetchError> {
    if let Some(err) = resp.chart.error {
        if err.code.eq_ignore_ascii_case("not found") {
            return Err(no_data(symbol, interval));
        }
        return Err(FetchError::Network(format!("{}: {}", err.code, err.description)));
    }

    let Some(result) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(no_data(symbol, interval));
    };
    let Some(q) = result.indicators.quote.into_iter().next() else {
        return Err(no_data(symbol, interval));
    };

    let at = |v: &Vec<Option<f64>>, i: usize| v.get(i).copied().flatten();
    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            Some(Bar {
                ts,
                open: at(&q.open, i)?,
                high: at(&q.high, i)?,
                low: at(&q.low, i)?,
                close: at(&q.close, i)?,
                volume: at(&q.volume, i).unwrap_or(0.0),
            })
        })
        .collect();
    Ok(bars)
}

impl BarSource for YahooBarSource {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn fetch(&self, symbol: &str, interval: Interval, period: &str) -> Result<Vec<Bar>, FetchError> {
        let client = Client::builder()
            .timeout(TIMEOUT)
            .user_agent(concat!("gesture_hts/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let resp = client
            .get(self.url(symbol))
            .query(&[("interval", interval.to_string()), ("range", period.to_string())])
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(no_data(symbol, interval));
        }
        if !status.is_success() {
            return Err(FetchError::Network(format!("HTTP {status}")));
        }

        let body: ChartResponse = resp.json().map_err(|e| {
            if e.is_decode() {
                FetchError::Parse(e.to_string())
            } else {
                FetchError::Network(e.to_string())
            }
        })?;
        bars_from_chart(body, symbol, interval)
    }
}
