//! Price engine: a simulated GBM feed or a fetched historical bar table,
//! behind one current/previous price contract.

pub mod fetch;
pub mod history;
pub mod sim;
pub mod source;
pub mod yahoo;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::candles::{BarTable, CandleAgg};
use crate::debug_hooks;
use crate::error::FetchError;

pub use fetch::{spawn_fetch, FetchOutcome, FetchRequest, FetchTicket, InFlight};
pub use history::HistoricalFeed;
pub use sim::{GbmParams, GbmSimulator, SimTick};
pub use source::{fetch_bars, BarSource, CsvBarSource};
pub use yahoo::YahooBarSource;

// ── Interval ───────────────────────────────────────────────

/// Bar width. `Year` is never requested upstream; it is resampled from `Month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    Minutes(u32),
    Day,
    Week,
    Month,
    Year,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(n) => write!(f, "{n}m"),
            Self::Day => f.write_str("1d"),
            Self::Week => f.write_str("1wk"),
            Self::Month => f.write_str("1mo"),
            Self::Year => f.write_str("1y"),
        }
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" => Ok(Self::Day),
            "1wk" => Ok(Self::Week),
            "1mo" => Ok(Self::Month),
            "1y" => Ok(Self::Year),
            other => other
                .strip_suffix('m')
                .and_then(|n| n.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .map(Self::Minutes)
                .ok_or_else(|| format!("unknown interval {s:?}")),
        }
    }
}

impl TryFrom<String> for Interval {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Interval> for String {
    fn from(i: Interval) -> Self {
        i.to_string()
    }
}

// ── State ──────────────────────────────────────────────────

/// Current price plus the reference used for change display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceState {
    pub current: f64,
    /// Prior tick (simulated) or prior bar close (historical).
    pub previous: f64,
}

impl PriceState {
    pub fn flat(price: f64) -> Self {
        Self {
            current: price,
            previous: price,
        }
    }

    pub fn change(&self) -> f64 {
        self.current - self.previous
    }

    pub fn change_pct(&self) -> f64 {
        if self.previous == 0.0 {
            0.0
        } else {
            self.change() / self.previous * 100.0
        }
    }

    pub fn from_table(table: &BarTable) -> Option<Self> {
        let current = table.last_close()?;
        Some(Self {
            current,
            previous: table.prev_close().unwrap_or(current),
        })
    }
}

// ── Config ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceMode {
    Simulated,
    Historical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceConfig {
    /// `{dir}/{SYMBOL}_{interval}.csv`
    Csv { dir: PathBuf },
    /// Chart API compatible with `/v8/finance/chart/{symbol}`.
    Yahoo { base_url: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    pub mode: PriceMode,

    pub initial_price: f64,
    pub drift: f64,
    pub volatility: f64,
    pub tick_dt: f64,
    pub min_price: f64,
    pub jump_probability: f64,
    pub jump_min_pct: f64,
    pub jump_max_pct: f64,
    pub seed: Option<u64>,
    pub sim_bar_secs: i64,
    pub sim_max_bars: usize,

    pub symbol: String,
    pub interval: Interval,
    pub period: String,
    pub refresh_secs: u64,
    pub source: SourceConfig,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            mode: PriceMode::Simulated,
            initial_price: 1100.0,
            drift: 0.0001,
            volatility: 0.0025,
            tick_dt: 0.05,
            min_price: 1.0,
            jump_probability: 0.004,
            jump_min_pct: 0.6,
            jump_max_pct: 2.5,
            seed: None,
            sim_bar_secs: 1,
            sim_max_bars: 300,
            symbol: "AAPL".to_string(),
            interval: Interval::Day,
            period: "1y".to_string(),
            refresh_secs: 60,
            source: SourceConfig::Yahoo {
                base_url: yahoo::DEFAULT_BASE_URL.to_string(),
            },
        }
    }
}

impl PriceConfig {
    pub fn build_source(&self) -> Arc<dyn BarSource> {
        match &self.source {
            SourceConfig::Csv { dir } => Arc::new(CsvBarSource::new(dir.clone())),
            SourceConfig::Yahoo { base_url } => Arc::new(YahooBarSource::new(base_url.clone())),
        }
    }
}

// ── Engine ─────────────────────────────────────────────────

pub struct SimulatedFeed {
    sim: GbmSimulator,
    agg: CandleAgg,
    table: BarTable,
}

impl SimulatedFeed {
    pub fn new(cfg: &PriceConfig) -> Self {
        Self {
            sim: GbmSimulator::new(GbmParams::from_config(cfg), cfg.initial_price, cfg.seed),
            agg: CandleAgg::new(cfg.sim_bar_secs, cfg.sim_max_bars),
            table: BarTable::default(),
        }
    }

    /// Advance one step and fold the new price into the bar at `ts` (unix seconds).
    pub fn tick(&mut self, ts: i64) -> PriceState {
        let t = self.sim.tick();
        debug_hooks::log_sim_tick(t.state.current, t.jumped);
        self.agg.update(ts, t.state.current, 1.0);
        self.table = BarTable::from_bars(self.agg.snapshot());
        t.state
    }
}

pub enum PriceEngine {
    Simulated(SimulatedFeed),
    Historical(HistoricalFeed),
}

impl PriceEngine {
    pub fn from_config(cfg: &PriceConfig) -> Self {
        match cfg.mode {
            PriceMode::Simulated => Self::Simulated(SimulatedFeed::new(cfg)),
            PriceMode::Historical => Self::Historical(HistoricalFeed::new(
                cfg.symbol.clone(),
                cfg.interval,
                cfg.period.clone(),
            )),
        }
    }

    pub fn mode(&self) -> PriceMode {
        match self {
            Self::Simulated(_) => PriceMode::Simulated,
            Self::Historical(_) => PriceMode::Historical,
        }
    }

    /// `None` only in historical mode before the first successful fetch.
    pub fn state(&self) -> Option<PriceState> {
        match self {
            Self::Simulated(s) => Some(s.sim.state()),
            Self::Historical(h) => h.state(),
        }
    }

    pub fn current_price(&self) -> Option<f64> {
        self.state().map(|s| s.current)
    }

    pub fn bars(&self) -> &BarTable {
        match self {
            Self::Simulated(s) => &s.table,
            Self::Historical(h) => h.table(),
        }
    }

    /// Simulated mode only; historical prices move on fetch.
    pub fn tick(&mut self, ts: i64) -> Option<PriceState> {
        match self {
            Self::Simulated(s) => Some(s.tick(ts)),
            Self::Historical(_) => None,
        }
    }

    /// What to ask a bar source for. `None` in simulated mode.
    pub fn fetch_request(&self) -> Option<FetchRequest> {
        match self {
            Self::Simulated(_) => None,
            Self::Historical(h) => Some(h.request()),
        }
    }

    /// Install a completed fetch. On error nothing changes.
    pub fn apply_fetch(&mut self, outcome: FetchOutcome) -> Result<(), FetchError> {
        match self {
            Self::Historical(h) => h.apply(outcome),
            Self::Simulated(_) => Ok(()),
        }
    }
}
