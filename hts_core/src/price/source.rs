//! Where historical bars come from.

use std::io;
use std::path::PathBuf;

use crate::candles::{self, resample_yearly, Bar, BarTable};
use crate::error::FetchError;

use super::Interval;

/// A blocking OHLCV provider. Called from worker threads only.
pub trait BarSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Ascending bars for `symbol`. Never asked for `Interval::Year`.
    fn fetch(&self, symbol: &str, interval: Interval, period: &str) -> Result<Vec<Bar>, FetchError>;
}

/// Fetch and normalize a table. `1y` is built locally from `1mo` bars.
pub fn fetch_bars(
    source: &dyn BarSource,
    symbol: &str,
    interval: Interval,
    period: &str,
) -> Result<BarTable, FetchError> {
    let bars = match interval {
        Interval::Year => resample_yearly(&source.fetch(symbol, Interval::Month, period)?),
        other => source.fetch(symbol, other, period)?,
    };
    let table = BarTable::from_bars(bars);
    if table.is_empty() {
        return Err(FetchError::NoData {
            symbol: symbol.to_string(),
            interval,
        });
    }
    Ok(table)
}

/// Approximate span of a period string such as `5d`, `6mo`, `2y`.
/// `None` for `max`, `ytd` or anything unrecognized (no trimming).
pub fn period_secs(period: &str) -> Option<i64> {
    const DAY: i64 = 86_400;
    let p = period.trim().to_ascii_lowercase();
    let (num, unit) = if let Some(n) = p.strip_suffix("mo") {
        (n, 30 * DAY)
    } else if let Some(n) = p.strip_suffix("wk") {
        (n, 7 * DAY)
    } else if let Some(n) = p.strip_suffix('d') {
        (n, DAY)
    } else if let Some(n) = p.strip_suffix('y') {
        (n, 365 * DAY)
    } else {
        return None;
    };
    num.parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .map(|n| n.saturating_mul(unit))
}

// ── CSV directory ──────────────────────────────────────────

/// Reads `{dir}/{SYMBOL}_{interval}.csv`, keeping the trailing `period`.
pub struct CsvBarSource {
    dir: PathBuf,
}

impl CsvBarSource {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path_for(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", symbol.to_ascii_uppercase(), interval))
    }
}

impl BarSource for CsvBarSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn fetch(&self, symbol: &str, interval: Interval, period: &str) -> Result<Vec<Bar>, FetchError> {
        let path = self.path_for(symbol, interval);
        let mut bars = match candles::load_csv(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FetchError::NoData {
                    symbol: symbol.to_string(),
                    interval,
                })
            }
            Err(e) => return Err(FetchError::Network(format!("{}: {e}", path.display()))),
        };

        if let (Some(span), Some(last)) = (period_secs(period), bars.last().map(|b| b.ts)) {
            let cutoff = last.saturating_sub(span);
            bars.retain(|b| b.ts > cutoff);
        }
        Ok(bars)
    }
}
