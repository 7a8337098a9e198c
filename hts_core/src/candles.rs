use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: i64, // bucket start (unix seconds)
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn flat(ts: i64, price: f64, volume: f64) -> Self {
        Self {
            ts,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }

    fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Immutable, time-ascending bar sequence with unique timestamps.
///
/// Cloning shares the underlying storage; a refresh builds a new table and
/// swaps it in, so a reader holding the old one never sees a partial update.
#[derive(Debug, Clone, Default)]
pub struct BarTable(Arc<[Bar]>);

impl BarTable {
    /// Sorts by timestamp, keeps the last bar for a duplicated timestamp and
    /// drops rows with non-finite fields.
    pub fn from_bars(mut bars: Vec<Bar>) -> Self {
        bars.retain(Bar::is_finite);
        bars.sort_by_key(|b| b.ts);
        let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
        for b in bars {
            match out.last_mut() {
                Some(last) if last.ts == b.ts => *last = b,
                _ => out.push(b),
            }
        }
        Self(out.into())
    }

    pub fn last_close(&self) -> Option<f64> {
        self.0.last().map(|b| b.close)
    }

    /// Close of the bar before the last one.
    pub fn prev_close(&self) -> Option<f64> {
        let n = self.0.len();
        (n >= 2).then(|| self.0[n - 2].close)
    }
}

impl Deref for BarTable {
    type Target = [Bar];

    fn deref(&self) -> &[Bar] {
        &self.0
    }
}

// ── Tick aggregation ───────────────────────────────────────

/// Buckets price samples into fixed-width OHLC bars, keeping at most
/// `max_bars` finished bars.
#[derive(Debug, Clone)]
pub struct CandleAgg {
    tf_secs: i64,
    max_bars: usize,
    cur: Option<Bar>,
    series: Vec<Bar>,
}

impl CandleAgg {
    pub fn new(tf_secs: i64, max_bars: usize) -> Self {
        Self {
            tf_secs: tf_secs.max(1),
            max_bars: max_bars.max(1),
            cur: None,
            series: Vec::new(),
        }
    }

    pub fn tf(&self) -> i64 {
        self.tf_secs
    }

    fn bucket_start(&self, ts: i64) -> i64 {
        ts.div_euclid(self.tf_secs) * self.tf_secs
    }

    fn trim(&mut self) {
        if self.series.len() > self.max_bars {
            let extra = self.series.len() - self.max_bars;
            self.series.drain(0..extra);
        }
    }

    /// Feed one sample. Samples older than the open bucket are folded into it.
    pub fn update(&mut self, ts: i64, price: f64, volume: f64) {
        let b = self.bucket_start(ts);
        let volume = volume.max(0.0);

        match self.cur.as_mut() {
            Some(c) if b <= c.ts => {
                c.high = c.high.max(price);
                c.low = c.low.min(price);
                c.close = price;
                c.volume += volume;
            }
            Some(_) => {
                // finalize previous bucket
                if let Some(prev) = self.cur.replace(Bar::flat(b, price, volume)) {
                    self.series.push(prev);
                    self.trim();
                }
            }
            None => {
                self.cur = Some(Bar::flat(b, price, volume));
            }
        }
    }

    /// Finished bars plus the open one. Never longer than `max_bars`.
    pub fn snapshot(&self) -> Vec<Bar> {
        let mut out: Vec<Bar> = Vec::with_capacity(self.series.len() + 1);
        let skip = usize::from(self.cur.is_some() && self.series.len() >= self.max_bars);
        out.extend(self.series.iter().skip(skip).copied());
        if let Some(cur) = self.cur {
            out.push(cur);
        }
        out
    }
}

// ── Resampling ─────────────────────────────────────────────

fn year_of(ts: i64) -> Option<i32> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|dt| dt.year())
}

fn year_start(year: i32) -> Option<i64> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .map(|dt| dt.timestamp())
}

/// Aggregate ascending bars (typically monthly) into calendar-year bars
/// stamped at Jan 1 00:00 UTC. Years without usable bars produce nothing.
pub fn resample_yearly(bars: &[Bar]) -> Vec<Bar> {
    let mut out: Vec<Bar> = Vec::new();
    let mut cur_year: Option<i32> = None;

    for b in bars.iter().filter(|b| b.is_finite()) {
        let Some(year) = year_of(b.ts) else { continue };
        match out.last_mut() {
            Some(y) if cur_year == Some(year) => {
                y.high = y.high.max(b.high);
                y.low = y.low.min(b.low);
                y.close = b.close;
                y.volume += b.volume;
            }
            _ => {
                let Some(ts) = year_start(year) else { continue };
                cur_year = Some(year);
                out.push(Bar { ts, ..*b });
            }
        }
    }
    out
}

// ── CSV ────────────────────────────────────────────────────

/// Read `ts,open,high,low,close,volume` rows. Header and malformed lines are skipped.
pub fn load_csv(path: &Path) -> io::Result<Vec<Bar>> {
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 6 {
            continue;
        }

        let Ok(ts) = parts[0].parse::<i64>() else { continue; };
        let Ok(open) = parts[1].parse::<f64>() else { continue; };
        let Ok(high) = parts[2].parse::<f64>() else { continue; };
        let Ok(low) = parts[3].parse::<f64>() else { continue; };
        let Ok(close) = parts[4].parse::<f64>() else { continue; };
        let Ok(volume) = parts[5].parse::<f64>() else { continue; };

        out.push(Bar {
            ts,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    out.sort_by_key(|b| b.ts);
    Ok(out)
}

pub fn save_csv(path: &Path, bars: &[Bar]) -> io::Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;

    writeln!(f, "ts,open,high,low,close,volume")?;
    for b in bars {
        writeln!(
            f,
            "{},{},{},{},{},{}",
            b.ts, b.open, b.high, b.low, b.close, b.volume
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month_start(year: i32, month: u32) -> i64 {
        Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap().timestamp()
    }

    fn monthly_bars() -> Vec<Bar> {
        let mut bars = Vec::new();
        for (yi, year) in [2022, 2023].into_iter().enumerate() {
            for m in 1..=12u32 {
                let base = 100.0 + yi as f64 * 50.0 + m as f64;
                bars.push(Bar {
                    ts: month_start(year, m),
                    open: base,
                    high: base + 5.0,
                    low: base - 5.0,
                    close: base + 1.0,
                    volume: 10.0,
                });
            }
        }
        // Known extremes.
        bars[4].high = 500.0;
        bars[17].low = 3.0;
        bars
    }

    #[test]
    fn test_yearly_resample_aggregates() {
        let years = resample_yearly(&monthly_bars());
        assert_eq!(years.len(), 2);

        let y22 = years[0];
        assert_eq!(y22.ts, month_start(2022, 1));
        assert_eq!(y22.open, 101.0);
        assert_eq!(y22.close, 113.0);
        assert_eq!(y22.high, 500.0);
        assert_eq!(y22.low, 96.0);
        assert_eq!(y22.volume, 120.0);

        let y23 = years[1];
        assert_eq!(y23.ts, month_start(2023, 1));
        assert_eq!(y23.open, 151.0);
        assert_eq!(y23.close, 163.0);
        assert_eq!(y23.high, 167.0);
        assert_eq!(y23.low, 3.0);
        assert_eq!(y23.volume, 120.0);
    }

    #[test]
    fn test_yearly_resample_drops_empty_rows() {
        let mut bars = monthly_bars();
        for b in bars.iter_mut().take(12) {
            b.close = f64::NAN;
        }
        let years = resample_yearly(&bars);
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].ts, month_start(2023, 1));
    }

    #[test]
    fn test_bar_table_sorts_and_dedups() {
        let t = BarTable::from_bars(vec![
            Bar::flat(30, 3.0, 1.0),
            Bar::flat(10, 1.0, 1.0),
            Bar::flat(20, 2.0, 1.0),
            Bar::flat(20, 2.5, 1.0),
            Bar::flat(40, f64::NAN, 1.0),
        ]);
        let ts: Vec<i64> = t.iter().map(|b| b.ts).collect();
        assert_eq!(ts, vec![10, 20, 30]);
        assert_eq!(t[1].close, 2.5);
        assert_eq!(t.last_close(), Some(3.0));
        assert_eq!(t.prev_close(), Some(2.5));
    }

    #[test]
    fn test_candle_agg_buckets_and_caps() {
        let mut agg = CandleAgg::new(60, 3);
        agg.update(0, 10.0, 1.0);
        agg.update(30, 12.0, 1.0);
        agg.update(59, 9.0, 1.0);
        let snap = agg.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!((snap[0].open, snap[0].high, snap[0].low, snap[0].close), (10.0, 12.0, 9.0, 9.0));
        assert_eq!(snap[0].volume, 3.0);

        for i in 1..6 {
            agg.update(i * 60, 10.0 + i as f64, 0.0);
        }
        let snap = agg.snapshot();
        assert_eq!(snap.len(), 3);
        assert_eq!(snap.last().unwrap().ts, 300);
        assert!(snap.windows(2).all(|w| w[0].ts < w[1].ts));
    }

    #[test]
    fn test_csv_round_trip_skips_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AAPL_1d.csv");
        let bars = vec![Bar::flat(86_400, 1.5, 10.0), Bar::flat(0, 1.0, 5.0)];
        save_csv(&path, &bars).unwrap();
        let loaded = load_csv(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].ts, 0);
        assert_eq!(loaded[1].close, 1.5);
    }
}
