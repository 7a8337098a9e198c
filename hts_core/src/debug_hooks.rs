//! Topic-tagged log helpers.
//!
//! Each helper logs under its own tracing target (`gesture.hold`,
//! `feed.fetch`, ...) so a filter like `RUST_LOG=gesture=debug` isolates one
//! subsystem. Per-frame and per-tick topics are sampled: the first few
//! occurrences, then every Nth.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::gesture::{Role, Side};
use crate::price::Interval;

fn sampled(counter: &AtomicU64, first: u64, every: u64) -> Option<u64> {
    let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
    (n <= first || n % every == 0).then_some(n)
}

pub fn log_hold_started(role: Role) {
    debug!(target: "gesture.hold", "hold started role={}", role.as_str());
}

pub fn log_hold_broken(role: Role, reason: &str) {
    debug!(target: "gesture.hold", "hold broken role={} by={reason}", role.as_str());
}

pub fn log_hold_completed(role: Role, side: Side, elapsed: Duration, price: f64) {
    info!(
        target: "gesture.order",
        "hold complete role={} side={} after={}ms price={price:.2}",
        role.as_str(),
        side.as_str(),
        elapsed.as_millis()
    );
}

pub fn log_frame_ingest(hands: usize) {
    static COUNT: AtomicU64 = AtomicU64::new(0);
    if let Some(n) = sampled(&COUNT, 5, 200) {
        debug!(target: "gesture.frame", "frame #{n} hands={hands}");
    }
}

pub fn log_sim_tick(price: f64, jumped: bool) {
    static COUNT: AtomicU64 = AtomicU64::new(0);
    if jumped {
        info!(target: "feed.sim", "jump applied; price={price:.4}");
        return;
    }
    if let Some(n) = sampled(&COUNT, 3, 500) {
        debug!(target: "feed.sim", "tick #{n} price={price:.4}");
    }
}

pub fn log_fetch_start(symbol: &str, interval: Interval, period: &str) {
    info!(target: "feed.fetch", "fetch start symbol={symbol} interval={interval} period={period}");
}

pub fn log_fetch_dropped(symbol: &str) {
    debug!(target: "feed.fetch", "fetch dropped; already in flight symbol={symbol}");
}

pub fn log_fetch_applied(symbol: &str, bars: usize, last_close: f64) {
    info!(target: "feed.fetch", "bars applied symbol={symbol} count={bars} last_close={last_close:.4}");
}

pub fn log_fetch_failed(symbol: &str, err: &dyn std::fmt::Display) {
    warn!(target: "feed.fetch", "fetch failed symbol={symbol} err={err}");
}

pub fn log_viewport(op: &str, offset: usize, window: usize, len: usize) {
    debug!(target: "viewport", "{op}: offset={offset} window={window} bars={len}");
}

pub fn log_trade(side: Side, symbol: &str, price: f64, outcome: &str) {
    info!(target: "ledger", "{} {symbol} @{price:.2}: {outcome}", side.as_str());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_keeps_head_and_every_nth() {
        let c = AtomicU64::new(0);
        let hits: Vec<u64> = (0..25).filter_map(|_| sampled(&c, 3, 10)).collect();
        assert_eq!(hits, vec![1, 2, 3, 10, 20]);
    }
}
