//! User feedback that rides alongside the trading effects: rate-limited
//! cues, the execution notice, the near-order hint and the trade log.
//!
//! None of this gates the ledger. A suppressed cue still means the price
//! moved or the trade filled.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::gesture::Side;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub inc_ms: u64,
    pub dec_ms: u64,
    pub reset_ms: u64,
    pub trade_ms: u64,
    /// How long an execution notice stays up.
    pub notice_ms: u64,
    /// Distance between market and pending price that counts as "near".
    pub near_order_band: f64,
    pub trade_log_capacity: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            inc_ms: 150,
            dec_ms: 150,
            reset_ms: 500,
            trade_ms: 1000,
            notice_ms: 2000,
            near_order_band: 2.5,
            trade_log_capacity: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Cue {
    PriceUp,
    PriceDown,
    Reset,
    Trade,
}

impl Cue {
    fn slot(self) -> usize {
        match self {
            Self::PriceUp => 0,
            Self::PriceDown => 1,
            Self::Reset => 2,
            Self::Trade => 3,
        }
    }
}

/// Per-cue cooldowns.
#[derive(Debug, Clone)]
pub struct CueGate {
    cooldowns: [Duration; 4],
    last: [Option<Instant>; 4],
}

impl CueGate {
    pub fn new(cfg: &FeedbackConfig) -> Self {
        Self {
            cooldowns: [cfg.inc_ms, cfg.dec_ms, cfg.reset_ms, cfg.trade_ms].map(Duration::from_millis),
            last: [None; 4],
        }
    }

    /// True (and the cooldown restarts) if `cue` may sound at `now`.
    pub fn fire(&mut self, cue: Cue, now: Instant) -> bool {
        let i = cue.slot();
        let ready = self.last[i].map_or(true, |t| now.saturating_duration_since(t) >= self.cooldowns[i]);
        if ready {
            self.last[i] = Some(now);
        }
        ready
    }
}

// ── Execution notice ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub side: Side,
    pub price: f64,
    pub quantity: u64,
    #[serde(skip)]
    raised_at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    ttl: Duration,
    current: Option<Notice>,
}

impl NoticeBoard {
    pub fn new(cfg: &FeedbackConfig) -> Self {
        Self {
            ttl: Duration::from_millis(cfg.notice_ms),
            current: None,
        }
    }

    pub fn raise(&mut self, side: Side, price: f64, quantity: u64, now: Instant) {
        self.current = Some(Notice {
            side,
            price,
            quantity,
            raised_at: now,
        });
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current.as_ref()
    }

    /// Drop the notice once its time is up. Returns true if one was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        let due = self
            .current
            .as_ref()
            .is_some_and(|n| now.saturating_duration_since(n.raised_at) >= self.ttl);
        if due {
            self.current = None;
        }
        due
    }
}

// ── Near-order hint ────────────────────────────────────────

/// Fires once when the market enters the band around the pending price,
/// and re-arms only after it leaves.
#[derive(Debug, Clone, Default)]
pub struct NearOrderHint {
    inside: bool,
}

impl NearOrderHint {
    pub fn update(&mut self, market: f64, pending: f64, band: f64) -> bool {
        let inside = (market - pending).abs() < band;
        let entered = inside && !self.inside;
        self.inside = inside;
        entered
    }
}

// ── Trade log ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeLogEntry {
    /// Local wall-clock `HH:MM:SS`.
    pub time: String,
    pub side: Side,
    /// `None` when the order never got a valid price.
    pub price: Option<f64>,
    pub outcome: String,
}

#[derive(Debug, Clone)]
pub struct TradeLog {
    cap: usize,
    rows: VecDeque<TradeLogEntry>,
}

impl TradeLog {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            rows: VecDeque::new(),
        }
    }

    pub fn push(&mut self, side: Side, price: Option<f64>, outcome: impl Into<String>) {
        self.rows.push_back(TradeLogEntry {
            time: Local::now().format("%H:%M:%S").to_string(),
            side,
            price,
            outcome: outcome.into(),
        });
        while self.rows.len() > self.cap {
            self.rows.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TradeLogEntry> {
        self.rows.iter()
    }

    pub fn last(&self) -> Option<&TradeLogEntry> {
        self.rows.back()
    }
}
