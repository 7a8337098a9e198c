//! The trading session: one object owning every piece of mutable state,
//! driven by the scheduling loop.
//!
//! Frames, ticks, fetch results and user commands all come in through
//! `&mut self` methods, so every mutation happens on the loop's thread and
//! a trade is applied completely or not at all.

use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::candles::Bar;
use crate::classifier::{classify, GestureLabel};
use crate::config::HtsConfig;
use crate::debug_hooks;
use crate::error::{FetchError, OrderError, TradeRejection};
use crate::feedback::{Cue, CueGate, Notice, NearOrderHint, NoticeBoard, TradeLog, TradeLogEntry};
use crate::gesture::{GestureMachine, GestureOutput, HandInput, Role, Side};
use crate::landmarks::HandObservation;
use crate::ledger::{Fill, Ledger, LedgerSnapshot};
use crate::price::{FetchOutcome, FetchRequest, PriceEngine, PriceMode, PriceState};
use crate::viewport::{self, Viewport, ZoomDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeOrigin {
    Gesture,
    Manual,
}

/// What happened to one order attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeReport {
    pub origin: TradeOrigin,
    pub side: Side,
    pub result: Result<Fill, OrderError>,
}

/// Per-role display state after the latest frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HandStatus {
    pub role: Role,
    /// `None` when the hand was not in the frame.
    pub label: Option<GestureLabel>,
    pub hold_progress: f64,
    pub fist_active: bool,
}

impl HandStatus {
    fn idle(role: Role) -> Self {
        Self {
            role,
            label: None,
            hold_progress: 0.0,
            fist_active: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub left: HandStatus,
    pub right: HandStatus,
    pub trades: Vec<TradeReport>,
    /// Pending order price after this frame, if the frame changed it.
    pub pending_changed: Option<f64>,
    pub cues: Vec<Cue>,
}

impl FrameOutcome {
    fn new() -> Self {
        Self {
            left: HandStatus::idle(Role::Left),
            right: HandStatus::idle(Role::Right),
            trades: Vec::new(),
            pending_changed: None,
            cues: Vec::new(),
        }
    }

    pub fn hand(&self, role: Role) -> &HandStatus {
        match role {
            Role::Left => &self.left,
            Role::Right => &self.right,
        }
    }

    fn hand_mut(&mut self, role: Role) -> &mut HandStatus {
        match role {
            Role::Left => &mut self.left,
            Role::Right => &mut self.right,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty() && self.pending_changed.is_none() && self.cues.is_empty()
    }
}

/// Result of a price update (simulated tick or applied fetch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceUpdate {
    pub state: Option<PriceState>,
    /// The market just moved within the near-order band.
    pub near_order: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewportSnapshot {
    pub offset: usize,
    pub window_size: usize,
    pub bars: usize,
    pub y_range: Option<(f64, f64)>,
}

/// Everything the GUI collaborator draws, in one serializable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub symbol: String,
    pub mode: PriceMode,
    pub price: Option<PriceState>,
    pub ledger: LedgerSnapshot,
    pub hands: [HandStatus; 2],
    pub notice: Option<Notice>,
    pub viewport: ViewportSnapshot,
    pub last_trade: Option<TradeLogEntry>,
}

pub struct Session {
    config: HtsConfig,
    symbol: String,
    gestures: GestureMachine,
    price: PriceEngine,
    viewport: Viewport,
    ledger: Ledger,
    cues: CueGate,
    notice: NoticeBoard,
    near: NearOrderHint,
    trade_log: TradeLog,
    hands: [HandStatus; 2],
}

impl Session {
    pub fn new(config: HtsConfig) -> Self {
        let price = PriceEngine::from_config(&config.price);
        let pending = price.current_price().unwrap_or(config.price.initial_price);
        Self {
            symbol: config.price.symbol.clone(),
            gestures: GestureMachine::new(config.gesture.clone()),
            viewport: Viewport::new(config.viewport.clone(), price.bars().len()),
            ledger: Ledger::new(config.ledger.clone(), pending),
            cues: CueGate::new(&config.feedback),
            notice: NoticeBoard::new(&config.feedback),
            near: NearOrderHint::default(),
            trade_log: TradeLog::new(config.feedback.trade_log_capacity),
            hands: [HandStatus::idle(Role::Left), HandStatus::idle(Role::Right)],
            price,
            config,
        }
    }

    pub fn config(&self) -> &HtsConfig {
        &self.config
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn price(&self) -> &PriceEngine {
        &self.price
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn trade_log(&self) -> &TradeLog {
        &self.trade_log
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.current()
    }

    // ── Gesture frames ─────────────────────────────────────

    /// Process one camera frame. Every role without an observation gets an
    /// explicit absent update, so a vanished hand forfeits its hold.
    pub fn on_frame(&mut self, hands: &[HandObservation], now: Instant) -> FrameOutcome {
        debug_hooks::log_frame_ingest(hands.len());
        let mut out = FrameOutcome::new();
        let mut seen = [false; 2];

        for obs in hands {
            let role = obs.handedness;
            let label = classify(&obs.landmarks, &self.config.classifier);
            seen[role_slot(role)] = true;
            self.step_role(role, HandInput::Present(label), now, &mut out);
        }
        for role in [Role::Left, Role::Right] {
            if !seen[role_slot(role)] {
                self.step_role(role, HandInput::Absent, now, &mut out);
            }
        }

        self.hands = [out.left, out.right];
        out
    }

    fn step_role(&mut self, role: Role, input: HandInput, now: Instant, out: &mut FrameOutcome) {
        let market = self.price.current_price();
        let g: GestureOutput = self
            .gestures
            .update(role, input, now, market.unwrap_or(f64::NAN));

        *out.hand_mut(role) = HandStatus {
            role,
            label: match input {
                HandInput::Present(l) => Some(l),
                HandInput::Absent => None,
            },
            hold_progress: g.hold_progress,
            fist_active: g.fist_active,
        };

        if let Some(delta) = g.price_adjust {
            out.pending_changed = Some(self.ledger.adjust_pending(delta));
            let cue = if delta >= 0.0 { Cue::PriceUp } else { Cue::PriceDown };
            if self.cues.fire(cue, now) {
                out.cues.push(cue);
            }
        }

        if let (Some(p), Some(_)) = (g.set_order_price, market) {
            out.pending_changed = Some(self.ledger.set_pending(p));
            if self.cues.fire(Cue::Reset, now) {
                out.cues.push(Cue::Reset);
            }
        }

        if let Some(order) = g.order {
            let result = match market {
                Some(_) => self.ledger.confirm_trade(order.side, &self.symbol, order.price),
                None => Err(TradeRejection::NoMarketPrice.into()),
            };
            let report = self.record_trade(TradeOrigin::Gesture, order.side, market, result, now);
            if report.result.is_ok() && self.cues.fire(Cue::Trade, now) {
                out.cues.push(Cue::Trade);
            }
            out.trades.push(report);
        }
    }

    // ── Orders ─────────────────────────────────────────────

    /// Manual BUY/SELL with the order-price text field's contents.
    pub fn confirm_manual(&mut self, side: Side, price_text: &str, now: Instant) -> TradeReport {
        let result = self.ledger.confirm_manual(side, &self.symbol, price_text);
        let price = crate::ledger::parse_price(price_text).ok();
        self.record_trade(TradeOrigin::Manual, side, price, result, now)
    }

    fn record_trade(
        &mut self,
        origin: TradeOrigin,
        side: Side,
        price: Option<f64>,
        result: Result<Fill, OrderError>,
        now: Instant,
    ) -> TradeReport {
        match &result {
            Ok(fill) => {
                let outcome = format!("filled x{} bal={:.0}", fill.quantity, fill.balance_after);
                debug_hooks::log_trade(side, &self.symbol, fill.price, &outcome);
                self.trade_log.push(side, Some(fill.price), outcome);
                self.notice.raise(side, fill.price, fill.quantity, now);
            }
            Err(e) => {
                let outcome = e.to_string();
                debug_hooks::log_trade(side, &self.symbol, price.unwrap_or(f64::NAN), &outcome);
                self.trade_log.push(side, price, outcome);
            }
        }
        TradeReport { origin, side, result }
    }

    // ── Price ──────────────────────────────────────────────

    /// Advance the simulated feed; `ts` is wall-clock unix seconds for bar
    /// bucketing. Historical mode returns the unchanged state.
    pub fn on_sim_tick(&mut self, ts: i64) -> PriceUpdate {
        let old_len = self.price.bars().len();
        if self.price.tick(ts).is_none() {
            return PriceUpdate {
                state: self.price.state(),
                near_order: false,
            };
        }
        self.viewport.sync_len(old_len, self.price.bars().len());
        self.after_price_move()
    }

    pub fn fetch_request(&self) -> Option<FetchRequest> {
        self.price.fetch_request()
    }

    /// Install a finished fetch. On error the bar table, prices and viewport
    /// are untouched and the error is handed back for display.
    pub fn apply_fetch(&mut self, outcome: FetchOutcome) -> Result<PriceUpdate, FetchError> {
        let old_len = self.price.bars().len();
        self.price.apply_fetch(outcome)?;
        self.viewport.sync_len(old_len, self.price.bars().len());
        Ok(self.after_price_move())
    }

    fn after_price_move(&mut self) -> PriceUpdate {
        let state = self.price.state();
        let near_order = state.is_some_and(|s| {
            self.near.update(
                s.current,
                self.ledger.pending_order_price(),
                self.config.feedback.near_order_band,
            )
        });
        if let (true, Some(s)) = (near_order, state) {
            info!(target: "ledger", "price near order level: {:.2}", s.current);
        }
        PriceUpdate { state, near_order }
    }

    // ── Chart ──────────────────────────────────────────────

    pub fn bars(&self) -> &[Bar] {
        self.price.bars()
    }

    pub fn visible_bars(&self) -> &[Bar] {
        self.viewport.visible(self.price.bars())
    }

    pub fn pan(&mut self, new_offset: i64) {
        let len = self.price.bars().len();
        self.viewport.pan(new_offset, len);
    }

    pub fn pan_by(&mut self, delta: i64) {
        let len = self.price.bars().len();
        self.viewport.pan_by(delta, len);
    }

    pub fn zoom(&mut self, direction: ZoomDirection) {
        let len = self.price.bars().len();
        self.viewport.zoom(direction, len);
    }

    /// Bar under pointer `px` for a plot area starting at `px_left`, `px_width` wide.
    pub fn hover(&self, px: f64, px_left: f64, px_width: f64) -> Option<Bar> {
        let t = self.viewport.axis_transform(px_left, px_width);
        self.viewport.hovered_bar(px, &t, self.price.bars()).copied()
    }

    // ── Housekeeping ───────────────────────────────────────

    /// Expire the execution notice. True if something visible changed.
    pub fn tick_housekeeping(&mut self, now: Instant) -> bool {
        self.notice.expire(now)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let visible = self.visible_bars();
        SessionSnapshot {
            symbol: self.symbol.clone(),
            mode: self.price.mode(),
            price: self.price.state(),
            ledger: self.ledger.snapshot(self.price.current_price()),
            hands: self.hands,
            notice: self.notice.current().cloned(),
            viewport: ViewportSnapshot {
                offset: self.viewport.offset(),
                window_size: self.viewport.window_size(),
                bars: self.price.bars().len(),
                y_range: viewport::y_range(visible),
            },
            last_trade: self.trade_log.last().cloned(),
        }
    }
}

fn role_slot(role: Role) -> usize {
    match role {
        Role::Left => 0,
        Role::Right => 1,
    }
}
