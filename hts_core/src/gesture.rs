//! Per-hand gesture state machine.
//!
//! Turns one classified label per hand per frame into trading intents:
//! a fist held for the full hold duration confirms an order, an open palm
//! snaps the pending order price back to market (cooldown gated), and the
//! index/middle gestures nudge the pending price up or down.
//!
//! Holds are strict. Any frame that is not a fist, including a frame where
//! the hand is missing entirely, forfeits the hold.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::classifier::GestureLabel;
use crate::debug_hooks;
use crate::landmarks::Handedness;

/// Hand role. Comes from the tracker's Left/Right label.
pub type Role = Handedness;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

/// Which fist confirms which side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleSides {
    RightBuyLeftSell,
    LeftBuyRightSell,
}

impl RoleSides {
    pub fn side_for(self, role: Role) -> Side {
        match (self, role) {
            (Self::RightBuyLeftSell, Role::Right) | (Self::LeftBuyRightSell, Role::Left) => Side::Buy,
            _ => Side::Sell,
        }
    }
}

/// Which palm shapes count as "reset to market".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetGesture {
    AnyOpenPalm,
    FullyOpenPalmOnly,
}

impl ResetGesture {
    fn accepts(self, label: GestureLabel) -> bool {
        match self {
            Self::AnyOpenPalm => label.is_open_palm(),
            Self::FullyOpenPalmOnly => label == GestureLabel::FullyOpenPalm,
        }
    }
}

// ── Config ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Continuous fist time needed to confirm an order.
    pub hold_duration_ms: u64,
    /// Minimum spacing between reset-to-market emissions, per hand.
    pub reset_cooldown_ms: u64,
    /// Pending price change per PriceUp/PriceDown emission.
    pub price_step: f64,
    /// Minimum spacing between price steps, per hand. 0 fires every frame.
    pub price_step_interval_ms: u64,
    pub role_sides: RoleSides,
    pub reset_gesture: ResetGesture,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            hold_duration_ms: 1500,
            reset_cooldown_ms: 500,
            price_step: 10.0,
            price_step_interval_ms: 0,
            role_sides: RoleSides::RightBuyLeftSell,
            reset_gesture: ResetGesture::AnyOpenPalm,
        }
    }
}

impl GestureConfig {
    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.hold_duration_ms)
    }

    pub fn reset_cooldown(&self) -> Duration {
        Duration::from_millis(self.reset_cooldown_ms)
    }

    pub fn price_step_interval(&self) -> Duration {
        Duration::from_millis(self.price_step_interval_ms)
    }
}

// ── Inputs / outputs ───────────────────────────────────────

/// What the tracker saw for one role this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandInput {
    /// No hand with this role in the frame.
    Absent,
    Present(GestureLabel),
}

/// A hold that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderEvent {
    pub role: Role,
    pub side: Side,
    /// Market price at the moment the hold completed.
    pub price: f64,
}

/// Result of one update for one role.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureOutput {
    pub order: Option<OrderEvent>,
    /// Signed change to apply to the pending order price.
    pub price_adjust: Option<f64>,
    /// Replace the pending order price with this market price.
    pub set_order_price: Option<f64>,
    /// Hold progress in [0, 1], for display only.
    pub hold_progress: f64,
    /// A fist hold is in progress after this update.
    pub fist_active: bool,
}

// ── Per-hand tracking ──────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct HandTimerState {
    /// Set while a fist hold is running.
    hold_start: Option<Instant>,
    last_reset: Option<Instant>,
    last_step: Option<Instant>,
}

impl HandTimerState {
    fn break_hold(&mut self) -> bool {
        self.hold_start.take().is_some()
    }
}

fn cooled_down(last: Option<Instant>, now: Instant, cooldown: Duration) -> bool {
    last.map_or(true, |t| now.saturating_duration_since(t) >= cooldown)
}

// ── State ──────────────────────────────────────────────────

pub struct GestureMachine {
    pub config: GestureConfig,
    left: HandTimerState,
    right: HandTimerState,
}

impl GestureMachine {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            left: HandTimerState::default(),
            right: HandTimerState::default(),
        }
    }

    fn hand_state(&self, role: Role) -> &HandTimerState {
        match role {
            Role::Left => &self.left,
            Role::Right => &self.right,
        }
    }

    fn hand_state_mut(&mut self, role: Role) -> &mut HandTimerState {
        match role {
            Role::Left => &mut self.left,
            Role::Right => &mut self.right,
        }
    }

    /// True while `role` has an unbroken fist hold running.
    pub fn is_holding(&self, role: Role) -> bool {
        self.hand_state(role).hold_start.is_some()
    }

    /// Advance one role by one frame. `market_price` is the price engine's
    /// current price, used for completed holds and reset-to-market.
    pub fn update(
        &mut self,
        role: Role,
        input: HandInput,
        now: Instant,
        market_price: f64,
    ) -> GestureOutput {
        let hold = self.config.hold_duration();
        let reset_cooldown = self.config.reset_cooldown();
        let step_interval = self.config.price_step_interval();
        let step = self.config.price_step;
        let side = self.config.role_sides.side_for(role);
        let reset_gesture = self.config.reset_gesture;

        let hs = self.hand_state_mut(role);
        let mut out = GestureOutput::default();

        let label = match input {
            HandInput::Absent => {
                if hs.break_hold() {
                    debug_hooks::log_hold_broken(role, "absent");
                }
                return out;
            }
            HandInput::Present(label) => label,
        };

        if label == GestureLabel::Fist {
            match hs.hold_start {
                None => {
                    hs.hold_start = Some(now);
                    out.fist_active = true;
                    debug_hooks::log_hold_started(role);
                }
                Some(start) => {
                    let elapsed = now.saturating_duration_since(start);
                    if elapsed >= hold {
                        hs.hold_start = None;
                        out.order = Some(OrderEvent { role, side, price: market_price });
                        debug_hooks::log_hold_completed(role, side, elapsed, market_price);
                    } else {
                        out.hold_progress = (elapsed.as_secs_f64() / hold.as_secs_f64()).min(1.0);
                        out.fist_active = true;
                    }
                }
            }
            return out;
        }

        // Anything but a fist ends the hold; this frame is then handled as idle.
        if hs.break_hold() {
            debug_hooks::log_hold_broken(role, label.as_str());
        }

        match label {
            GestureLabel::PriceUp | GestureLabel::PriceDown => {
                if cooled_down(hs.last_step, now, step_interval) {
                    hs.last_step = Some(now);
                    let delta = if label == GestureLabel::PriceUp { step } else { -step };
                    out.price_adjust = Some(delta);
                }
            }
            l if reset_gesture.accepts(l) => {
                if cooled_down(hs.last_reset, now, reset_cooldown) {
                    hs.last_reset = Some(now);
                    out.set_order_price = Some(market_price);
                }
            }
            _ => {}
        }
        out
    }

    /// Forget all timers (hold, cooldowns) for both hands.
    pub fn reset(&mut self) {
        self.left = HandTimerState::default();
        self.right = HandTimerState::default();
    }
}
