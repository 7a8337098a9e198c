//! Balance, holdings and the pending order price.
//!
//! `confirm_trade` is the single entry point that moves money; gesture
//! orders and manual orders both go through it. Any failure leaves the
//! ledger exactly as it was.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{OrderError, TradeRejection, ValidationError};
use crate::gesture::Side;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub initial_balance: f64,
    /// Quote-currency → account-currency multiplier applied to every cost.
    pub fx_rate: f64,
    pub order_quantity: u64,
    pub min_order_price: f64,
    pub max_order_price: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_balance: 50_000_000.0,
            fx_rate: 1.0,
            order_quantity: 1,
            min_order_price: 1.0,
            max_order_price: 1e9,
        }
    }
}

/// A trade that went through.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    pub side: Side,
    pub symbol: String,
    pub price: f64,
    pub quantity: u64,
    /// Account-currency amount debited (BUY) or credited (SELL).
    pub cost: f64,
    pub balance_after: f64,
    pub holdings_after: u64,
}

/// Read-only view for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSnapshot {
    pub balance: f64,
    pub holdings: BTreeMap<String, u64>,
    pub pending_order_price: f64,
    pub last_order_price: Option<f64>,
    pub current_price: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
    balance: f64,
    holdings: BTreeMap<String, u64>,
    pending_order_price: f64,
    last_order_price: Option<f64>,
}

/// Parse order-price text as typed by the user.
pub fn parse_price(text: &str) -> Result<f64, ValidationError> {
    let t = text.trim().replace(',', "");
    if t.is_empty() {
        return Err(ValidationError::EmptyPrice);
    }
    let v: f64 = t
        .parse()
        .map_err(|_| ValidationError::NotNumeric(text.trim().to_string()))?;
    if !v.is_finite() {
        return Err(ValidationError::NotNumeric(text.trim().to_string()));
    }
    if v <= 0.0 {
        return Err(ValidationError::NonPositive(v));
    }
    Ok(v)
}

impl Ledger {
    pub fn new(config: LedgerConfig, pending_order_price: f64) -> Self {
        let mut l = Self {
            balance: config.initial_balance.max(0.0),
            holdings: BTreeMap::new(),
            pending_order_price: 0.0,
            last_order_price: None,
            config,
        };
        l.set_pending(pending_order_price);
        l
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn holding(&self, symbol: &str) -> u64 {
        self.holdings.get(symbol).copied().unwrap_or(0)
    }

    pub fn pending_order_price(&self) -> f64 {
        self.pending_order_price
    }

    pub fn last_order_price(&self) -> Option<f64> {
        self.last_order_price
    }

    fn clamp_price(&self, price: f64) -> f64 {
        price.clamp(self.config.min_order_price, self.config.max_order_price)
    }

    /// Add `delta` to the pending order price, clamped to the allowed range.
    pub fn adjust_pending(&mut self, delta: f64) -> f64 {
        if delta.is_finite() {
            self.pending_order_price = self.clamp_price(self.pending_order_price + delta);
        }
        self.pending_order_price
    }

    pub fn set_pending(&mut self, price: f64) -> f64 {
        if price.is_finite() {
            self.pending_order_price = self.clamp_price(price);
        }
        self.pending_order_price
    }

    /// Apply one trade of `order_quantity` units at `price`.
    pub fn confirm_trade(&mut self, side: Side, symbol: &str, price: f64) -> Result<Fill, OrderError> {
        if !price.is_finite() {
            return Err(ValidationError::NotNumeric(price.to_string()).into());
        }
        if price <= 0.0 {
            return Err(ValidationError::NonPositive(price).into());
        }
        let qty = self.config.order_quantity.max(1);
        let cost = price * self.config.fx_rate * qty as f64;
        let held = self.holding(symbol);

        let (balance_after, holdings_after) = match side {
            Side::Buy => {
                if cost > self.balance {
                    return Err(TradeRejection::InsufficientBalance {
                        required: cost,
                        available: self.balance,
                    }
                    .into());
                }
                (self.balance - cost, held + qty)
            }
            Side::Sell => {
                if held < qty {
                    return Err(TradeRejection::NoHoldings {
                        symbol: symbol.to_string(),
                    }
                    .into());
                }
                (self.balance + cost, held - qty)
            }
        };

        self.balance = balance_after;
        self.holdings.insert(symbol.to_string(), holdings_after);
        self.last_order_price = Some(price);

        Ok(Fill {
            side,
            symbol: symbol.to_string(),
            price,
            quantity: qty,
            cost,
            balance_after,
            holdings_after,
        })
    }

    /// Manual order: the price comes from the order-price text field.
    pub fn confirm_manual(&mut self, side: Side, symbol: &str, price_text: &str) -> Result<Fill, OrderError> {
        let price = parse_price(price_text)?;
        self.confirm_trade(side, symbol, price)
    }

    pub fn snapshot(&self, current_price: Option<f64>) -> LedgerSnapshot {
        LedgerSnapshot {
            balance: self.balance,
            holdings: self.holdings.clone(),
            pending_order_price: self.pending_order_price,
            last_order_price: self.last_order_price,
            current_price,
        }
    }
}
