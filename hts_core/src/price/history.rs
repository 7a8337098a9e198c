use crate::candles::BarTable;
use crate::debug_hooks;
use crate::error::FetchError;

use super::fetch::{FetchOutcome, FetchRequest};
use super::{Interval, PriceState};

/// Historical mode: the latest successfully fetched table and the prices
/// derived from it.
pub struct HistoricalFeed {
    symbol: String,
    interval: Interval,
    period: String,
    table: BarTable,
    state: Option<PriceState>,
}

impl HistoricalFeed {
    pub fn new(symbol: String, interval: Interval, period: String) -> Self {
        Self {
            symbol,
            interval,
            period,
            table: BarTable::default(),
            state: None,
        }
    }

    pub fn request(&self) -> FetchRequest {
        FetchRequest {
            symbol: self.symbol.clone(),
            interval: self.interval,
            period: self.period.clone(),
        }
    }

    pub fn table(&self) -> &BarTable {
        &self.table
    }

    pub fn state(&self) -> Option<PriceState> {
        self.state
    }

    /// Replace the table wholesale on success. A failure, or a result for a
    /// request this feed no longer wants, leaves everything as it was.
    pub fn apply(&mut self, outcome: FetchOutcome) -> Result<(), FetchError> {
        let FetchOutcome { request, result } = outcome;
        let table = match result {
            Ok(t) => t,
            Err(e) => {
                debug_hooks::log_fetch_failed(&request.symbol, &e);
                return Err(e);
            }
        };
        if request != self.request() {
            tracing::debug!(target: "feed.fetch", "stale result ignored symbol={}", request.symbol);
            return Ok(());
        }
        let Some(state) = PriceState::from_table(&table) else {
            let e = FetchError::NoData {
                symbol: request.symbol,
                interval: request.interval,
            };
            debug_hooks::log_fetch_failed(&self.symbol, &e);
            return Err(e);
        };

        debug_hooks::log_fetch_applied(&self.symbol, table.len(), state.current);
        self.table = table;
        self.state = Some(state);
        Ok(())
    }
}
