//! Background fetch workers and the per-symbol in-flight guard.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::candles::BarTable;
use crate::debug_hooks;
use crate::error::FetchError;

use super::source::{fetch_bars, BarSource};
use super::Interval;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub symbol: String,
    pub interval: Interval,
    pub period: String,
}

/// A finished fetch, handed back to the loop thread.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub request: FetchRequest,
    pub result: Result<BarTable, FetchError>,
}

/// Symbols with a fetch currently running. Shared by clone.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    symbols: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // a panicked worker must not wedge fetching forever
        self.symbols.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Claim `symbol`, or `None` when a fetch for it is already running.
    pub fn try_begin(&self, symbol: &str) -> Option<FetchTicket> {
        let mut set = self.lock();
        if !set.insert(symbol.to_string()) {
            return None;
        }
        Some(FetchTicket {
            owner: self.clone(),
            symbol: symbol.to_string(),
        })
    }

    pub fn is_in_flight(&self, symbol: &str) -> bool {
        self.lock().contains(symbol)
    }
}

/// Releases its symbol on drop.
#[derive(Debug)]
pub struct FetchTicket {
    owner: InFlight,
    symbol: String,
}

impl Drop for FetchTicket {
    fn drop(&mut self) {
        self.owner.lock().remove(&self.symbol);
    }
}

/// Run `request` on a worker thread and pass the outcome to `on_done`.
///
/// A request for a symbol that is already being fetched is dropped and
/// reported as `FetchError::InFlight`; it is not queued.
pub fn spawn_fetch<F>(
    guard: &InFlight,
    source: Arc<dyn BarSource>,
    request: FetchRequest,
    on_done: F,
) -> Result<JoinHandle<()>, FetchError>
where
    F: FnOnce(FetchOutcome) + Send + 'static,
{
    let Some(ticket) = guard.try_begin(&request.symbol) else {
        debug_hooks::log_fetch_dropped(&request.symbol);
        return Err(FetchError::InFlight {
            symbol: request.symbol,
        });
    };

    debug_hooks::log_fetch_start(&request.symbol, request.interval, &request.period);
    Ok(thread::spawn(move || {
        let result = fetch_bars(source.as_ref(), &request.symbol, request.interval, &request.period);
        drop(ticket);
        on_done(FetchOutcome { request, result });
    }))
}
