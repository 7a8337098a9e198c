use std::time::Instant;

use hts_core::price::FetchOutcome;
use hts_core::{HandObservation, ZoomDirection};

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// One camera frame; `at` is when the bridge read it.
    Frame {
        hands: Vec<HandObservation>,
        at: Instant,
    },
    Ui(UiEvent),
    Fetched(FetchOutcome),
    Timer(TimerEvent),
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    Buy { price: String },
    Sell { price: String },
    Zoom { direction: ZoomDirection },
    Pan { offset: i64 },
    PanBy { delta: i64 },
    Hover { x: f64, plot_left: f64, plot_width: f64 },
    HoverCleared,
    ReloadData,
}

#[derive(Debug, Clone)]
pub enum TimerEvent {
    /// Simulated price step; `ts` is unix seconds.
    SimTick { ts: i64 },
    /// Periodic historical refresh.
    Refresh,
    Tick1s { now: Instant },
}
