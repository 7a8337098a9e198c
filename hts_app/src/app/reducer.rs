use std::time::Instant;

use hts_core::error::FetchError;
use hts_core::session::{FrameOutcome, TradeReport};
use hts_core::Side;
use tracing::warn;

use super::event::*;
use super::state::*;

pub fn reduce(state: &mut AppState, ev: AppEvent) -> bool {
    match ev {
        AppEvent::Frame { hands, at } => {
            let outcome = state.session.on_frame(&hands, at);
            reduce_frame(state, outcome)
        }
        AppEvent::Ui(u) => reduce_ui(state, u),
        AppEvent::Fetched(outcome) => match state.session.apply_fetch(outcome) {
            Ok(update) => {
                if update.near_order {
                    state.message = "Price near order level.".to_string();
                }
                // Bars moved under the pointer; the old hover no longer applies.
                state.hover = None;
                true
            }
            Err(e) => {
                state.message = format!("fetch failed: {e}");
                true
            }
        },
        AppEvent::Timer(t) => reduce_timer(state, t),
    }
}

fn reduce_frame(state: &mut AppState, outcome: FrameOutcome) -> bool {
    let hands = [outcome.left, outcome.right];
    let hands_changed = state.last_hands != Some(hands);
    state.last_hands = Some(hands);

    for report in &outcome.trades {
        state.message = trade_message(report);
    }
    if let Some(price) = outcome.pending_changed {
        if outcome.trades.is_empty() {
            state.message = format!("Order price: {price:.2}");
        }
    }
    let busy = !outcome.is_empty();
    state.cues.extend(outcome.cues);
    busy || hands_changed
}

fn reduce_ui(state: &mut AppState, ev: UiEvent) -> bool {
    match ev {
        UiEvent::Buy { price } => {
            let report = state.session.confirm_manual(Side::Buy, &price, Instant::now());
            state.message = trade_message(&report);
            true
        }
        UiEvent::Sell { price } => {
            let report = state.session.confirm_manual(Side::Sell, &price, Instant::now());
            state.message = trade_message(&report);
            true
        }
        UiEvent::Zoom { direction } => {
            let before = state.session.viewport().window_size();
            state.session.zoom(direction);
            state.session.viewport().window_size() != before
        }
        UiEvent::Pan { offset } => {
            let before = state.session.viewport().offset();
            state.session.pan(offset);
            state.session.viewport().offset() != before
        }
        UiEvent::PanBy { delta } => {
            let before = state.session.viewport().offset();
            state.session.pan_by(delta);
            state.session.viewport().offset() != before
        }
        UiEvent::Hover { x, plot_left, plot_width } => {
            let next = state.session.hover(x, plot_left, plot_width);
            let changed = next != state.hover;
            state.hover = next;
            changed
        }
        UiEvent::HoverCleared => state.hover.take().is_some(),
        UiEvent::ReloadData => start_fetch(state),
    }
}

fn reduce_timer(state: &mut AppState, ev: TimerEvent) -> bool {
    match ev {
        TimerEvent::SimTick { ts } => {
            let update = state.session.on_sim_tick(ts);
            if update.near_order {
                state.message = "Price near order level.".to_string();
            }
            // Ticks reshape the newest bar and can roll the window.
            state.hover = None;
            update.state.is_some()
        }
        TimerEvent::Refresh => start_fetch(state),
        TimerEvent::Tick1s { now } => state.session.tick_housekeeping(now),
    }
}

fn start_fetch(state: &mut AppState) -> bool {
    let Some(req) = state.session.fetch_request() else {
        return false;
    };
    match state.fetch.request(req) {
        Ok(()) => false,
        Err(FetchError::InFlight { .. }) => {
            state.message = "fetch already running".to_string();
            true
        }
        Err(e) => {
            warn!(target: "fetch", "fetch not started: {e}");
            state.message = format!("fetch failed: {e}");
            true
        }
    }
}

fn trade_message(report: &TradeReport) -> String {
    match &report.result {
        Ok(fill) => format!(
            "{} {} x{} @ {:.2}",
            report.side.as_str(),
            fill.symbol,
            fill.quantity,
            fill.price
        ),
        Err(e) => format!("{} rejected: {e}", report.side.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::time::Duration;

    use hts_core::price::{BarSource, FetchOutcome, FetchRequest, PriceConfig, PriceMode};
    use hts_core::{Bar, BarTable, HtsConfig, Interval, Session, ZoomDirection};

    use crate::feed::fetch::FetchDispatch;

    struct Fixed(Vec<Bar>);

    impl BarSource for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn fetch(&self, _: &str, _: Interval, _: &str) -> Result<Vec<Bar>, FetchError> {
            Ok(self.0.clone())
        }
    }

    fn bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar::flat(1_700_000_000 + i as i64 * 86_400, 100.0 + i as f64, 10.0))
            .collect()
    }

    fn state_with(mode: PriceMode) -> (AppState, mpsc::Receiver<AppEvent>) {
        let mut cfg = HtsConfig::default();
        cfg.price = PriceConfig {
            mode,
            seed: Some(11),
            ..Default::default()
        };
        let (tx, rx) = mpsc::channel();
        let fetch = FetchDispatch::new(Arc::new(Fixed(bars(120))), tx);
        (AppState::new(Session::new(cfg), fetch), rx)
    }

    #[test]
    fn manual_buy_sets_message_and_moves_balance() {
        let (mut state, _rx) = state_with(PriceMode::Simulated);
        let before = state.session.ledger().balance();
        let changed = reduce(&mut state, AppEvent::Ui(UiEvent::Buy { price: "1,000".into() }));
        assert!(changed);
        assert!(state.message.starts_with("BUY"), "{}", state.message);
        assert_eq!(state.session.ledger().balance(), before - 1000.0);
    }

    #[test]
    fn bad_price_text_is_reported() {
        let (mut state, _rx) = state_with(PriceMode::Simulated);
        let before = state.session.ledger().balance();
        reduce(&mut state, AppEvent::Ui(UiEvent::Sell { price: "abc".into() }));
        assert!(state.message.contains("rejected"), "{}", state.message);
        assert_eq!(state.session.ledger().balance(), before);
    }

    #[test]
    fn reload_round_trips_through_the_worker() {
        let (mut state, rx) = state_with(PriceMode::Historical);
        assert!(state.session.price().state().is_none());

        reduce(&mut state, AppEvent::Ui(UiEvent::ReloadData));
        let ev = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(ev, AppEvent::Fetched(_)));
        assert!(reduce(&mut state, ev));

        assert_eq!(state.session.bars().len(), 120);
        let price = state.session.price().state().unwrap();
        assert_eq!(price.current, 219.0);
        assert_eq!(price.previous, 218.0);
    }

    #[test]
    fn failed_fetch_sets_message_only() {
        let (mut state, _rx) = state_with(PriceMode::Historical);
        let req = state.session.fetch_request().unwrap();
        let ok = FetchOutcome {
            request: req.clone(),
            result: Ok(BarTable::from_bars(bars(30))),
        };
        reduce(&mut state, AppEvent::Fetched(ok));
        let before = state.session.price().state();

        let failed = FetchOutcome {
            request: req,
            result: Err(FetchError::Network("timed out".into())),
        };
        assert!(reduce(&mut state, AppEvent::Fetched(failed)));
        assert!(state.message.starts_with("fetch failed"), "{}", state.message);
        assert_eq!(state.session.price().state(), before);
        assert_eq!(state.session.bars().len(), 30);
    }

    #[test]
    fn stale_fetch_is_ignored() {
        let (mut state, _rx) = state_with(PriceMode::Historical);
        let stale = FetchOutcome {
            request: FetchRequest {
                symbol: "MSFT".into(),
                interval: Interval::Day,
                period: "1y".into(),
            },
            result: Ok(BarTable::from_bars(bars(5))),
        };
        reduce(&mut state, AppEvent::Fetched(stale));
        assert!(state.session.bars().is_empty());
    }

    #[test]
    fn zoom_and_hover_on_simulated_bars() {
        let (mut state, _rx) = state_with(PriceMode::Simulated);
        for ts in 0..80 {
            reduce(&mut state, AppEvent::Timer(TimerEvent::SimTick { ts }));
        }
        assert_eq!(state.session.bars().len(), 80);
        assert_eq!(state.session.viewport().window_size(), 60);

        assert!(reduce(
            &mut state,
            AppEvent::Ui(UiEvent::Zoom { direction: ZoomDirection::In })
        ));
        assert_eq!(state.session.viewport().window_size(), 54);

        reduce(
            &mut state,
            AppEvent::Ui(UiEvent::Hover { x: 500.0, plot_left: 0.0, plot_width: 1000.0 }),
        );
        assert!(state.hover.is_some());
        assert!(reduce(&mut state, AppEvent::Ui(UiEvent::HoverCleared)));
        assert!(state.hover.is_none());
        assert!(!reduce(&mut state, AppEvent::Ui(UiEvent::HoverCleared)));
    }

    #[test]
    fn sim_tick_drops_stale_hover() {
        let (mut state, _rx) = state_with(PriceMode::Simulated);
        for ts in 0..20 {
            reduce(&mut state, AppEvent::Timer(TimerEvent::SimTick { ts }));
        }
        reduce(
            &mut state,
            AppEvent::Ui(UiEvent::Hover { x: 500.0, plot_left: 0.0, plot_width: 1000.0 }),
        );
        assert!(state.hover.is_some());

        reduce(&mut state, AppEvent::Timer(TimerEvent::SimTick { ts: 20 }));
        assert!(state.hover.is_none());
    }

    #[test]
    fn refresh_is_a_no_op_when_simulated() {
        let (mut state, rx) = state_with(PriceMode::Simulated);
        assert!(!reduce(&mut state, AppEvent::Timer(TimerEvent::Refresh)));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn empty_frames_only_dirty_once() {
        let (mut state, _rx) = state_with(PriceMode::Simulated);
        let at = Instant::now();
        assert!(reduce(&mut state, AppEvent::Frame { hands: vec![], at }));
        assert!(!reduce(
            &mut state,
            AppEvent::Frame { hands: vec![], at: at + Duration::from_millis(33) }
        ));
    }
}
