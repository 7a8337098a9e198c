use std::time::Instant;

use chrono::{TimeZone, Utc};
use hts_core::config::HtsConfig;
use hts_core::error::{FetchError, OrderError, TradeRejection};
use hts_core::ledger::LedgerConfig;
use hts_core::price::{FetchOutcome, PriceMode};
use hts_core::viewport::ViewportConfig;
use hts_core::{resample_yearly, Bar, BarTable, Ledger, Session, Side, Viewport, ZoomDirection};

fn historical_session() -> Session {
    let mut cfg = HtsConfig::default();
    cfg.price.mode = PriceMode::Historical;
    Session::new(cfg)
}

fn daily_bars(n: usize, start_close: f64) -> BarTable {
    BarTable::from_bars(
        (0..n)
            .map(|i| Bar::flat(1_600_000_000 + i as i64 * 86_400, start_close + i as f64, 100.0))
            .collect(),
    )
}

#[test]
fn buy_then_sell_restores_balance() {
    let mut ledger = Ledger::new(LedgerConfig::default(), 1000.0);
    let rate = ledger.config().fx_rate;

    let buy = ledger.confirm_trade(Side::Buy, "AAPL", 1000.0).unwrap();
    assert_eq!(ledger.balance(), 50_000_000.0 - 1000.0 * rate);
    assert_eq!(ledger.holding("AAPL"), 1);
    assert_eq!(buy.cost, 1000.0 * rate);

    ledger.confirm_trade(Side::Sell, "AAPL", 1000.0).unwrap();
    assert_eq!(ledger.balance(), 50_000_000.0);
    assert_eq!(ledger.holding("AAPL"), 0);
}

#[test]
fn buy_beyond_balance_is_rejected() {
    let mut session = historical_session();
    let req = session.fetch_request().unwrap();
    session
        .apply_fetch(FetchOutcome { request: req, result: Ok(daily_bars(5, 60_000_000.0)) })
        .unwrap();

    let before = session.ledger().snapshot(None);
    let report = session.confirm_manual(Side::Buy, "60000000", Instant::now());
    match report.result {
        Err(OrderError::Rejected(TradeRejection::InsufficientBalance { required, available })) => {
            assert_eq!(required, 60_000_000.0);
            assert_eq!(available, 50_000_000.0);
        }
        other => panic!("expected insufficient balance, got {other:?}"),
    }
    assert_eq!(session.ledger().snapshot(None), before);
}

#[test]
fn zoom_in_from_sixty_gives_fifty_four() {
    let len = 250;
    let mut vp = Viewport::new(ViewportConfig::default(), len);
    assert_eq!(vp.window_size(), 60);
    vp.zoom(ZoomDirection::In, len);
    assert_eq!(vp.window_size(), 54);
    assert!(vp.offset() + vp.window_size() <= len);
    assert!(vp.shows_latest(len));
}

#[test]
fn viewport_invariants_hold_under_random_ops() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    for _ in 0..50 {
        let mut len: usize = rng.random_range(0..400);
        let mut vp = Viewport::new(ViewportConfig::default(), len);
        for _ in 0..200 {
            match rng.random_range(0..4) {
                0 => vp.pan(rng.random_range(-100..500), len),
                1 => vp.zoom(ZoomDirection::In, len),
                2 => vp.zoom(ZoomDirection::Out, len),
                _ => {
                    let new_len = rng.random_range(0..400);
                    vp.sync_len(len, new_len);
                    len = new_len;
                }
            }
            assert!(vp.offset() + vp.window_size() <= len, "{vp:?} len={len}");
            assert!(vp.window_size() <= len);
            if len >= 10 {
                assert!(vp.window_size() >= 10, "{vp:?} len={len}");
            }
        }
    }
}

#[test]
fn two_years_of_months_resample_to_two_bars() {
    let mut monthly = Vec::new();
    for (y, year) in [2021, 2022].into_iter().enumerate() {
        for m in 1..=12u32 {
            let ts = Utc.with_ymd_and_hms(year, m, 1, 0, 0, 0).unwrap().timestamp();
            let base = 1000.0 * (y + 1) as f64 + m as f64;
            monthly.push(Bar { ts, open: base, high: base + 10.0, low: base - 10.0, close: base + 2.0, volume: 5.0 });
        }
    }
    let yearly = resample_yearly(&monthly);
    assert_eq!(yearly.len(), 2);
    assert_eq!(
        (yearly[0].open, yearly[0].high, yearly[0].low, yearly[0].close, yearly[0].volume),
        (1001.0, 1022.0, 991.0, 1014.0, 60.0)
    );
    assert_eq!(
        (yearly[1].open, yearly[1].high, yearly[1].low, yearly[1].close, yearly[1].volume),
        (2001.0, 2022.0, 1991.0, 2014.0, 60.0)
    );
}

#[test]
fn failed_fetch_leaves_chart_and_price_alone() {
    let mut session = historical_session();
    let req = session.fetch_request().unwrap();
    session
        .apply_fetch(FetchOutcome { request: req.clone(), result: Ok(daily_bars(120, 100.0)) })
        .unwrap();
    session.pan(10);
    session.zoom(ZoomDirection::In);

    let bars_before: Vec<Bar> = session.bars().to_vec();
    let price_before = session.price().state();
    let view_before = (session.viewport().offset(), session.viewport().window_size());

    for err in [
        FetchError::Network("connection reset".into()),
        FetchError::NoData { symbol: req.symbol.clone(), interval: req.interval },
    ] {
        let res = session.apply_fetch(FetchOutcome { request: req.clone(), result: Err(err.clone()) });
        assert_eq!(res.unwrap_err(), err);
        assert_eq!(session.bars(), &bars_before[..]);
        assert_eq!(session.price().state(), price_before);
        assert_eq!((session.viewport().offset(), session.viewport().window_size()), view_before);
    }
}

#[test]
fn refresh_keeps_following_latest_bar() {
    let mut session = historical_session();
    let req = session.fetch_request().unwrap();
    session
        .apply_fetch(FetchOutcome { request: req.clone(), result: Ok(daily_bars(100, 100.0)) })
        .unwrap();
    assert!(session.viewport().shows_latest(100));

    let update = session
        .apply_fetch(FetchOutcome { request: req, result: Ok(daily_bars(101, 100.0)) })
        .unwrap();
    assert_eq!(session.visible_bars().last(), session.bars().last());
    let state = update.state.unwrap();
    assert_eq!((state.current, state.previous), (200.0, 199.0));
}

#[test]
fn seeded_simulation_is_reproducible() {
    let run = |seed| {
        let mut cfg = HtsConfig::default();
        cfg.price.seed = Some(seed);
        let mut s = Session::new(cfg);
        (0..1000)
            .map(|i| s.on_sim_tick(1_700_000_000 + i / 20).state.unwrap().current)
            .collect::<Vec<f64>>()
    };
    let a = run(42);
    assert_eq!(a, run(42));
    assert!(a.iter().all(|p| *p >= 1.0));
}
