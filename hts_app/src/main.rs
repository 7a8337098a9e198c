mod app;
mod feed;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use hts_core::config::default_config_path;
use hts_core::price::PriceMode;
use hts_core::{HtsConfig, Session};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use app::{now_unix, AppEvent, AppRuntime, AppState, TimerEvent};
use feed::fetch::FetchDispatch;
use feed::input;

const RENDER_EVERY: Duration = Duration::from_millis(250);
const MIN_SIM_STEP: Duration = Duration::from_millis(5);

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    input: Option<PathBuf>,
    write_default_config: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                args.config = Some(it.next().context("--config needs a path")?.into());
            }
            "--input" => {
                args.input = Some(it.next().context("--input needs a path")?.into());
            }
            "--write-default-config" => args.write_default_config = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;

    if args.write_default_config {
        let path = args
            .config
            .or_else(default_config_path)
            .context("no config directory available")?;
        HtsConfig::default()
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote default config to {}", path.display());
        return Ok(());
    }

    let (cfg, _) = HtsConfig::load(args.config.as_deref()).context("loading config")?;

    let sim_step = Duration::from_secs_f64(cfg.price.tick_dt.max(0.0)).max(MIN_SIM_STEP);
    let refresh_every = Duration::from_secs(cfg.price.refresh_secs.max(1));
    let mode = cfg.price.mode;
    let source = cfg.price.build_source();

    let (tx, rx) = mpsc::channel::<AppEvent>();

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
            .context("installing ctrl-c handler")?;
    }

    let fetch = FetchDispatch::new(source, tx.clone());
    info!(
        "starting: symbol={} mode={:?} source={}",
        cfg.price.symbol,
        mode,
        fetch.source_name()
    );

    match args.input {
        Some(path) => input::start_file_bridge(path, tx.clone()),
        None => input::start_stdin_bridge(tx.clone()),
    }

    let mut rt = AppRuntime::new(
        AppState::new(Session::new(cfg), fetch),
        Box::new(std::io::stdout()),
    );

    let start = Instant::now();
    let mut next_sim = start;
    let mut next_render = start;
    // Historical mode fetches right away, then every `refresh_secs`.
    let mut next_refresh = start;

    while !shutdown.load(Ordering::SeqCst) {
        let now = Instant::now();

        if mode == PriceMode::Simulated && now >= next_sim {
            rt.handle_event(AppEvent::Timer(TimerEvent::SimTick { ts: now_unix() }));
            next_sim += sim_step;
            if next_sim < now {
                // fell behind; don't burst
                next_sim = now + sim_step;
            }
        }
        if mode == PriceMode::Historical && now >= next_refresh {
            rt.handle_event(AppEvent::Timer(TimerEvent::Refresh));
            next_refresh = now + refresh_every;
        }
        rt.tick_if_needed(now);
        if now >= next_render {
            rt.render_if_dirty();
            next_render = now + RENDER_EVERY;
        }

        let mut wake = next_render;
        if mode == PriceMode::Simulated {
            wake = wake.min(next_sim);
        }
        let wait = wake.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok(ev) => {
                rt.handle_event(ev);
                while let Ok(ev) = rx.try_recv() {
                    rt.handle_event(ev);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!("event channel closed");
                break;
            }
        }
    }

    rt.render();
    let ledger = rt.state.session.snapshot().ledger;
    info!(
        "shutdown: balance={:.0} holdings={:?} pending={:.2} trades={}",
        ledger.balance,
        ledger.holdings,
        ledger.pending_order_price,
        rt.state.session.trade_log().len()
    );
    Ok(())
}
