use std::io::{self, Write};

use chrono::{DateTime, Utc};
use hts_core::feedback::Cue;
use hts_core::session::SessionSnapshot;
use hts_core::Bar;
use serde::Serialize;

use super::state::*;

#[derive(Debug, Serialize)]
struct HoverView {
    #[serde(flatten)]
    bar: Bar,
    date: String,
}

/// One line of GUI output.
#[derive(Debug, Serialize)]
struct RenderFrame<'a> {
    #[serde(flatten)]
    session: SessionSnapshot,
    visible: &'a [Bar],
    hover: Option<HoverView>,
    message: &'a str,
    cues: &'a [Cue],
}

fn format_bar_date(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Write the current state as a single JSON line.
pub fn render(state: &AppState, out: &mut dyn Write) -> io::Result<()> {
    let frame = RenderFrame {
        session: state.session.snapshot(),
        visible: state.session.visible_bars(),
        hover: state.hover.map(|bar| HoverView {
            bar,
            date: format_bar_date(bar.ts),
        }),
        message: &state.message,
        cues: &state.cues,
    };
    serde_json::to_writer(&mut *out, &frame)?;
    out.write_all(b"\n")?;
    out.flush()
}
