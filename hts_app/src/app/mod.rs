pub mod event;
pub mod reducer;
pub mod render;
pub mod state;

use std::io::Write;
use std::time::Instant;

pub use event::*;
pub use state::*;

use tracing::warn;

pub struct AppRuntime {
    pub state: AppState,
    out: Box<dyn Write + Send>,
    dirty: bool,
    last_tick: Option<Instant>,
}

impl AppRuntime {
    pub fn new(state: AppState, out: Box<dyn Write + Send>) -> Self {
        Self {
            state,
            out,
            dirty: true,
            last_tick: None,
        }
    }

    pub fn handle_event(&mut self, ev: AppEvent) {
        let changed = reducer::reduce(&mut self.state, ev);
        if changed {
            self.dirty = true;
        }
    }

    /// Housekeeping at most once a second.
    pub fn tick_if_needed(&mut self, now: Instant) {
        let due = self
            .last_tick
            .map_or(true, |t| now.duration_since(t).as_secs() >= 1);
        if due {
            self.last_tick = Some(now);
            self.handle_event(AppEvent::Timer(TimerEvent::Tick1s { now }));
        }
    }

    pub fn render(&mut self) {
        if let Err(e) = render::render(&self.state, self.out.as_mut()) {
            warn!(target: "render", "render failed: {e}");
        }
        self.state.cues.clear();
        self.dirty = false;
    }

    pub fn render_if_dirty(&mut self) {
        if self.dirty {
            self.render();
        }
    }
}
