use std::time::{SystemTime, UNIX_EPOCH};

use hts_core::feedback::Cue;
use hts_core::session::HandStatus;
use hts_core::{Bar, Session};

use crate::feed::fetch::FetchDispatch;

pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub struct AppState {
    pub session: Session,
    pub fetch: FetchDispatch,

    /// Bar under the pointer, if any.
    pub hover: Option<Bar>,
    /// Last status line for the GUI (order results, fetch errors, hints).
    pub message: String,
    /// Cues raised since the last render.
    pub cues: Vec<Cue>,
    pub last_hands: Option<[HandStatus; 2]>,
}

impl AppState {
    pub fn new(session: Session, fetch: FetchDispatch) -> Self {
        Self {
            session,
            fetch,
            hover: None,
            message: String::new(),
            cues: Vec::new(),
            last_hands: None,
        }
    }
}
