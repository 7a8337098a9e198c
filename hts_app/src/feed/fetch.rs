use std::sync::mpsc::Sender;
use std::sync::Arc;

use hts_core::error::FetchError;
use hts_core::price::{spawn_fetch, BarSource, FetchRequest, InFlight};

use crate::app::AppEvent;

/// Starts bar fetches on worker threads; results come back as
/// `AppEvent::Fetched` on the loop channel.
pub struct FetchDispatch {
    source: Arc<dyn BarSource>,
    guard: InFlight,
    tx: Sender<AppEvent>,
}

impl FetchDispatch {
    pub fn new(source: Arc<dyn BarSource>, tx: Sender<AppEvent>) -> Self {
        Self {
            source,
            guard: InFlight::new(),
            tx,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// `Err(FetchError::InFlight)` when the symbol is already being fetched;
    /// that request is dropped.
    pub fn request(&self, req: FetchRequest) -> Result<(), FetchError> {
        let tx = self.tx.clone();
        spawn_fetch(&self.guard, self.source.clone(), req, move |outcome| {
            let _ = tx.send(AppEvent::Fetched(outcome));
        })
        .map(|_| ())
    }
}
