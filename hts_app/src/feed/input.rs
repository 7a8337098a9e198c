//! JSONL input bridge: landmark frames from the hand tracker and GUI
//! commands, one tagged JSON object per line.

use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use hts_core::{HandObservation, ZoomDirection};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::app::{AppEvent, UiEvent};

const IDLE_SLEEP: Duration = Duration::from_millis(20);

fn default_plot_width() -> f64 {
    1000.0
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum InputLine {
    Frame {
        #[serde(default)]
        hands: Vec<HandObservation>,
    },
    Buy {
        price: String,
    },
    Sell {
        price: String,
    },
    Zoom {
        direction: ZoomDirection,
    },
    Pan {
        offset: i64,
    },
    PanBy {
        delta: i64,
    },
    Hover {
        x: f64,
        #[serde(default)]
        plot_left: f64,
        #[serde(default = "default_plot_width")]
        plot_width: f64,
    },
    HoverClear,
    Fetch,
}

impl InputLine {
    fn into_event(self, at: Instant) -> AppEvent {
        match self {
            Self::Frame { hands } => AppEvent::Frame { hands, at },
            Self::Buy { price } => AppEvent::Ui(UiEvent::Buy { price }),
            Self::Sell { price } => AppEvent::Ui(UiEvent::Sell { price }),
            Self::Zoom { direction } => AppEvent::Ui(UiEvent::Zoom { direction }),
            Self::Pan { offset } => AppEvent::Ui(UiEvent::Pan { offset }),
            Self::PanBy { delta } => AppEvent::Ui(UiEvent::PanBy { delta }),
            Self::Hover { x, plot_left, plot_width } => AppEvent::Ui(UiEvent::Hover {
                x,
                plot_left,
                plot_width,
            }),
            Self::HoverClear => AppEvent::Ui(UiEvent::HoverCleared),
            Self::Fetch => AppEvent::Ui(UiEvent::ReloadData),
        }
    }
}

/// Parse one line. Blank lines give `None`; bad lines are logged and skipped.
pub fn parse_line(line: &str, at: Instant) -> Option<AppEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<InputLine>(line) {
        Ok(parsed) => Some(parsed.into_event(at)),
        Err(err) => {
            let head: String = line.chars().take(80).collect();
            warn!(target: "input", "skipping bad line: {err}; line={head}");
            None
        }
    }
}

/// Decode one raw line; invalid UTF-8 is logged and skipped like bad JSON.
fn parse_raw(raw: &[u8], at: Instant) -> Option<AppEvent> {
    match std::str::from_utf8(raw) {
        Ok(line) => parse_line(line, at),
        Err(err) => {
            warn!(target: "input", "skipping non-utf8 line ({} bytes): {err}", raw.len());
            None
        }
    }
}

/// Follow `path` like `tail -F`: read appended lines, restart from the top
/// when the file shrinks.
pub fn start_file_bridge(path: PathBuf, tx: Sender<AppEvent>) {
    thread::spawn(move || {
        debug!(target: "input", "tailing {}", path.display());
        let mut offset: u64 = 0;
        let mut warned_missing = false;

        loop {
            match OpenOptions::new().read(true).open(&path) {
                Ok(file) => {
                    warned_missing = false;
                    let mut reader = BufReader::new(file);
                    if let Ok(len) = reader.get_ref().metadata().map(|m| m.len()) {
                        if len < offset {
                            debug!(target: "input", "file shrunk; resetting offset to 0");
                            offset = 0;
                        }
                    }
                    if reader.seek(SeekFrom::Start(offset)).is_ok() {
                        let mut line = Vec::new();
                        while let Ok(bytes) = reader.read_until(b'\n', &mut line) {
                            if bytes == 0 || line.last() != Some(&b'\n') {
                                // partial line: leave it for the next pass
                                break;
                            }
                            offset += bytes as u64;
                            if let Some(ev) = parse_raw(&line, Instant::now()) {
                                if tx.send(ev).is_err() {
                                    return;
                                }
                            }
                            line.clear();
                        }
                    }
                }
                Err(err) => {
                    if !warned_missing {
                        warn!(target: "input", "unable to open {}: {err}", path.display());
                        warned_missing = true;
                    }
                }
            }
            thread::sleep(IDLE_SLEEP);
        }
    });
}

/// Read commands from stdin until EOF.
pub fn start_stdin_bridge(tx: Sender<AppEvent>) {
    thread::spawn(move || {
        let mut reader = io::stdin().lock();
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if let Some(ev) = parse_raw(&line, Instant::now()) {
                        if tx.send(ev).is_err() {
                            break;
                        }
                    }
                }
                Err(err) => {
                    warn!(target: "input", "stdin read failed: {err}");
                    break;
                }
            }
        }
        debug!(target: "input", "stdin closed");
    });
}
