//! Core of the gesture trading desk: hand-landmark classification, the
//! per-hand hold/cooldown state machine, the price engine, the chart
//! viewport and the paper ledger.
//!
//! Everything here is synchronous and owned by one scheduling loop; the only
//! cross-thread pieces are the historical fetch worker and its in-flight guard.

pub mod candles;
pub mod classifier;
pub mod config;
pub mod debug_hooks;
pub mod error;
pub mod feedback;
pub mod gesture;
pub mod landmarks;
pub mod ledger;
pub mod price;
pub mod session;
pub mod viewport;

pub use candles::{resample_yearly, Bar, BarTable, CandleAgg};
pub use classifier::{classify, GestureLabel};
pub use config::HtsConfig;
pub use error::{ConfigError, FetchError, OrderError, TradeRejection, ValidationError};
pub use gesture::{GestureMachine, GestureOutput, HandInput, Role, Side};
pub use landmarks::{HandLandmark, HandObservation, Handedness, Landmark};
pub use ledger::{Fill, Ledger, LedgerSnapshot};
pub use price::{Interval, PriceEngine, PriceState};
pub use session::{FrameOutcome, Session};
pub use viewport::{AxisTransform, Viewport, ZoomDirection};
