//! Visible window over the bar sequence: pan, zoom, pointer → bar index,
//! and y-axis autoscale.
//!
//! The controller holds only `offset` and `window_size`; every operation
//! takes the current bar count and re-clamps, so it can never index past
//! the table even when the table was just replaced by a shorter one.

use serde::{Deserialize, Serialize};

use crate::candles::Bar;
use crate::debug_hooks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomDirection {
    In,
    Out,
}

/// Which point of the window stays put while zooming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomAnchor {
    /// Trailing (newest) edge.
    End,
    Center,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub initial_window: usize,
    pub min_window: usize,
    pub zoom_ratio: f64,
    pub anchor: ZoomAnchor,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            initial_window: 60,
            min_window: 10,
            zoom_ratio: 0.1,
            anchor: ZoomAnchor::End,
        }
    }
}

/// Linear map from pointer x (device pixels) to data x.
///
/// Bar `i` of the visible window is centred on data x = `i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTransform {
    pub px_left: f64,
    pub px_width: f64,
    pub data_min: f64,
    pub data_max: f64,
}

impl AxisTransform {
    pub fn to_data(&self, px: f64) -> Option<f64> {
        if !px.is_finite() || !(self.px_width > 0.0) {
            return None;
        }
        let t = (px - self.px_left) / self.px_width;
        Some(self.data_min + t * (self.data_max - self.data_min))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    offset: usize,
    window_size: usize,
    config: ViewportConfig,
}

impl Viewport {
    /// Starts on the newest bars.
    pub fn new(config: ViewportConfig, len: usize) -> Self {
        let mut vp = Self {
            offset: 0,
            window_size: config.initial_window,
            config,
        };
        vp.clamp(len);
        vp.offset = len - vp.window_size;
        vp
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Allowed window sizes for `len` bars. With fewer than `min_window`
    /// bars the only legal window is all of them.
    fn window_bounds(&self, len: usize) -> (usize, usize) {
        let min = self.config.min_window.max(1);
        if len <= min {
            (len, len)
        } else {
            (min, len)
        }
    }

    fn clamp(&mut self, len: usize) {
        let (lo, hi) = self.window_bounds(len);
        self.window_size = self.window_size.clamp(lo, hi);
        self.offset = self.offset.min(len - self.window_size);
    }

    fn max_offset(&self, len: usize) -> usize {
        len.saturating_sub(self.window_size)
    }

    pub fn shows_latest(&self, len: usize) -> bool {
        self.offset + self.window_size >= len
    }

    /// Move the window start to `new_offset`, clamped into range.
    pub fn pan(&mut self, new_offset: i64, len: usize) {
        self.clamp(len);
        if len <= self.window_size {
            return;
        }
        let max = self.max_offset(len) as i64;
        self.offset = new_offset.clamp(0, max) as usize;
        debug_hooks::log_viewport("pan", self.offset, self.window_size, len);
    }

    pub fn pan_by(&mut self, delta: i64, len: usize) {
        let target = self.offset as i64 + delta;
        self.pan(target, len);
    }

    pub fn zoom(&mut self, direction: ZoomDirection, len: usize) {
        self.clamp(len);
        let (lo, hi) = self.window_bounds(len);
        let ws = self.window_size;
        let step = ((ws as f64 * self.config.zoom_ratio).round() as usize).max(1);
        let new_ws = match direction {
            ZoomDirection::In => ws.saturating_sub(step).max(lo),
            ZoomDirection::Out => (ws + step).min(hi),
        };

        self.offset = match self.config.anchor {
            ZoomAnchor::End => (self.offset + ws).saturating_sub(new_ws),
            ZoomAnchor::Center => (self.offset + ws / 2).saturating_sub(new_ws / 2),
        };
        self.window_size = new_ws;
        self.clamp(len);
        debug_hooks::log_viewport("zoom", self.offset, self.window_size, len);
    }

    /// Re-fit after the bar table was replaced.
    ///
    /// A window that was showing the newest bar keeps showing it. A window
    /// that was showing every bar grows with the table up to the initial size.
    pub fn sync_len(&mut self, old_len: usize, new_len: usize) {
        let followed = self.shows_latest(old_len);
        if self.window_size >= old_len && self.window_size < self.config.initial_window {
            self.window_size = self.config.initial_window.min(new_len);
        }
        self.clamp(new_len);
        if followed {
            self.offset = self.max_offset(new_len);
        }
    }

    pub fn visible<'a>(&self, bars: &'a [Bar]) -> &'a [Bar] {
        let start = self.offset.min(bars.len());
        let end = (self.offset + self.window_size).min(bars.len());
        &bars[start..end]
    }

    /// Transform for a plot area `px_width` wide starting at `px_left`.
    pub fn axis_transform(&self, px_left: f64, px_width: f64) -> AxisTransform {
        AxisTransform {
            px_left,
            px_width,
            data_min: -0.5,
            data_max: self.window_size as f64 - 0.5,
        }
    }

    /// Window-relative index of the bar under `px`. The absolute bar is
    /// `bars[offset + index]`.
    pub fn hover_index(&self, px: f64, transform: &AxisTransform) -> Option<usize> {
        let x = transform.to_data(px)?.round();
        if x < 0.0 || x >= self.window_size as f64 {
            return None;
        }
        Some(x as usize)
    }

    pub fn hovered_bar<'a>(&self, px: f64, transform: &AxisTransform, bars: &'a [Bar]) -> Option<&'a Bar> {
        let i = self.hover_index(px, transform)?;
        bars.get(self.offset + i)
    }
}

/// Display range for the given bars: `[min(low) - m, max(high) + m]` with
/// `m = max(span * 0.1, max * 0.01)`.
pub fn y_range(visible: &[Bar]) -> Option<(f64, f64)> {
    let (lo, hi) = visible
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| (lo.min(b.low), hi.max(b.high)));
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let mut margin = ((hi - lo) * 0.1).max(hi.abs() * 0.01);
    if margin <= 0.0 {
        margin = 1.0;
    }
    Some((lo - margin, hi + margin))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp(len: usize) -> Viewport {
        Viewport::new(ViewportConfig::default(), len)
    }

    fn assert_valid(v: &Viewport, len: usize) {
        assert!(v.offset() + v.window_size() <= len, "{v:?} len={len}");
        assert!(v.window_size() <= len);
        if len >= 10 {
            assert!(v.window_size() >= 10);
        }
    }

    #[test]
    fn test_new_starts_at_latest() {
        let v = vp(200);
        assert_eq!((v.offset(), v.window_size()), (140, 60));
        let small = vp(7);
        assert_eq!((small.offset(), small.window_size()), (0, 7));
        let empty = vp(0);
        assert_eq!((empty.offset(), empty.window_size()), (0, 0));
    }

    #[test]
    fn test_zoom_in_from_sixty() {
        let mut v = vp(200);
        v.zoom(ZoomDirection::In, 200);
        assert_eq!(v.window_size(), 54);
        assert_eq!(v.offset(), 146);
        assert_valid(&v, 200);
    }

    #[test]
    fn test_zoom_floors_and_caps() {
        let mut v = vp(100);
        for _ in 0..50 {
            v.zoom(ZoomDirection::In, 100);
        }
        assert_eq!(v.window_size(), 10);
        assert_eq!(v.offset(), 90);
        for _ in 0..50 {
            v.zoom(ZoomDirection::Out, 100);
        }
        assert_eq!((v.offset(), v.window_size()), (0, 100));
    }

    #[test]
    fn test_center_anchor_keeps_middle() {
        let cfg = ViewportConfig { anchor: ZoomAnchor::Center, ..Default::default() };
        let mut v = Viewport::new(cfg, 200);
        v.pan(50, 200);
        v.zoom(ZoomDirection::In, 200);
        assert_eq!(v.window_size(), 54);
        assert_eq!(v.offset(), 53);
    }

    #[test]
    fn test_pan_clamps() {
        let mut v = vp(100);
        v.pan(-5, 100);
        assert_eq!(v.offset(), 0);
        v.pan(1000, 100);
        assert_eq!(v.offset(), 40);
        v.pan_by(-15, 100);
        assert_eq!(v.offset(), 25);

        let mut all = vp(30);
        all.pan(10, 30);
        assert_eq!(all.offset(), 0);
    }

    #[test]
    fn test_hover_index_mapping() {
        let v = vp(200);
        let t = v.axis_transform(100.0, 600.0);
        // 60 bars over 600px: 10px per bar, bar 0 centred at 105px.
        assert_eq!(v.hover_index(105.0, &t), Some(0));
        assert_eq!(v.hover_index(114.0, &t), Some(1));
        assert_eq!(v.hover_index(699.0, &t), Some(59));
        assert_eq!(v.hover_index(101.0, &t), Some(0));
        assert_eq!(v.hover_index(95.0, &t), None);
        assert_eq!(v.hover_index(705.0, &t), None);
        assert_eq!(v.hover_index(f64::NAN, &t), None);
    }

    #[test]
    fn test_hovered_bar_is_offset_relative() {
        let bars: Vec<Bar> = (0..100).map(|i| Bar::flat(i, i as f64, 0.0)).collect();
        let mut v = vp(100);
        v.pan(20, 100);
        let t = v.axis_transform(0.0, 600.0);
        assert_eq!(v.hovered_bar(5.0, &t, &bars).map(|b| b.ts), Some(20));
    }

    #[test]
    fn test_sync_follows_latest() {
        let mut v = vp(100);
        v.sync_len(100, 120);
        assert_eq!(v.offset(), 60);

        v.pan(10, 120);
        v.sync_len(120, 130);
        assert_eq!(v.offset(), 10);

        v.sync_len(130, 40);
        assert_eq!((v.offset(), v.window_size()), (0, 40));
    }

    #[test]
    fn test_sync_grows_from_empty() {
        let mut v = vp(0);
        for len in 1..=80 {
            v.sync_len(len - 1, len);
            assert_valid(&v, len);
        }
        assert_eq!((v.offset(), v.window_size()), (20, 60));
    }

    #[test]
    fn test_y_range_margins() {
        let bars = vec![
            Bar { ts: 0, open: 100.0, high: 120.0, low: 90.0, close: 110.0, volume: 0.0 },
            Bar { ts: 1, open: 110.0, high: 115.0, low: 100.0, close: 105.0, volume: 0.0 },
        ];
        let (lo, hi) = y_range(&bars).unwrap();
        assert!((lo - 87.0).abs() < 1e-9);
        assert!((hi - 123.0).abs() < 1e-9);

        let flat = [Bar::flat(0, 1000.0, 0.0)];
        assert_eq!(y_range(&flat), Some((990.0, 1010.0)));
        assert_eq!(y_range(&[]), None);
    }
}
