//! Landmark geometry → gesture label.
//!
//! Pure and total: every input, including truncated or NaN-laden landmark
//! lists, maps to exactly one label.

use serde::{Deserialize, Serialize};

use crate::landmarks::{HandLandmark, HandLandmarks, Landmark};

/// Gesture recognized for one hand in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureLabel {
    Fist,
    OpenPalm,
    /// Open palm with the thumb spread away from the hand.
    FullyOpenPalm,
    PriceUp,
    PriceDown,
    None,
}

impl GestureLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fist => "fist",
            Self::OpenPalm => "open-palm",
            Self::FullyOpenPalm => "fully-open-palm",
            Self::PriceUp => "price-up",
            Self::PriceDown => "price-down",
            Self::None => "none",
        }
    }

    pub fn is_open_palm(&self) -> bool {
        matches!(self, Self::OpenPalm | Self::FullyOpenPalm)
    }
}

/// Geometry thresholds, in normalized image units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Margin a fingertip must clear past its base joint to count as folded
    /// or extended. Also the margin for the index/middle price comparison.
    pub fold_threshold: f32,
    /// Evaluate the thumb in the fist test (5 digits instead of 4).
    pub fist_includes_thumb: bool,
    pub fist_min_folded: usize,
    pub palm_min_extended: usize,
    /// Lateral thumb-tip displacement past the thumb MCP for a fully open palm.
    pub thumb_spread: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            fold_threshold: 0.05,
            fist_includes_thumb: true,
            fist_min_folded: 4,
            palm_min_extended: 4,
            thumb_spread: 0.03,
        }
    }
}

/// Classify one hand. Priority: Fist > open palm > price gesture > None.
pub fn classify(points: &[Landmark], cfg: &ClassifierConfig) -> GestureLabel {
    let Some(hand) = HandLandmarks::from_slice(points) else {
        return GestureLabel::None;
    };

    if is_fist(&hand, cfg) {
        return GestureLabel::Fist;
    }
    if is_open_palm(&hand, cfg) {
        return if thumb_spread_out(&hand, cfg) {
            GestureLabel::FullyOpenPalm
        } else {
            GestureLabel::OpenPalm
        };
    }
    price_gesture(&hand, cfg)
}

fn is_fist(hand: &HandLandmarks, cfg: &ClassifierConfig) -> bool {
    let skip = if cfg.fist_includes_thumb { 0 } else { 1 };
    let folded = HandLandmark::tip_pairs()
        .iter()
        .skip(skip)
        .filter(|(tip, base)| hand.get(*tip).y > hand.get(*base).y + cfg.fold_threshold)
        .count();
    folded >= cfg.fist_min_folded
}

fn is_open_palm(hand: &HandLandmarks, cfg: &ClassifierConfig) -> bool {
    let extended = HandLandmark::tip_pairs()
        .iter()
        .skip(1)
        .filter(|(tip, base)| hand.get(*tip).y < hand.get(*base).y - cfg.fold_threshold)
        .count();
    extended >= cfg.palm_min_extended
}

/// Orientation comes from the index knuckle's side of the wrist, not from the
/// tracker's Left/Right label, so a mirrored feed cannot flip it.
fn thumb_spread_out(hand: &HandLandmarks, cfg: &ClassifierConfig) -> bool {
    let wrist = hand.get(HandLandmark::Wrist);
    let index_mcp = hand.get(HandLandmark::IndexMcp);
    let outward = index_mcp.x - wrist.x;
    if outward == 0.0 {
        return false;
    }
    let tip = hand.get(HandLandmark::ThumbTip);
    let base = hand.get(HandLandmark::ThumbMcp);
    (tip.x - base.x) * outward.signum() > cfg.thumb_spread
}

fn price_gesture(hand: &HandLandmarks, cfg: &ClassifierConfig) -> GestureLabel {
    let index = hand.get(HandLandmark::IndexTip).y;
    let middle = hand.get(HandLandmark::MiddleTip).y;
    if index < middle - cfg.fold_threshold {
        GestureLabel::PriceUp
    } else if middle < index - cfg.fold_threshold {
        GestureLabel::PriceDown
    } else {
        GestureLabel::None
    }
}

// ── Test helpers ───────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn cfg() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    #[test]
    fn test_neutral_hand_is_none() {
        assert_eq!(classify(&neutral_hand(), &cfg()), GestureLabel::None);
    }

    #[test]
    fn test_fist_detection() {
        assert_eq!(classify(&fist(), &cfg()), GestureLabel::Fist);
    }

    #[test]
    fn test_fist_with_one_finger_loose() {
        let mut pts = fist();
        let pip = pts[HandLandmark::PinkyPip.index()];
        pts[HandLandmark::PinkyTip.index()] = Landmark::new(pip.x, pip.y - 0.1);
        assert_eq!(classify(&pts, &cfg()), GestureLabel::Fist);

        // Without the thumb only 3 of 4 fingers remain folded.
        let no_thumb = ClassifierConfig { fist_includes_thumb: false, ..cfg() };
        assert_ne!(classify(&pts, &no_thumb), GestureLabel::Fist);
    }

    #[test]
    fn test_fold_must_clear_threshold() {
        let mut pts = neutral_hand();
        for (tip, base) in HandLandmark::tip_pairs() {
            let b = pts[base.index()];
            pts[tip.index()] = Landmark::new(b.x, b.y + 0.04);
        }
        assert_eq!(classify(&pts, &cfg()), GestureLabel::None);
    }

    #[test]
    fn test_open_palm_detection() {
        assert_eq!(classify(&open_palm(), &cfg()), GestureLabel::OpenPalm);
        assert_eq!(classify(&fully_open_palm(), &cfg()), GestureLabel::FullyOpenPalm);
    }

    #[test]
    fn test_thumb_orientation_survives_mirroring() {
        let flipped = mirrored(&fully_open_palm());
        assert_eq!(classify(&flipped, &cfg()), GestureLabel::FullyOpenPalm);

        // Thumb tucked across the palm is not "fully" open on either side.
        let mut tucked = open_palm();
        let base = tucked[HandLandmark::ThumbMcp.index()];
        tucked[HandLandmark::ThumbTip.index()] = Landmark::new(base.x - 0.10, base.y);
        assert_eq!(classify(&tucked, &cfg()), GestureLabel::OpenPalm);
        assert_eq!(classify(&mirrored(&tucked), &cfg()), GestureLabel::OpenPalm);
    }

    #[test]
    fn test_price_gestures() {
        assert_eq!(classify(&index_raised(), &cfg()), GestureLabel::PriceUp);
        assert_eq!(classify(&middle_raised(), &cfg()), GestureLabel::PriceDown);
    }

    #[test]
    fn test_fist_outranks_price_gesture() {
        let mut pts = fist();
        // Index tip slightly above middle tip, still folded.
        pts[HandLandmark::IndexTip.index()].y -= 0.02;
        assert_eq!(classify(&pts, &cfg()), GestureLabel::Fist);
    }

    #[test]
    fn test_tracking_loss_is_none() {
        assert_eq!(classify(&[], &cfg()), GestureLabel::None);
        let truncated = &fist()[..12];
        assert_eq!(classify(truncated, &cfg()), GestureLabel::None);
        let mut nan = fist();
        nan[3].x = f32::INFINITY;
        assert_eq!(classify(&nan, &cfg()), GestureLabel::None);
    }
}
