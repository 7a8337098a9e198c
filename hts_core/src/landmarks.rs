//! Hand landmark data as produced by the per-frame hand tracker.
//!
//! The tracker reports 21 points per hand in normalized image coordinates:
//! x grows to the right, y grows downward (larger y is lower in the frame),
//! z is relative depth and is not used by the classifier.

use serde::{Deserialize, Serialize};

// ── Landmark indices ───────────────────────────────────────

/// The 21 hand landmarks, in tracker order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

impl HandLandmark {
    pub fn index(self) -> usize {
        self as usize
    }

    /// Fingertips paired with the joint two steps toward the wrist
    /// (MCP for the thumb, PIP for the fingers). Thumb first.
    pub fn tip_pairs() -> [(HandLandmark, HandLandmark); 5] {
        [
            (Self::ThumbTip, Self::ThumbMcp),
            (Self::IndexTip, Self::IndexPip),
            (Self::MiddleTip, Self::MiddlePip),
            (Self::RingTip, Self::RingPip),
            (Self::PinkyTip, Self::PinkyPip),
        ]
    }
}

// ── Points ─────────────────────────────────────────────────

/// One normalized landmark point. Serialized as `[x, y, z]`; `[x, y]` is
/// accepted on input with `z = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "[f32; 3]")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl TryFrom<Vec<f32>> for Landmark {
    type Error = String;

    fn try_from(p: Vec<f32>) -> Result<Self, Self::Error> {
        match p.as_slice() {
            &[x, y] => Ok(Self { x, y, z: 0.0 }),
            &[x, y, z] => Ok(Self { x, y, z }),
            other => Err(format!("landmark needs 2 or 3 coordinates, got {}", other.len())),
        }
    }
}

impl From<Landmark> for [f32; 3] {
    fn from(p: Landmark) -> Self {
        [p.x, p.y, p.z]
    }
}

/// Which hand the external tracker believes this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// One detected hand in one camera frame, exactly as the tracker reported it.
/// The landmark list may be short when tracking degrades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandObservation {
    pub handedness: Handedness,
    pub landmarks: Vec<Landmark>,
}

// ── Fixed-shape skeleton ───────────────────────────────────

/// A complete, finite set of 21 landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    /// `None` when any landmark is missing or non-finite.
    pub fn from_slice(points: &[Landmark]) -> Option<Self> {
        if points.len() < LANDMARK_COUNT {
            return None;
        }
        let mut out = [Landmark::default(); LANDMARK_COUNT];
        for (slot, p) in out.iter_mut().zip(points) {
            if !p.is_finite() {
                return None;
            }
            *slot = *p;
        }
        Some(Self { points: out })
    }

    pub fn get(&self, lm: HandLandmark) -> Landmark {
        self.points[lm.index()]
    }
}
