//! Gesture classification — turning per-frame hand landmarks into the
//! discrete gestures the game understands.
//!
//! The landmark *producer* (a detector subprocess) lives in
//! [`crate::tracker`]; this module is the pure fusion layer, so every
//! classification rule is unit-testable with synthetic landmarks.

use serde::Deserialize;
use std::collections::VecDeque;

// ════════════════════════════════════════════════════════════════════════════
// Gesture
// ════════════════════════════════════════════════════════════════════════════

/// A discrete hand gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    None,
    Fist,
    Open,
    Point,
    Pinch,
    Shake,
}

// ════════════════════════════════════════════════════════════════════════════
// Landmarks
// ════════════════════════════════════════════════════════════════════════════

/// Landmark indices (MediaPipe hand-landmark convention).
pub mod landmark {
    pub const WRIST: usize = 0;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;

    pub const COUNT: usize = 21;
}

/// A single landmark, normalized 0–1 per axis (y grows downward).
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

/// One detected hand in a tracker frame.
///
/// A detector that reports no per-hand `score` is trusted fully; defaulting
/// to zero would make the confidence filter drop every one of its frames.
#[derive(Clone, Debug, Deserialize)]
pub struct HandFrame {
    #[serde(default = "full_confidence")]
    pub score: f32,
    pub landmarks: Vec<Landmark>,
}

fn full_confidence() -> f32 {
    1.0
}

/// One line of tracker output.
#[derive(Clone, Debug, Deserialize)]
pub struct FramePacket {
    #[serde(default)]
    pub hands: Vec<HandFrame>,
    #[serde(default)]
    pub error: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════
// Thresholds
// ════════════════════════════════════════════════════════════════════════════

/// Index-tip ↔ thumb-tip distance below which the hand is pinching.
pub const PINCH_MAX_DIST: f32 = 0.05;

/// Rolling window for shake detection.
pub const SHAKE_WINDOW_MS: u64 = 500;

/// Minimum samples inside the window before a shake can register.
pub const SHAKE_MIN_SAMPLES: usize = 12;

/// Horizontal travel (fraction of frame width) that qualifies as a shake.
pub const SHAKE_MIN_RANGE: f32 = 0.18;

// ════════════════════════════════════════════════════════════════════════════
// Static classification
// ════════════════════════════════════════════════════════════════════════════

/// Classify a single frame without temporal context.
///
/// Pinch overrides everything; otherwise count extended fingers among index
/// and middle — a fingertip above its PIP joint counts as extended:
/// 0 extended ⇒ fist, ≥2 ⇒ open, index only ⇒ point.
pub fn classify_static(lm: &[Landmark]) -> Gesture {
    if lm.len() < landmark::COUNT {
        return Gesture::None;
    }
    let index_tip = lm[landmark::INDEX_TIP];
    let thumb_tip = lm[landmark::THUMB_TIP];
    let pinch_dist =
        ((index_tip.x - thumb_tip.x).powi(2) + (index_tip.y - thumb_tip.y).powi(2)).sqrt();
    if pinch_dist < PINCH_MAX_DIST {
        return Gesture::Pinch;
    }

    let index_extended = lm[landmark::INDEX_TIP].y < lm[landmark::INDEX_PIP].y;
    let middle_extended = lm[landmark::MIDDLE_TIP].y < lm[landmark::MIDDLE_PIP].y;
    match (index_extended, middle_extended) {
        (false, false) => Gesture::Fist,
        (true, true) => Gesture::Open,
        (true, false) => Gesture::Point,
        // Middle without index reads as an open-ish hand upstream; treat the
        // single extended finger the same as two.
        (false, true) => Gesture::Open,
    }
}

/// Is the index finger extended in this frame?
pub fn index_extended(lm: &[Landmark]) -> bool {
    lm.len() >= landmark::COUNT && lm[landmark::INDEX_TIP].y < lm[landmark::INDEX_PIP].y
}

// ════════════════════════════════════════════════════════════════════════════
// GestureFuser — static classification + shake window + edge triggering
// ════════════════════════════════════════════════════════════════════════════

/// A cursor/gesture sample produced once per tracker frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSample {
    /// Cursor position in view pixels (x mirrored, as a webcam selfie view).
    pub cursor: (f32, f32),
    pub gesture: Gesture,
    /// True when `gesture` differs from the previous frame's.
    pub changed: bool,
}

/// Stateful fusion of a landmark stream into [`GestureSample`]s.
///
/// Shake is detected over a rolling window of index-tip x positions while
/// the index stays extended; it overrides point/open for notification
/// purposes, and pinch overrides everything.
#[derive(Debug)]
pub struct GestureFuser {
    shake_window: VecDeque<(f32, u64)>,
    last: Gesture,
    view: (f32, f32),
}

impl GestureFuser {
    pub fn new(view_w: f32, view_h: f32) -> Self {
        GestureFuser {
            shake_window: VecDeque::new(),
            last: Gesture::None,
            view: (view_w, view_h),
        }
    }

    /// Fuse one hand frame at `now_ms`.
    pub fn fuse(&mut self, hand: &HandFrame, now_ms: u64) -> GestureSample {
        let lm = &hand.landmarks;
        let mut gesture = classify_static(lm);

        if index_extended(lm) {
            let tip_x = lm[landmark::INDEX_TIP].x;
            self.shake_window.push_back((tip_x, now_ms));
            while let Some(&(_, t)) = self.shake_window.front() {
                if now_ms.saturating_sub(t) >= SHAKE_WINDOW_MS {
                    self.shake_window.pop_front();
                } else {
                    break;
                }
            }
            if gesture != Gesture::Pinch && self.shake_window.len() > SHAKE_MIN_SAMPLES {
                let mut min_x = f32::MAX;
                let mut max_x = f32::MIN;
                for &(x, _) in &self.shake_window {
                    min_x = min_x.min(x);
                    max_x = max_x.max(x);
                }
                if max_x - min_x > SHAKE_MIN_RANGE {
                    gesture = Gesture::Shake;
                }
            }
        } else {
            self.shake_window.clear();
        }

        let cursor = if lm.len() >= landmark::COUNT {
            let tip = lm[landmark::INDEX_TIP];
            ((1.0 - tip.x) * self.view.0, tip.y * self.view.1)
        } else {
            (0.0, 0.0)
        };

        let changed = gesture != self.last;
        self.last = gesture;
        GestureSample { cursor, gesture, changed }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
