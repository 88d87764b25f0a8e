//! Layout choreography — where every card sits on every frame.
//!
//! [`card_pose`] is a pure function of (card, phase, selection order, hover,
//! time); it holds no state and is recomputed for every card on every frame.
//! Hit-testing runs on these target poses. The renderer eases toward them,
//! so for a few hundred milliseconds after a phase change a card is hit at
//! its destination rather than its drawn position; every commit sits behind
//! a dwell or settle delay longer than that, so nothing can trigger off a
//! card that is still in flight.

use card_palette::Color;

use crate::deck::Card;
use crate::state::{GamePhase, Session};

// ════════════════════════════════════════════════════════════════════════════
// Geometry constants
// ════════════════════════════════════════════════════════════════════════════

/// Card footprint at scale 1.0, in pixels.
pub const CARD_W: f32 = 110.0;
pub const CARD_H: f32 = 160.0;

/// Palette swatch bubbles above a revealed card.
pub const SWATCH_RADIUS: f32 = 22.0;
pub const SWATCH_SPACING: f32 = 52.0;
const SWATCH_LIFT: f32 = 60.0;

/// Pour-source bubble beside a railed card.
pub const POUR_RADIUS: f32 = 34.0;
const POUR_OFFSET: f32 = 62.0;

/// Selected-card rail on the left during filling/brewing/result.
const RAIL_X: f32 = 80.0;
const RAIL_TOP: f32 = 100.0;
const RAIL_STEP: f32 = 160.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub w: f32,
    pub h: f32,
}

// ════════════════════════════════════════════════════════════════════════════
// Pose
// ════════════════════════════════════════════════════════════════════════════

/// How the renderer should ease toward a newly computed pose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionProfile {
    /// Gentle ease-out, the default for most phase changes.
    Smooth,
    /// Springy overshoot, used when drawn cards sweep to the reveal arc.
    Overshoot,
    /// Direct tracking, used for the continuous shuffle float.
    Linear,
}

/// One card's target placement for one frame. `x`/`y` are the card center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub rot_deg: f32,
    pub scale: f32,
    pub opacity: f32,
    pub z: i32,
    pub profile: TransitionProfile,
    pub visible: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// card_pose
// ════════════════════════════════════════════════════════════════════════════

/// Compute a card's pose. `order` is its selection slot (0..3) if drawn,
/// `deck_size` the number of cards in the fan, `time_ms` the session clock.
pub fn card_pose(
    card: &Card,
    phase: GamePhase,
    order: Option<usize>,
    hovered: bool,
    deck_size: usize,
    time_ms: u64,
    vp: Viewport,
) -> Pose {
    use GamePhase::*;

    match phase {
        Intro => Pose {
            x: vp.w * 0.5 + card.scatter.x,
            y: vp.h * 0.5 + card.scatter.y,
            rot_deg: card.scatter.r,
            scale: 0.65,
            opacity: 0.15,
            z: card.id as i32,
            profile: TransitionProfile::Smooth,
            visible: true,
        },
        Stacked => Pose {
            x: vp.w * 0.5,
            y: vp.h * 0.6,
            rot_deg: card.rotation,
            scale: 0.85,
            opacity: 1.0,
            z: card.id as i32,
            profile: TransitionProfile::Smooth,
            visible: true,
        },
        Shuffling => {
            // Seeded float: each card orbits on its own sine track.
            let t = time_ms as f32 + card.id as f32 * 200.0;
            Pose {
                x: vp.w * 0.5 + (t / 700.0).sin() * 120.0,
                y: vp.h * 0.5 + (t / 900.0).cos() * 120.0,
                rot_deg: (t / 1100.0).sin() * 360.0,
                scale: 0.8,
                opacity: 0.85,
                z: card.id as i32,
                profile: TransitionProfile::Linear,
                visible: true,
            }
        }
        _ => match order {
            Some(slot) => selected_pose(phase, slot, vp),
            None => unselected_pose(card, phase, hovered, deck_size, vp),
        },
    }
}

fn selected_pose(phase: GamePhase, slot: usize, vp: Viewport) -> Pose {
    use GamePhase::*;
    let centered = slot as f32 - 1.0;
    match phase {
        FillingGlass | Brewing | Result => Pose {
            x: RAIL_X + CARD_W * 0.55 * 0.5,
            y: RAIL_TOP + slot as f32 * RAIL_STEP + CARD_H * 0.55 * 0.5,
            rot_deg: 0.0,
            scale: 0.55,
            opacity: 0.9,
            z: 1000 + slot as i32,
            profile: TransitionProfile::Smooth,
            visible: true,
        },
        Revealing | ColorSelection => Pose {
            x: vp.w * 0.5 + centered * 360.0,
            y: vp.h * 0.48,
            rot_deg: 0.0,
            scale: 1.6,
            opacity: 1.0,
            z: 1000 + slot as i32,
            profile: TransitionProfile::Overshoot,
            visible: true,
        },
        // Selecting: drawn cards wait on a rail at the bottom.
        _ => Pose {
            x: vp.w * 0.5 + centered * 150.0,
            y: vp.h * 0.8,
            rot_deg: 0.0,
            scale: 0.95,
            opacity: 1.0,
            z: 500 + slot as i32,
            profile: TransitionProfile::Smooth,
            visible: true,
        },
    }
}

fn unselected_pose(
    card: &Card,
    phase: GamePhase,
    hovered: bool,
    deck_size: usize,
    vp: Viewport,
) -> Pose {
    use GamePhase::*;
    match phase {
        Selecting | Revealing => {
            // Horizontal fan with a shallow parabolic dip.
            let total = vp.w * 0.92;
            let spacing = total / deck_size.max(1) as f32;
            let mid = deck_size as f32 / 2.0;
            let offset = (card.id as f32 - mid) / mid;
            let lift = if hovered { -70.0 } else { 0.0 };
            Pose {
                x: (vp.w - total) * 0.5 + (card.id as f32 + 0.5) * spacing,
                y: 260.0 + offset * offset * 70.0 + lift,
                rot_deg: (card.id as f32 - mid) * 1.8,
                scale: if hovered { 1.65 } else { 0.85 },
                opacity: 1.0,
                z: if hovered { 2000 } else { card.id as i32 },
                profile: TransitionProfile::Smooth,
                visible: true,
            }
        }
        // From the reveal onward, undrawn cards leave the stage.
        _ => Pose {
            x: vp.w * 0.5,
            y: vp.h * 0.5,
            rot_deg: 0.0,
            scale: 0.0,
            opacity: 0.0,
            z: -1,
            profile: TransitionProfile::Smooth,
            visible: false,
        },
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Hit testing
// ════════════════════════════════════════════════════════════════════════════

/// What the cursor is currently over.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HitTarget {
    /// An undrawn card in the fan.
    Card(usize),
    /// A palette swatch above the card at selection slot `slot`.
    Swatch { slot: usize, color: Color },
    /// The pour bubble beside the card at selection slot `slot`.
    PourSource { slot: usize },
}

/// Resolve the topmost interactive element under `cursor` for the current
/// phase. Returns `None` over empty stage — a no-op tick, not an error.
pub fn hit_test(session: &Session, cursor: (f32, f32), time_ms: u64) -> Option<HitTarget> {
    use GamePhase::*;
    match session.phase {
        Selecting | Revealing => hit_fan_card(session, cursor, time_ms),
        ColorSelection => hit_swatch(session, cursor, time_ms),
        FillingGlass => hit_pour_source(session, cursor, time_ms),
        _ => None,
    }
}

fn hit_fan_card(session: &Session, cursor: (f32, f32), time_ms: u64) -> Option<HitTarget> {
    let deck_size = session.cards.len();
    let mut best: Option<(i32, usize)> = None;
    for card in &session.cards {
        if session.selected.contains(&card.id) {
            continue;
        }
        let hovered = session.hovered == Some(card.id);
        let pose = card_pose(
            card,
            session.phase,
            None,
            hovered,
            deck_size,
            time_ms,
            session.viewport,
        );
        if !pose.visible || !pose_contains(&pose, cursor) {
            continue;
        }
        if best.map_or(true, |(z, _)| pose.z >= z) {
            best = Some((pose.z, card.id));
        }
    }
    best.map(|(_, id)| HitTarget::Card(id))
}

fn hit_swatch(session: &Session, cursor: (f32, f32), time_ms: u64) -> Option<HitTarget> {
    for (slot, &card_id) in session.selected.iter().enumerate() {
        let card = &session.cards[card_id];
        let Some(palette) = card.palette else { continue };
        let pose = card_pose(
            card,
            session.phase,
            Some(slot),
            false,
            session.cards.len(),
            time_ms,
            session.viewport,
        );
        for (i, &color) in palette.iter().enumerate() {
            let center = swatch_center(&pose, i);
            if dist(center, cursor) <= SWATCH_RADIUS {
                return Some(HitTarget::Swatch { slot, color });
            }
        }
    }
    None
}

fn hit_pour_source(session: &Session, cursor: (f32, f32), time_ms: u64) -> Option<HitTarget> {
    for (slot, &card_id) in session.selected.iter().enumerate() {
        if session.chosen[slot].is_none() {
            continue;
        }
        let pose = card_pose(
            &session.cards[card_id],
            session.phase,
            Some(slot),
            false,
            session.cards.len(),
            time_ms,
            session.viewport,
        );
        if dist(pour_center(&pose), cursor) <= POUR_RADIUS {
            return Some(HitTarget::PourSource { slot });
        }
    }
    None
}

/// Center of palette swatch `i` (0..3) above a card.
pub fn swatch_center(pose: &Pose, i: usize) -> (f32, f32) {
    (
        pose.x + (i as f32 - 1.0) * SWATCH_SPACING,
        pose.y - CARD_H * pose.scale * 0.5 - SWATCH_LIFT,
    )
}

/// Center of a card's pour bubble.
pub fn pour_center(pose: &Pose) -> (f32, f32) {
    (pose.x + CARD_W * pose.scale * 0.5 + POUR_OFFSET, pose.y)
}

/// Axis-aligned containment test against the card's scaled footprint.
/// Rotation is ignored for hit purposes; fan rotations are a few degrees.
fn pose_contains(pose: &Pose, p: (f32, f32)) -> bool {
    let hw = CARD_W * pose.scale * 0.5;
    let hh = CARD_H * pose.scale * 0.5;
    (p.0 - pose.x).abs() <= hw && (p.1 - pose.y).abs() <= hh
}

fn dist(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{card_art, Card, Scatter};

    fn vp() -> Viewport {
        Viewport { w: 1280.0, h: 800.0 }
    }

    fn card(id: usize) -> Card {
        Card {
            id,
            rotation: 3.0,
            scatter: Scatter { x: 40.0, y: -60.0, r: 120.0 },
            art: card_art(id),
            palette: None,
        }
    }

    #[test]
    fn pose_is_deterministic() {
        let c = card(5);
        let a = card_pose(&c, GamePhase::Shuffling, None, false, 8, 1234, vp());
        let b = card_pose(&c, GamePhase::Shuffling, None, false, 8, 1234, vp());
        assert_eq!(a, b);
    }

    #[test]
    fn shuffle_float_moves_with_time() {
        let c = card(5);
        let a = card_pose(&c, GamePhase::Shuffling, None, false, 8, 0, vp());
        let b = card_pose(&c, GamePhase::Shuffling, None, false, 8, 400, vp());
        assert_ne!((a.x, a.y), (b.x, b.y));
    }

    #[test]
    fn phases_have_distinct_layouts() {
        let c = card(2);
        let intro = card_pose(&c, GamePhase::Intro, None, false, 8, 0, vp());
        let stacked = card_pose(&c, GamePhase::Stacked, None, false, 8, 0, vp());
        let fan = card_pose(&c, GamePhase::Selecting, None, false, 8, 0, vp());
        assert_ne!((intro.x, intro.y), (stacked.x, stacked.y));
        assert_ne!((stacked.x, stacked.y), (fan.x, fan.y));
        assert!(intro.opacity < stacked.opacity);
    }

    #[test]
    fn hover_lifts_and_enlarges() {
        let c = card(3);
        let flat = card_pose(&c, GamePhase::Selecting, None, false, 8, 0, vp());
        let up = card_pose(&c, GamePhase::Selecting, None, true, 8, 0, vp());
        assert!(up.y < flat.y);
        assert!(up.scale > flat.scale);
        assert!(up.z > flat.z);
    }

    #[test]
    fn selected_cards_arc_across_center() {
        let poses: Vec<Pose> = (0..3)
            .map(|slot| selected_pose(GamePhase::ColorSelection, slot, vp()))
            .collect();
        assert!((poses[1].x - vp().w * 0.5).abs() < 1e-3);
        assert!(poses[0].x < poses[1].x && poses[1].x < poses[2].x);
        assert!((poses[0].scale - 1.6).abs() < 1e-6);
    }

    #[test]
    fn rail_stacks_vertically() {
        let a = selected_pose(GamePhase::FillingGlass, 0, vp());
        let b = selected_pose(GamePhase::FillingGlass, 1, vp());
        let c = selected_pose(GamePhase::Result, 2, vp());
        assert!((a.x - b.x).abs() < 1e-3);
        assert!(b.y > a.y && c.y > b.y);
    }

    #[test]
    fn undrawn_cards_hide_after_reveal_arc() {
        let c = card(7);
        let pose = card_pose(&c, GamePhase::ColorSelection, None, false, 8, 0, vp());
        assert!(!pose.visible);
        assert_eq!(pose.opacity, 0.0);
    }

    #[test]
    fn fan_card_contains_its_own_center() {
        let c = card(4);
        let pose = card_pose(&c, GamePhase::Selecting, None, false, 8, 0, vp());
        assert!(pose_contains(&pose, (pose.x, pose.y)));
        assert!(!pose_contains(&pose, (pose.x + CARD_W, pose.y)));
    }
}
