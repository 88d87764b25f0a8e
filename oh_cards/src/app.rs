//! Application wiring: config, the control loop, and pose easing.
//!
//! One loop iteration = poll window input, drain the tracker and task
//! channels, advance the session one tick, launch any requested background
//! work, ease the display poses toward their choreographed targets, render.
//! All session mutation happens on this thread; workers only ever talk back
//! through channels.

use std::time::Instant;

use color_oracle::OracleClient;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::choreography::{card_pose, Pose, TransitionProfile, Viewport};
use crate::gesture::Gesture;
use crate::state::{ControlMode, Effect, InputSnapshot, Session, SessionConfig};
use crate::tasks::TaskHub;
use crate::tracker::{TrackerEvent, TrackerHandle};
use crate::visualizer::{Visualizer, WIN_H, WIN_W};

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub deck_size: usize,
    pub hover_threshold_ms: u64,
    pub pour_duration_ms: u64,
    pub settle_ms: u64,
    /// Start in hand mode (requires a tracker command) or mouse mode.
    pub start_in_hand_mode: bool,
    /// Detector argv for hand mode, e.g. `["python3", "hand_detect.py"]`.
    pub tracker_command: Vec<String>,
    /// Oracle API key; `None` means every brew uses the offline fallback.
    pub api_key: Option<String>,
    /// Deck RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        AppConfig {
            deck_size: defaults.deck_size,
            hover_threshold_ms: defaults.hover_threshold_ms,
            pour_duration_ms: defaults.pour_duration_ms,
            settle_ms: defaults.settle_ms,
            start_in_hand_mode: false,
            tracker_command: vec!["python3".into(), "hand_detect.py".into()],
            api_key: None,
            seed: None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Pose easing
// ════════════════════════════════════════════════════════════════════════════

/// Per-frame lerp factor for each transition profile. Linear is the fastest
/// because shuffle float positions are already continuous in time.
fn ease_rate(profile: TransitionProfile) -> f32 {
    match profile {
        TransitionProfile::Smooth => 0.10,
        TransitionProfile::Overshoot => 0.16,
        TransitionProfile::Linear => 0.25,
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Display-only cursor smoothing. The raw cursor drives hit-testing and
/// dwell targeting; only the drawn cursor chases it, so jittery tracked
/// hands look calm without making the game lag behind the player.
struct CursorFilter {
    smoothed: (f32, f32),
}

impl CursorFilter {
    const RATE: f32 = 0.25;

    fn new(start: (f32, f32)) -> Self {
        CursorFilter { smoothed: start }
    }

    /// Advance one frame toward `raw`; returns the position to draw.
    fn advance(&mut self, raw: (f32, f32)) -> (f32, f32) {
        self.smoothed.0 = lerp(self.smoothed.0, raw.0, Self::RATE);
        self.smoothed.1 = lerp(self.smoothed.1, raw.1, Self::RATE);
        self.smoothed
    }
}

/// Move `display` toward `target`. Continuous fields ease; discrete fields
/// (z, visibility, profile) snap so hit-order and culling never lag.
fn ease_pose(display: &mut Pose, target: &Pose) {
    let t = ease_rate(target.profile);
    display.x = lerp(display.x, target.x, t);
    display.y = lerp(display.y, target.y, t);
    display.rot_deg = lerp(display.rot_deg, target.rot_deg, t);
    display.scale = lerp(display.scale, target.scale, t);
    display.opacity = lerp(display.opacity, target.opacity, t);
    display.z = target.z;
    display.profile = target.profile;
    display.visible = target.visible || display.opacity > 0.01;
}

// ════════════════════════════════════════════════════════════════════════════
// run
// ════════════════════════════════════════════════════════════════════════════

/// Hand-mode tracker state, rebuilt on every mode toggle.
struct HandInput {
    tracker: TrackerHandle,
    cursor: (f32, f32),
    gesture: Gesture,
}

pub fn run(config: AppConfig) -> Result<(), String> {
    let viewport = Viewport {
        w: WIN_W as f32,
        h: WIN_H as f32,
    };
    let session_config = SessionConfig {
        deck_size: config.deck_size,
        selection_limit: 3,
        hover_threshold_ms: config.hover_threshold_ms,
        pour_duration_ms: config.pour_duration_ms,
        settle_ms: config.settle_ms,
    };
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut session = Session::new(session_config, viewport, rng);
    let mut visualizer = Visualizer::new()?;
    let hub = TaskHub::new();
    let oracle = OracleClient::new(config.api_key.clone());

    let mut mode = ControlMode::Mouse;
    let mut hand: Option<HandInput> = None;
    if config.start_in_hand_mode {
        match start_tracker(&config.tracker_command, viewport) {
            Some(h) => {
                hand = Some(h);
                mode = ControlMode::Hand;
            }
            None => log::warn!("tracker unavailable, staying in mouse mode"),
        }
    }

    let epoch = Instant::now();
    let mut display: Vec<Pose> = Vec::new();
    let mut cursor_filter = CursorFilter::new((viewport.w * 0.5, viewport.h * 0.5));

    loop {
        let frame = visualizer.poll_input();
        if frame.quit {
            break;
        }
        if frame.reset {
            session.reset();
        }
        if frame.toggle_mode {
            match mode {
                ControlMode::Hand => {
                    hand = None; // drop kills the detector
                    mode = ControlMode::Mouse;
                    log::info!("switched to mouse mode");
                }
                ControlMode::Mouse => match start_tracker(&config.tracker_command, viewport) {
                    Some(h) => {
                        hand = Some(h);
                        mode = ControlMode::Hand;
                        log::info!("switched to hand mode");
                    }
                    None => log::warn!("tracker unavailable, staying in mouse mode"),
                },
            }
        }

        // ── Tracker events: keep only the freshest sample per frame ───────
        let mut gesture = Gesture::None;
        let mut target_cursor = frame.mouse;
        if let Some(h) = hand.as_mut() {
            for ev in h.tracker.poll() {
                match ev {
                    TrackerEvent::Ready => log::info!("hand detector ready"),
                    TrackerEvent::Sample(sample) => {
                        h.cursor = sample.cursor;
                        h.gesture = sample.gesture;
                    }
                    TrackerEvent::Failed(why) => {
                        log::warn!("hand tracking failed: {}", why);
                    }
                }
            }
            if h.tracker.has_failed() {
                hand = None;
                mode = ControlMode::Mouse;
            }
        }
        if let Some(h) = &hand {
            if h.tracker.is_ready() {
                target_cursor = h.cursor;
                gesture = h.gesture;
            }
        }

        let drawn_cursor = cursor_filter.advance(target_cursor);

        // ── Advance the session ───────────────────────────────────────────
        let now_ms = epoch.elapsed().as_millis() as u64;
        let snapshot = InputSnapshot {
            cursor: target_cursor,
            gesture,
            clicked: frame.clicked,
            mode,
        };
        for effect in session.tick(now_ms, &snapshot) {
            match effect {
                Effect::StartExtraction(card_ids) => {
                    let jobs = card_ids
                        .into_iter()
                        .map(|id| (id, session.cards[id].art.clone()))
                        .collect();
                    hub.spawn_extraction(session.generation, jobs);
                }
                Effect::StartBrewing(colors) => {
                    hub.spawn_brewing(session.generation, oracle.clone(), colors);
                }
            }
        }
        for event in hub.drain() {
            session.apply_task(event);
        }

        // ── Ease display poses toward choreographed targets ───────────────
        let deck_size = session.cards.len();
        if display.len() != deck_size {
            // Fresh deck (startup or reset): snap to targets.
            display = session
                .cards
                .iter()
                .map(|card| {
                    card_pose(
                        card,
                        session.phase,
                        session.selection_order(card.id),
                        false,
                        deck_size,
                        now_ms,
                        viewport,
                    )
                })
                .collect();
        }
        for card in &session.cards {
            let target = card_pose(
                card,
                session.phase,
                session.selection_order(card.id),
                session.hovered == Some(card.id),
                deck_size,
                now_ms,
                viewport,
            );
            ease_pose(&mut display[card.id], &target);
        }

        let tracker_status = match (&hand, mode) {
            (Some(h), _) if h.tracker.is_ready() => "tracker: live",
            (Some(_), _) => "tracker: starting",
            (None, ControlMode::Mouse) => "tracker: off",
            (None, ControlMode::Hand) => "tracker: lost",
        };
        visualizer.render(&session, &display, drawn_cursor, mode, tracker_status);

        if !visualizer.is_open() {
            break;
        }
    }

    Ok(())
}

fn start_tracker(command: &[String], viewport: Viewport) -> Option<HandInput> {
    match TrackerHandle::spawn(command, (viewport.w, viewport.h)) {
        Ok(tracker) => Some(HandInput {
            tracker,
            cursor: (viewport.w * 0.5, viewport.h * 0.5),
            gesture: Gesture::None,
        }),
        Err(why) => {
            log::warn!("could not start tracker: {}", why);
            None
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ease_converges_on_target() {
        let target = Pose {
            x: 100.0,
            y: 200.0,
            rot_deg: 10.0,
            scale: 1.5,
            opacity: 1.0,
            z: 7,
            profile: TransitionProfile::Smooth,
            visible: true,
        };
        let mut display = Pose {
            x: 0.0,
            y: 0.0,
            rot_deg: 0.0,
            scale: 1.0,
            opacity: 0.0,
            z: 0,
            profile: TransitionProfile::Smooth,
            visible: false,
        };
        for _ in 0..300 {
            ease_pose(&mut display, &target);
        }
        assert!((display.x - 100.0).abs() < 0.5);
        assert!((display.y - 200.0).abs() < 0.5);
        assert!((display.scale - 1.5).abs() < 0.01);
        assert_eq!(display.z, 7);
        assert!(display.visible);
    }

    #[test]
    fn cursor_smoothing_is_display_only() {
        // The filter lags behind a cursor jump, but the raw position it was
        // fed is what hit-testing must see, unchanged.
        let raw = (900.0, 100.0);
        let mut filter = CursorFilter::new((0.0, 0.0));
        let drawn = filter.advance(raw);
        assert!(drawn.0 < raw.0 * 0.5);
        assert_eq!(raw, (900.0, 100.0));
        // The drawn cursor converges on a held position.
        let mut drawn = drawn;
        for _ in 0..60 {
            drawn = filter.advance(raw);
        }
        assert!((drawn.0 - raw.0).abs() < 0.5);
        assert!((drawn.1 - raw.1).abs() < 0.5);
    }

    #[test]
    fn ease_rates_are_ordered() {
        assert!(ease_rate(TransitionProfile::Smooth) < ease_rate(TransitionProfile::Overshoot));
        assert!(ease_rate(TransitionProfile::Overshoot) < ease_rate(TransitionProfile::Linear));
    }

    #[test]
    fn default_config_matches_session_defaults() {
        let cfg = AppConfig::default();
        let s = SessionConfig::default();
        assert_eq!(cfg.deck_size, s.deck_size);
        assert_eq!(cfg.hover_threshold_ms, s.hover_threshold_ms);
        assert_eq!(cfg.pour_duration_ms, s.pour_duration_ms);
    }
}
