//! The game state machine.
//!
//! `Session` owns every piece of mutable session state — phase, deck,
//! selection, dwell timers, chosen and poured colors, the final reading —
//! and is mutated from exactly one place: [`Session::tick`], called once per
//! frame by the control loop. The tick reads a snapshot of the latest input
//! and returns the side effects (background work to start); it never blocks
//! and never performs I/O itself, which keeps the whole machine testable
//! with synthetic clocks.
//!
//! Async results come back through [`Session::apply_task`], guarded by the
//! session generation: work issued before a reset is dropped on arrival.

use card_palette::{Color, DEFAULT_PALETTE};
use color_oracle::Reading;
use rand::rngs::StdRng;

use crate::choreography::{hit_test, HitTarget, Viewport};
use crate::deck::{generate_deck, Card};
use crate::gesture::Gesture;
use crate::tasks::TaskEvent;

// ════════════════════════════════════════════════════════════════════════════
// Phases and input
// ════════════════════════════════════════════════════════════════════════════

/// The game phase — the single source of truth for which interactions and
/// layout rules are active. Exactly one is active per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GamePhase {
    Intro,
    Stacked,
    Shuffling,
    Selecting,
    Revealing,
    ColorSelection,
    FillingGlass,
    Brewing,
    Result,
}

impl GamePhase {
    /// Instruction line shown in the status banner.
    pub fn instruction(self) -> &'static str {
        match self {
            GamePhase::Intro => "click or press enter to begin",
            GamePhase::Stacked => "open your hand (or click) to start the shuffle",
            GamePhase::Shuffling => "point at the deck (or click) to settle the fan",
            GamePhase::Selecting => "hold your cursor over a card to draw it",
            GamePhase::Revealing => "shake or open your hand (or click) to reveal",
            GamePhase::ColorSelection => "pinch (or click) a swatch to choose its color",
            GamePhase::FillingGlass => "hold over a color bubble to pour it",
            GamePhase::Brewing => "brewing your reading…",
            GamePhase::Result => "click to begin anew",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlMode {
    Hand,
    Mouse,
}

/// The latest fused input, sampled once per tick.
#[derive(Clone, Copy, Debug)]
pub struct InputSnapshot {
    pub cursor: (f32, f32),
    pub gesture: Gesture,
    /// Edge-triggered: true only on the tick a click (or start key) landed.
    pub clicked: bool,
    pub mode: ControlMode,
}

/// Background work requested by a tick, executed by the control loop.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Extract palettes for these card ids, concurrently.
    StartExtraction(Vec<usize>),
    /// Ask the oracle for a reading of the poured blend.
    StartBrewing([Color; 3]),
}

// ════════════════════════════════════════════════════════════════════════════
// SessionConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    pub deck_size: usize,
    pub selection_limit: usize,
    /// Hover dwell before a card commits (hand mode).
    pub hover_threshold_ms: u64,
    /// Pour dwell before a color commits (both modes).
    pub pour_duration_ms: u64,
    /// Pause after a milestone before auto-advancing.
    pub settle_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            deck_size: crate::deck::DECK_SIZE,
            selection_limit: 3,
            hover_threshold_ms: 1800,
            pour_duration_ms: 1500,
            settle_ms: 1500,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Session
// ════════════════════════════════════════════════════════════════════════════

pub struct Session {
    pub phase: GamePhase,
    pub cards: Vec<Card>,
    /// Drawn card ids in draw order — slot 0/1/2 = Past/Present/Future.
    pub selected: Vec<usize>,
    pub revealed: bool,
    pub hovered: Option<usize>,
    hover_started: Option<u64>,
    pub hover_progress: f32,
    /// Chosen color per selection slot.
    pub chosen: [Option<Color>; 3],
    /// (slot, color) in pour order.
    pub poured: Vec<(usize, Color)>,
    pub pouring: Option<usize>,
    pour_started: Option<u64>,
    pub pour_progress: f32,
    settle_deadline: Option<u64>,
    extraction_pending: usize,
    pub reading: Option<Reading>,
    /// Session epoch; async results from older generations are dropped.
    pub generation: u64,
    pub viewport: Viewport,
    config: SessionConfig,
    rng: StdRng,
}

impl Session {
    pub fn new(config: SessionConfig, viewport: Viewport, mut rng: StdRng) -> Self {
        let cards = generate_deck(config.deck_size, &mut rng, viewport);
        Session {
            phase: GamePhase::Intro,
            cards,
            selected: Vec::new(),
            revealed: false,
            hovered: None,
            hover_started: None,
            hover_progress: 0.0,
            chosen: [None; 3],
            poured: Vec::new(),
            pouring: None,
            pour_started: None,
            pour_progress: 0.0,
            settle_deadline: None,
            extraction_pending: 0,
            reading: None,
            generation: 0,
            viewport,
            config,
            rng,
        }
    }

    /// Clear every mutable field, bump the generation, and regenerate the
    /// deck. Valid from any phase.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.cards = generate_deck(self.config.deck_size, &mut self.rng, self.viewport);
        self.phase = GamePhase::Intro;
        self.selected.clear();
        self.revealed = false;
        self.hovered = None;
        self.hover_started = None;
        self.hover_progress = 0.0;
        self.chosen = [None; 3];
        self.poured.clear();
        self.pouring = None;
        self.pour_started = None;
        self.pour_progress = 0.0;
        self.settle_deadline = None;
        self.extraction_pending = 0;
        self.reading = None;
    }

    // ── per-frame tick ───────────────────────────────────────────────────

    /// Advance the machine one frame. The only mutation entry point.
    pub fn tick(&mut self, now_ms: u64, input: &InputSnapshot) -> Vec<Effect> {
        let mut effects = Vec::new();
        let hand = input.mode == ControlMode::Hand;

        match self.phase {
            GamePhase::Intro => {
                if input.clicked {
                    self.enter(GamePhase::Stacked);
                }
            }
            GamePhase::Stacked => {
                if (hand && input.gesture == Gesture::Open) || input.clicked {
                    self.enter(GamePhase::Shuffling);
                }
            }
            GamePhase::Shuffling => {
                if (hand && input.gesture == Gesture::Point) || input.clicked {
                    self.enter(GamePhase::Selecting);
                }
            }
            GamePhase::Selecting => self.tick_selecting(now_ms, input),
            GamePhase::Revealing => {
                if !self.revealed
                    && ((hand
                        && matches!(input.gesture, Gesture::Shake | Gesture::Open))
                        || input.clicked)
                {
                    self.revealed = true;
                    self.extraction_pending = self.selected.len();
                    effects.push(Effect::StartExtraction(self.selected.clone()));
                }
                if self.revealed && self.extraction_pending == 0 {
                    if self.settle(now_ms) {
                        self.enter(GamePhase::ColorSelection);
                    }
                }
            }
            GamePhase::ColorSelection => self.tick_color_selection(now_ms, input),
            GamePhase::FillingGlass => {
                self.tick_filling(now_ms, input, &mut effects);
            }
            GamePhase::Brewing => {
                // Waiting on the oracle; the reading arrives via apply_task.
            }
            GamePhase::Result => {
                if input.clicked {
                    self.reset();
                }
            }
        }

        effects
    }

    fn tick_selecting(&mut self, now_ms: u64, input: &InputSnapshot) {
        if self.selected.len() >= self.config.selection_limit {
            if self.hovered.is_none() {
                self.enter(GamePhase::Revealing);
            } else {
                self.clear_hover();
            }
            return;
        }

        let target = match hit_test(self, input.cursor, now_ms) {
            Some(HitTarget::Card(id)) => Some(id),
            _ => None,
        };

        match target {
            Some(id) => {
                if self.hovered != Some(id) {
                    self.hovered = Some(id);
                    self.hover_started = Some(now_ms);
                    self.hover_progress = 0.0;
                }
                let committed = match input.mode {
                    ControlMode::Hand => {
                        let elapsed = now_ms - self.hover_started.unwrap_or(now_ms);
                        self.hover_progress =
                            (elapsed as f32 / self.config.hover_threshold_ms as f32).min(1.0);
                        elapsed >= self.config.hover_threshold_ms
                    }
                    // Mouse mode skips the dwell: a click while hovering commits.
                    ControlMode::Mouse => input.clicked,
                };
                if committed && !self.selected.contains(&id) {
                    self.selected.push(id);
                    self.clear_hover();
                }
            }
            None => self.clear_hover(),
        }
    }

    fn tick_color_selection(&mut self, now_ms: u64, input: &InputSnapshot) {
        if let Some(HitTarget::Swatch { slot, color }) = hit_test(self, input.cursor, now_ms) {
            let commit = match input.mode {
                ControlMode::Hand => input.gesture == Gesture::Pinch,
                ControlMode::Mouse => input.clicked,
            };
            if commit {
                self.chosen[slot] = Some(color);
            }
        }

        let all_chosen = self
            .chosen
            .iter()
            .take(self.config.selection_limit)
            .all(|c| c.is_some());
        if all_chosen {
            if self.settle(now_ms) {
                self.enter(GamePhase::FillingGlass);
            }
        } else {
            self.settle_deadline = None;
        }
    }

    fn tick_filling(&mut self, now_ms: u64, input: &InputSnapshot, effects: &mut Vec<Effect>) {
        let target = match hit_test(self, input.cursor, now_ms) {
            Some(HitTarget::PourSource { slot }) if !self.is_poured(slot) => Some(slot),
            _ => None,
        };

        let Some(slot) = target else {
            self.cancel_pour();
            return;
        };

        if self.pouring != Some(slot) {
            // New target: the dwell restarts from zero — no partial credit.
            self.pouring = Some(slot);
            self.pour_started = Some(now_ms);
            self.pour_progress = 0.0;
            return;
        }

        let elapsed = now_ms - self.pour_started.unwrap_or(now_ms);
        self.pour_progress = (elapsed as f32 / self.config.pour_duration_ms as f32).min(1.0);
        if elapsed >= self.config.pour_duration_ms {
            if let Some(color) = self.chosen[slot] {
                self.poured.push((slot, color));
            }
            self.cancel_pour();
            if self.poured.len() == self.config.selection_limit {
                self.enter(GamePhase::Brewing);
                effects.push(Effect::StartBrewing(self.poured_colors()));
            }
        }
    }

    // ── async results ────────────────────────────────────────────────────

    /// Feed back a background-task result. Results tagged with a stale
    /// generation are dropped silently.
    pub fn apply_task(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::Palette { generation, card_id, palette } => {
                if generation != self.generation {
                    log::debug!("dropping stale palette for card {}", card_id);
                    return;
                }
                if let Some(card) = self.cards.get_mut(card_id) {
                    card.palette = Some(palette);
                }
                self.extraction_pending = self.extraction_pending.saturating_sub(1);
            }
            TaskEvent::Reading { generation, reading } => {
                if generation != self.generation || self.phase != GamePhase::Brewing {
                    log::debug!("dropping stale reading");
                    return;
                }
                self.reading = Some(reading);
                self.enter(GamePhase::Result);
            }
        }
    }

    // ── accessors ────────────────────────────────────────────────────────

    /// The poured colors in pour order, padded with the default palette if
    /// called before the glass is full (render-time convenience).
    pub fn poured_colors(&self) -> [Color; 3] {
        let mut colors = DEFAULT_PALETTE;
        for (i, &(_, c)) in self.poured.iter().take(3).enumerate() {
            colors[i] = c;
        }
        colors
    }

    pub fn is_poured(&self, slot: usize) -> bool {
        self.poured.iter().any(|&(s, _)| s == slot)
    }

    pub fn selection_order(&self, card_id: usize) -> Option<usize> {
        self.selected.iter().position(|&id| id == card_id)
    }

    pub fn selection_limit(&self) -> usize {
        self.config.selection_limit
    }

    // ── internals ────────────────────────────────────────────────────────

    fn enter(&mut self, phase: GamePhase) {
        log::info!("phase {:?} → {:?}", self.phase, phase);
        self.phase = phase;
        self.settle_deadline = None;
        self.clear_hover();
        self.cancel_pour();
    }

    /// Arm the settle timer on first call; true once it has elapsed.
    fn settle(&mut self, now_ms: u64) -> bool {
        match self.settle_deadline {
            None => {
                self.settle_deadline = Some(now_ms + self.config.settle_ms);
                false
            }
            Some(deadline) => now_ms >= deadline,
        }
    }

    fn clear_hover(&mut self) {
        self.hovered = None;
        self.hover_started = None;
        self.hover_progress = 0.0;
    }

    fn cancel_pour(&mut self) {
        self.pouring = None;
        self.pour_started = None;
        self.pour_progress = 0.0;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choreography::{card_pose, pour_center, swatch_center};
    use rand::SeedableRng;

    const VP: Viewport = Viewport { w: 1280.0, h: 800.0 };

    /// Small deck so fan cards don't overlap and tests can aim precisely.
    fn config() -> SessionConfig {
        SessionConfig {
            deck_size: 8,
            ..SessionConfig::default()
        }
    }

    fn session() -> Session {
        Session::new(config(), VP, StdRng::seed_from_u64(42))
    }

    fn mouse(cursor: (f32, f32), clicked: bool) -> InputSnapshot {
        InputSnapshot {
            cursor,
            gesture: Gesture::None,
            clicked,
            mode: ControlMode::Mouse,
        }
    }

    fn hand(cursor: (f32, f32), gesture: Gesture) -> InputSnapshot {
        InputSnapshot {
            cursor,
            gesture,
            clicked: false,
            mode: ControlMode::Hand,
        }
    }

    /// Screen center of a fan card (unselected, unhovered).
    fn fan_center(s: &Session, card_id: usize, now: u64) -> (f32, f32) {
        let pose = card_pose(
            &s.cards[card_id],
            GamePhase::Selecting,
            None,
            false,
            s.cards.len(),
            now,
            VP,
        );
        (pose.x, pose.y)
    }

    /// Drive a fresh session to Selecting via pointer clicks.
    fn to_selecting(s: &mut Session, now: &mut u64) {
        s.tick(*now, &mouse((0.0, 0.0), true)); // intro → stacked
        *now += 16;
        s.tick(*now, &mouse((0.0, 0.0), true)); // stacked → shuffling
        *now += 16;
        s.tick(*now, &mouse((0.0, 0.0), true)); // shuffling → selecting
        *now += 16;
        assert_eq!(s.phase, GamePhase::Selecting);
    }

    /// Click-select cards 0, 2, 4 and advance to Revealing.
    fn to_revealing(s: &mut Session, now: &mut u64) {
        to_selecting(s, now);
        for id in [0usize, 2, 4] {
            let at = fan_center(s, id, *now);
            s.tick(*now, &mouse(at, false)); // establish hover
            *now += 16;
            s.tick(*now, &mouse(at, true)); // click commits
            *now += 16;
        }
        // Cursor off everything → auto-advance once nothing is hovered.
        s.tick(*now, &mouse((0.0, 799.0), false));
        *now += 16;
        assert_eq!(s.phase, GamePhase::Revealing);
        assert_eq!(s.selected, vec![0, 2, 4]);
    }

    /// Reveal, deliver palettes, wait out the settle delay.
    fn to_color_selection(s: &mut Session, now: &mut u64) {
        to_revealing(s, now);
        let effects = s.tick(*now, &mouse((0.0, 0.0), true));
        assert_eq!(effects, vec![Effect::StartExtraction(vec![0, 2, 4])]);
        *now += 16;
        for &id in &[0usize, 2, 4] {
            let palette = card_palette::extract_palette(
                &s.cards[id].art,
                crate::deck::ART_W,
                crate::deck::ART_H,
            );
            s.apply_task(TaskEvent::Palette {
                generation: s.generation,
                card_id: id,
                palette,
            });
        }
        s.tick(*now, &mouse((0.0, 0.0), false)); // arms settle
        *now += 1501;
        s.tick(*now, &mouse((0.0, 0.0), false));
        assert_eq!(s.phase, GamePhase::ColorSelection);
    }

    /// Choose each card's first swatch color, settle into FillingGlass.
    fn to_filling(s: &mut Session, now: &mut u64) {
        to_color_selection(s, now);
        for slot in 0..3 {
            let card_id = s.selected[slot];
            let pose = card_pose(
                &s.cards[card_id],
                GamePhase::ColorSelection,
                Some(slot),
                false,
                s.cards.len(),
                *now,
                VP,
            );
            let at = swatch_center(&pose, 0);
            s.tick(*now, &mouse(at, true));
            *now += 16;
        }
        s.tick(*now, &mouse((0.0, 0.0), false)); // arms settle
        *now += 1501;
        s.tick(*now, &mouse((0.0, 0.0), false));
        assert_eq!(s.phase, GamePhase::FillingGlass);
    }

    fn pour_target(s: &Session, slot: usize, now: u64) -> (f32, f32) {
        let pose = card_pose(
            &s.cards[s.selected[slot]],
            GamePhase::FillingGlass,
            Some(slot),
            false,
            s.cards.len(),
            now,
            VP,
        );
        pour_center(&pose)
    }

    // ── basic transitions ────────────────────────────────────────────────

    #[test]
    fn starts_in_intro() {
        let s = session();
        assert_eq!(s.phase, GamePhase::Intro);
        assert_eq!(s.cards.len(), 8);
    }

    #[test]
    fn hand_gestures_drive_early_phases() {
        let mut s = session();
        s.tick(0, &mouse((0.0, 0.0), true));
        assert_eq!(s.phase, GamePhase::Stacked);
        s.tick(16, &hand((0.0, 0.0), Gesture::Open));
        assert_eq!(s.phase, GamePhase::Shuffling);
        s.tick(32, &hand((0.0, 0.0), Gesture::Point));
        assert_eq!(s.phase, GamePhase::Selecting);
    }

    #[test]
    fn fist_does_not_advance_stacked() {
        let mut s = session();
        s.tick(0, &mouse((0.0, 0.0), true));
        s.tick(16, &hand((0.0, 0.0), Gesture::Fist));
        assert_eq!(s.phase, GamePhase::Stacked);
    }

    // ── selection ────────────────────────────────────────────────────────

    #[test]
    fn hover_dwell_commits_exactly_once() {
        let mut s = session();
        let mut now = 0u64;
        to_selecting(&mut s, &mut now);
        let at = fan_center(&s, 3, now);
        for _ in 0..130 {
            s.tick(now, &hand(at, Gesture::Point));
            now += 16; // 130 ticks ≈ 2.1 s > 1.8 s threshold
        }
        assert_eq!(s.selected, vec![3]);
        assert_eq!(s.hovered, None);
    }

    #[test]
    fn hover_interruption_restarts_dwell() {
        let mut s = session();
        let mut now = 0u64;
        to_selecting(&mut s, &mut now);
        let a = fan_center(&s, 3, now);
        let b = fan_center(&s, 5, now);
        // 1 s on card 3, then move to card 5 for 1 s — neither commits.
        for _ in 0..62 {
            s.tick(now, &hand(a, Gesture::Point));
            now += 16;
        }
        for _ in 0..62 {
            s.tick(now, &hand(b, Gesture::Point));
            now += 16;
        }
        assert!(s.selected.is_empty());
        assert_eq!(s.hovered, Some(5));
        assert!(s.hover_progress < 1.0);
    }

    #[test]
    fn selection_never_duplicates_or_overflows() {
        let mut s = session();
        let mut now = 0u64;
        to_selecting(&mut s, &mut now);
        for _ in 0..4 {
            for id in [0usize, 2, 4, 0, 2] {
                let at = fan_center(&s, id, now);
                s.tick(now, &mouse(at, false));
                now += 16;
                s.tick(now, &mouse(at, true));
                now += 16;
            }
        }
        assert_eq!(s.selected, vec![0, 2, 4]);
        assert!(s.selected.len() <= 3);
    }

    #[test]
    fn mouse_click_commits_without_dwell() {
        let mut s = session();
        let mut now = 0u64;
        to_selecting(&mut s, &mut now);
        let at = fan_center(&s, 1, now);
        s.tick(now, &mouse(at, true));
        assert_eq!(s.selected, vec![1]);
    }

    // ── scenario A: through reveal to color selection ────────────────────

    #[test]
    fn scenario_reveal_populates_palettes() {
        let mut s = session();
        let mut now = 0u64;
        to_color_selection(&mut s, &mut now);
        for &id in &[0usize, 2, 4] {
            let palette = s.cards[id].palette.expect("palette populated");
            assert_eq!(palette.len(), 3);
        }
    }

    #[test]
    fn reveal_fires_extraction_only_once() {
        let mut s = session();
        let mut now = 0u64;
        to_revealing(&mut s, &mut now);
        let first = s.tick(now, &mouse((0.0, 0.0), true));
        now += 16;
        let second = s.tick(now, &mouse((0.0, 0.0), true));
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn failed_extraction_still_advances_with_default_palette() {
        let mut s = session();
        let mut now = 0u64;
        to_revealing(&mut s, &mut now);
        s.tick(now, &mouse((0.0, 0.0), true));
        now += 16;
        // The extraction worker reports the default palette on failure.
        for &id in &[0usize, 2, 4] {
            s.apply_task(TaskEvent::Palette {
                generation: s.generation,
                card_id: id,
                palette: DEFAULT_PALETTE,
            });
        }
        s.tick(now, &mouse((0.0, 0.0), false));
        now += 1501;
        s.tick(now, &mouse((0.0, 0.0), false));
        assert_eq!(s.phase, GamePhase::ColorSelection);
    }

    // ── scenario B: swatch isolation ─────────────────────────────────────

    #[test]
    fn scenario_swatch_writes_only_its_slot() {
        let mut s = session();
        let mut now = 0u64;
        to_color_selection(&mut s, &mut now);

        let card0 = s.selected[0];
        let pose0 = card_pose(
            &s.cards[card0],
            GamePhase::ColorSelection,
            Some(0),
            false,
            s.cards.len(),
            now,
            VP,
        );
        let at = swatch_center(&pose0, 1);
        s.tick(now, &mouse(at, true));

        let palette0 = s.cards[card0].palette.unwrap();
        assert_eq!(s.chosen[0], Some(palette0[1]));
        assert_eq!(s.chosen[1], None);
        assert_eq!(s.chosen[2], None);
    }

    #[test]
    fn pinch_commits_swatch_in_hand_mode() {
        let mut s = session();
        let mut now = 0u64;
        to_color_selection(&mut s, &mut now);
        let card0 = s.selected[0];
        let pose = card_pose(
            &s.cards[card0],
            GamePhase::ColorSelection,
            Some(0),
            false,
            s.cards.len(),
            now,
            VP,
        );
        let at = swatch_center(&pose, 2);
        s.tick(now, &hand(at, Gesture::Point));
        assert_eq!(s.chosen[0], None);
        s.tick(now + 16, &hand(at, Gesture::Pinch));
        assert_eq!(s.chosen[0], Some(s.cards[card0].palette.unwrap()[2]));
    }

    // ── scenario C: pour dwell ───────────────────────────────────────────

    #[test]
    fn scenario_pour_dwell_commits_slot() {
        let mut s = session();
        let mut now = 0u64;
        to_filling(&mut s, &mut now);
        let at = pour_target(&s, 1, now);
        for _ in 0..100 {
            s.tick(now, &mouse(at, false));
            now += 16;
        }
        assert!(s.is_poured(1));
        assert_eq!(s.poured.len(), 1);
        assert_eq!(s.poured[0].1, s.chosen[1].unwrap());
    }

    #[test]
    fn scenario_pour_moves_off_before_threshold_commits_nothing() {
        let mut s = session();
        let mut now = 0u64;
        to_filling(&mut s, &mut now);
        let at = pour_target(&s, 1, now);
        for _ in 0..40 {
            s.tick(now, &mouse(at, false)); // 40 × 16 ms ≈ 0.64 s < 1.5 s
            now += 16;
        }
        s.tick(now, &mouse((0.0, 0.0), false));
        assert!(s.poured.is_empty());
        assert_eq!(s.pouring, None);
        assert_eq!(s.pour_progress, 0.0);
    }

    #[test]
    fn switching_pour_targets_resets_dwell() {
        let mut s = session();
        let mut now = 0u64;
        to_filling(&mut s, &mut now);
        let a = pour_target(&s, 0, now);
        let b = pour_target(&s, 2, now);
        for _ in 0..60 {
            s.tick(now, &mouse(a, false));
            now += 16;
        }
        s.tick(now, &mouse(b, false));
        assert_eq!(s.pouring, Some(2));
        assert_eq!(s.pour_progress, 0.0);
        assert!(s.poured.is_empty());
    }

    #[test]
    fn poured_slot_cannot_pour_twice() {
        let mut s = session();
        let mut now = 0u64;
        to_filling(&mut s, &mut now);
        let at = pour_target(&s, 0, now);
        for _ in 0..200 {
            s.tick(now, &mouse(at, false));
            now += 16;
        }
        assert_eq!(s.poured.len(), 1);
    }

    // ── scenario D: brewing always reaches a result ──────────────────────

    fn pour_all(s: &mut Session, now: &mut u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        for slot in 0..3 {
            let at = pour_target(s, slot, *now);
            for _ in 0..100 {
                effects.extend(s.tick(*now, &mouse(at, false)));
                *now += 16;
                if s.phase == GamePhase::Brewing {
                    break;
                }
            }
        }
        effects
    }

    #[test]
    fn scenario_third_pour_starts_brewing() {
        let mut s = session();
        let mut now = 0u64;
        to_filling(&mut s, &mut now);
        let effects = pour_all(&mut s, &mut now);
        assert_eq!(s.phase, GamePhase::Brewing);
        let colors: Vec<Color> = s.poured.iter().map(|&(_, c)| c).collect();
        assert_eq!(effects, vec![Effect::StartBrewing([colors[0], colors[1], colors[2]])]);
    }

    #[test]
    fn scenario_reading_reaches_result_even_on_fallback() {
        let mut s = session();
        let mut now = 0u64;
        to_filling(&mut s, &mut now);
        pour_all(&mut s, &mut now);
        let reading = color_oracle::fallback_reading(s.poured_colors());
        s.apply_task(TaskEvent::Reading {
            generation: s.generation,
            reading: reading.clone(),
        });
        assert_eq!(s.phase, GamePhase::Result);
        let got = s.reading.as_ref().unwrap();
        assert!(!got.name.is_empty());
        assert!(!got.description.is_empty());
        assert_eq!(got.colors, s.poured_colors());
    }

    // ── generation guard ─────────────────────────────────────────────────

    #[test]
    fn stale_palette_is_dropped_after_reset() {
        let mut s = session();
        let mut now = 0u64;
        to_revealing(&mut s, &mut now);
        s.tick(now, &mouse((0.0, 0.0), true));
        let old_generation = s.generation;
        s.reset();
        s.apply_task(TaskEvent::Palette {
            generation: old_generation,
            card_id: 0,
            palette: DEFAULT_PALETTE,
        });
        assert!(s.cards[0].palette.is_none());
        assert_eq!(s.phase, GamePhase::Intro);
    }

    #[test]
    fn stale_reading_is_dropped_after_reset() {
        let mut s = session();
        let mut now = 0u64;
        to_filling(&mut s, &mut now);
        pour_all(&mut s, &mut now);
        let old_generation = s.generation;
        s.reset();
        s.apply_task(TaskEvent::Reading {
            generation: old_generation,
            reading: color_oracle::fallback_reading(DEFAULT_PALETTE),
        });
        assert_eq!(s.phase, GamePhase::Intro);
        assert!(s.reading.is_none());
    }

    // ── reset ────────────────────────────────────────────────────────────

    #[test]
    fn reset_from_any_phase_restores_initial_state() {
        let mut s = session();
        let mut now = 0u64;
        to_filling(&mut s, &mut now);
        s.reset();
        assert_eq!(s.phase, GamePhase::Intro);
        assert_eq!(s.cards.len(), 8);
        assert!(s.selected.is_empty());
        assert!(!s.revealed);
        assert_eq!(s.chosen, [None; 3]);
        assert!(s.poured.is_empty());
        assert!(s.reading.is_none());
        assert_eq!(s.hover_progress, 0.0);
        assert!(s.cards.iter().all(|c| c.palette.is_none()));
        assert_eq!(s.generation, 1);
    }

    #[test]
    fn reset_regenerates_scatter() {
        let mut s = session();
        let before: Vec<f32> = s.cards.iter().map(|c| c.scatter.x).collect();
        s.reset();
        let after: Vec<f32> = s.cards.iter().map(|c| c.scatter.x).collect();
        assert_ne!(before, after);
    }

    #[test]
    fn mode_toggle_mid_session_preserves_state() {
        let mut s = session();
        let mut now = 0u64;
        to_selecting(&mut s, &mut now);
        let at = fan_center(&s, 1, now);
        s.tick(now, &mouse(at, true));
        assert_eq!(s.selected, vec![1]);
        // Continue in hand mode: same session, selection intact.
        s.tick(now + 16, &hand((0.0, 799.0), Gesture::None));
        assert_eq!(s.phase, GamePhase::Selecting);
        assert_eq!(s.selected, vec![1]);
    }
}
