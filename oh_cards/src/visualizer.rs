//! Software-rendered table using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ status banner — phase instruction, mode, tracker state       │
//! │                                                              │
//! │        [card fan / arc / rail, per choreography]             │
//! │                                                              │
//! │   [selected rail]                  [glass]     ◌ cursor      │
//! │                                                              │
//! │ key legend                                                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The visualizer is a pure sink: it renders whatever display poses the
//! control loop hands it and reports raw window input back. It never
//! touches session state.

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::choreography::{
    pour_center, swatch_center, Pose, CARD_H, CARD_W, POUR_RADIUS, SWATCH_RADIUS,
};
use crate::deck::{ART_H, ART_W};
use crate::state::{ControlMode, GamePhase, Session};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W: usize = 1280;
pub const WIN_H: usize = 800;

const BANNER_H: usize = 34;
const LEGEND_Y: usize = WIN_H - 16;
const BG_COLOR: u32 = 0xFF14101E; // midnight felt
const BANNER_BG: u32 = 0xFF0F0B18;
const CARD_BACK: u32 = 0xFF3A2E5C;
const CARD_BACK_EDGE: u32 = 0xFF8A7BB8;
const CURSOR_COLOR: u32 = 0xFFF0E8FF;
const DWELL_COLOR: u32 = 0xFFFFD700;
const GLASS_X: usize = WIN_W / 2 + 160;
const GLASS_Y: usize = WIN_H / 2 - 60;
const GLASS_W: usize = 120;
const GLASS_H: usize = 220;

// ════════════════════════════════════════════════════════════════════════════
// FrameInput
// ════════════════════════════════════════════════════════════════════════════

/// Raw window input collected once per frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub mouse: (f32, f32),
    /// Edge-triggered: left button (or Enter) went down this frame.
    pub clicked: bool,
    pub toggle_mode: bool,
    pub reset: bool,
    pub quit: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    buf: Vec<u32>,
    mouse_was_down: bool,
}

impl Visualizer {
    pub fn new() -> Result<Self, String> {
        let mut window = Window::new(
            "OH Cards — Soul Color Divination",
            WIN_W,
            WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            mouse_was_down: false,
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Poll window input. `quit` is set on Q or window close.
    pub fn poll_input(&mut self) -> FrameInput {
        let mut input = FrameInput::default();
        if !self.window.is_open() {
            input.quit = true;
            return input;
        }

        let one_shot = |w: &Window, k: Key| w.is_key_pressed(k, KeyRepeat::No);

        if one_shot(&self.window, Key::Q) {
            input.quit = true;
        }
        if one_shot(&self.window, Key::Tab) {
            input.toggle_mode = true;
        }
        if one_shot(&self.window, Key::R) {
            input.reset = true;
        }
        if one_shot(&self.window, Key::Enter) || one_shot(&self.window, Key::Space) {
            input.clicked = true;
        }

        if let Some(pos) = self.window.get_mouse_pos(MouseMode::Clamp) {
            input.mouse = pos;
        }
        let down = self.window.get_mouse_down(MouseButton::Left);
        if down && !self.mouse_was_down {
            input.clicked = true;
        }
        self.mouse_was_down = down;

        input
    }

    /// Render one frame. `poses` is indexed by card id and already eased by
    /// the control loop; `cursor` is the smoothed on-screen cursor.
    pub fn render(
        &mut self,
        session: &Session,
        poses: &[Pose],
        cursor: (f32, f32),
        mode: ControlMode,
        tracker_status: &str,
    ) {
        self.buf.fill(BG_COLOR);

        // ── Cards, back to front ──────────────────────────────────────────
        let mut order: Vec<usize> = (0..session.cards.len())
            .filter(|&i| poses[i].visible && poses[i].opacity > 0.01)
            .collect();
        order.sort_by_key(|&i| poses[i].z);
        for i in order {
            let face_up = session.revealed && session.selection_order(i).is_some();
            self.draw_card(&session.cards[i].art, &poses[i], face_up);
        }

        // ── Swatches ──────────────────────────────────────────────────────
        if session.phase == GamePhase::ColorSelection {
            for (slot, &card_id) in session.selected.iter().enumerate() {
                let Some(palette) = session.cards[card_id].palette else {
                    continue;
                };
                let pose = &poses[card_id];
                for (i, color) in palette.iter().enumerate() {
                    let (cx, cy) = swatch_center(pose, i);
                    let chosen = session.chosen[slot] == Some(*color);
                    self.fill_circle(cx, cy, SWATCH_RADIUS, color.to_argb());
                    if chosen {
                        self.draw_ring(cx, cy, SWATCH_RADIUS + 4.0, 1.0, DWELL_COLOR);
                    }
                }
            }
        }

        // ── Pour bubbles and glass ────────────────────────────────────────
        match session.phase {
            GamePhase::FillingGlass => {
                for (slot, &card_id) in session.selected.iter().enumerate() {
                    let Some(color) = session.chosen[slot] else { continue };
                    if session.is_poured(slot) {
                        continue;
                    }
                    let (cx, cy) = pour_center(&poses[card_id]);
                    self.fill_circle(cx, cy, POUR_RADIUS, color.to_argb());
                    if session.pouring == Some(slot) {
                        self.draw_ring(
                            cx,
                            cy,
                            POUR_RADIUS + 5.0,
                            session.pour_progress,
                            DWELL_COLOR,
                        );
                        self.draw_pour_stream((cx, cy), color.to_argb());
                    }
                }
                self.draw_glass(session);
            }
            GamePhase::Brewing => {
                self.draw_glass(session);
                self.draw_label_2x("brewing", GLASS_X - 24, GLASS_Y + GLASS_H + 18, 0xFFCCBBEE);
            }
            GamePhase::Result => {
                self.draw_glass(session);
                self.draw_result(session);
            }
            _ => {}
        }

        // ── Status banner ─────────────────────────────────────────────────
        self.fill_rect(0, 0, WIN_W, BANNER_H, BANNER_BG);
        self.draw_label_2x(session.phase.instruction(), 12, 8, 0xFFEEE6FF);
        let mode_text = match mode {
            ControlMode::Hand => "mode: hand",
            ControlMode::Mouse => "mode: mouse",
        };
        self.draw_label(mode_text, WIN_W - 260, 8, 0xFFAADDFF);
        self.draw_label(tracker_status, WIN_W - 260, 20, 0xFF888899);

        // ── Cursor with dwell ring ────────────────────────────────────────
        let dwell = match session.phase {
            GamePhase::Selecting => session.hover_progress,
            GamePhase::FillingGlass => session.pour_progress,
            _ => 0.0,
        };
        self.draw_ring(cursor.0, cursor.1, 10.0, 1.0, CURSOR_COLOR);
        if dwell > 0.0 {
            self.draw_ring(cursor.0, cursor.1, 15.0, dwell, DWELL_COLOR);
        }

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(
            "click/enter=advance  tab=hand/mouse  r=restart  q=quit",
            10,
            LEGEND_Y,
            0xFF666677,
        );

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Card ──────────────────────────────────────────────────────────────

    /// Blit a card at `pose` by inverse-rotation sampling: for each pixel of
    /// the screen bounding box, rotate back into card space and sample the
    /// art (or the back pattern when face down).
    fn draw_card(&mut self, art: &[u32], pose: &Pose, face_up: bool) {
        let w = CARD_W * pose.scale;
        let h = CARD_H * pose.scale;
        let rad = pose.rot_deg.to_radians();
        let (sin, cos) = rad.sin_cos();

        // Screen bounding box of the rotated rect.
        let reach_x = (w * cos.abs() + h * sin.abs()) * 0.5;
        let reach_y = (w * sin.abs() + h * cos.abs()) * 0.5;
        let x0 = ((pose.x - reach_x).floor().max(0.0)) as usize;
        let x1 = ((pose.x + reach_x).ceil().min(WIN_W as f32 - 1.0)) as usize;
        let y0 = ((pose.y - reach_y).floor().max(0.0)) as usize;
        let y1 = ((pose.y + reach_y).ceil().min(WIN_H as f32 - 1.0)) as usize;

        for py in y0..=y1 {
            for px in x0..=x1 {
                let dx = px as f32 - pose.x;
                let dy = py as f32 - pose.y;
                // Inverse rotation into card-local space.
                let lx = dx * cos + dy * sin;
                let ly = -dx * sin + dy * cos;
                if lx.abs() > w * 0.5 || ly.abs() > h * 0.5 {
                    continue;
                }
                let u = (lx / w + 0.5).clamp(0.0, 0.9999);
                let v = (ly / h + 0.5).clamp(0.0, 0.9999);
                let color = if face_up {
                    art[(v * ART_H as f32) as usize * ART_W + (u * ART_W as f32) as usize]
                } else {
                    back_pattern(u, v)
                };
                let idx = py * WIN_W + px;
                self.buf[idx] = blend(self.buf[idx], color, pose.opacity);
            }
        }
    }

    // ── Glass ─────────────────────────────────────────────────────────────

    /// Glass with one horizontal layer per poured color, bottom up.
    fn draw_glass(&mut self, session: &Session) {
        self.draw_border(GLASS_X, GLASS_Y, GLASS_W, GLASS_H, 0xFFBBB5CC);
        let limit = session.selection_limit();
        let layer_h = (GLASS_H - 8) / limit.max(1);
        for (i, &(_, color)) in session.poured.iter().enumerate() {
            let ly = GLASS_Y + GLASS_H - 4 - (i + 1) * layer_h;
            self.fill_rect(GLASS_X + 4, ly, GLASS_W - 8, layer_h, color.to_argb());
        }
    }

    /// Falling stream from the pour bubble toward the glass rim.
    fn draw_pour_stream(&mut self, from: (f32, f32), color: u32) {
        let to = (GLASS_X as f32 + GLASS_W as f32 * 0.5, GLASS_Y as f32);
        let steps = 60;
        for s in 0..=steps {
            let t = s as f32 / steps as f32;
            let x = from.0 + (to.0 - from.0) * t;
            // Droop: quadratic fall, faster toward the end.
            let y = from.1 + (to.1 - from.1) * t * t;
            self.set_pixel(x as usize, y as usize, color);
            self.set_pixel(x as usize + 1, y as usize, color);
        }
    }

    // ── Result panel ──────────────────────────────────────────────────────

    fn draw_result(&mut self, session: &Session) {
        let Some(reading) = &session.reading else { return };
        let px = 120usize;
        let py = WIN_H / 2 - 100;
        let pw = 480usize;

        self.fill_rect(px, py, pw, 220, 0xFF1E1730);
        self.draw_border(px, py, pw, 220, 0xFF6A5A96);

        self.draw_label_2x(&reading.name_en, px + 16, py + 14, 0xFFFFE9A8);
        self.draw_label(&reading.name, px + 16, py + 32, 0xFF998EB8);

        let slots = ["past", "present", "future"];
        for (i, color) in reading.colors.iter().enumerate() {
            let cx = px + 24 + i * 76;
            self.fill_circle(cx as f32, py as f32 + 56.0, 12.0, color.to_argb());
            self.draw_label(slots[i], cx - 10, py + 70, 0xFF8A80A0);
        }

        // Word-wrap the description into the panel.
        let max_chars = (pw - 32) / 4;
        let mut line = String::new();
        let mut ly = py + 80;
        for word in reading.description.split_whitespace() {
            if line.len() + word.len() + 1 > max_chars {
                self.draw_label(&line, px + 16, ly, 0xFFD8D0E8);
                line.clear();
                ly += 10;
                if ly > py + 204 {
                    return;
                }
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            self.draw_label(&line, px + 16, ly, 0xFFD8D0E8);
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(WIN_H) {
            for col in x..(x + w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for col in x..(x + w).min(WIN_W) {
            if y < WIN_H {
                self.buf[y * WIN_W + col] = color;
            }
            if y + h - 1 < WIN_H {
                self.buf[(y + h - 1) * WIN_W + col] = color;
            }
        }
        for row in y..(y + h).min(WIN_H) {
            if x < WIN_W {
                self.buf[row * WIN_W + x] = color;
            }
            if x + w - 1 < WIN_W {
                self.buf[row * WIN_W + x + w - 1] = color;
            }
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, r: f32, color: u32) {
        let x0 = (cx - r).floor().max(0.0) as usize;
        let x1 = (cx + r).ceil().min(WIN_W as f32 - 1.0) as usize;
        let y0 = (cy - r).floor().max(0.0) as usize;
        let y1 = (cy + r).ceil().min(WIN_H as f32 - 1.0) as usize;
        let r2 = r * r;
        for py in y0..=y1 {
            for px in x0..=x1 {
                let dx = px as f32 - cx;
                let dy = py as f32 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.buf[py * WIN_W + px] = color;
                }
            }
        }
    }

    /// Circle outline swept clockwise from 12 o'clock through `sweep` of a
    /// full turn — `sweep` 1.0 draws the whole ring, 0.4 a 40% progress arc.
    fn draw_ring(&mut self, cx: f32, cy: f32, r: f32, sweep: f32, color: u32) {
        let steps = (r * 8.0) as usize;
        let sweep = sweep.clamp(0.0, 1.0);
        for s in 0..(steps as f32 * sweep) as usize {
            let a = s as f32 / steps as f32 * std::f32::consts::TAU
                - std::f32::consts::FRAC_PI_2;
            let x = cx + a.cos() * r;
            let y = cy + a.sin() * r;
            self.set_pixel(x as usize, y as usize, color);
        }
    }

    /// Minimal bitmap font — 3×5 characters.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel(cx + col, y + row, color);
                    }
                }
            }
            cx += 4; // 3 wide + 1 gap
            if cx + 4 > WIN_W {
                break;
            }
        }
    }

    /// Double-scale label for banner and headline text.
    fn draw_label_2x(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * 2, y + row * 2, 2, 2, color);
                    }
                }
            }
            cx += 8;
            if cx + 8 > WIN_W {
                break;
            }
        }
    }
}

/// Card-back weave: diagonal lattice over the base color.
fn back_pattern(u: f32, v: f32) -> u32 {
    let edge = u < 0.04 || u > 0.96 || v < 0.03 || v > 0.97;
    if edge {
        return CARD_BACK_EDGE;
    }
    let lattice = ((u * 14.0 + v * 10.0).fract() < 0.12)
        || ((u * 14.0 - v * 10.0).rem_euclid(1.0) < 0.12);
    if lattice {
        0xFF4C3E74
    } else {
        CARD_BACK
    }
}

/// Minimal 3×5 bitmap font, one glyph per character.
fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _ => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0 - t) + cb as f32 * t) as u32;
    let ar = (a >> 16) & 0xFF;
    let br = (b >> 16) & 0xFF;
    let ag = (a >> 8) & 0xFF;
    let bg = (b >> 8) & 0xFF;
    let ab = a & 0xFF;
    let bb = b & 0xFF;
    0xFF000000 | (lerp(ar, br) << 16) | (lerp(ag, bg) << 8) | lerp(ab, bb)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 0.0), 0xFF000000);
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 1.0), 0xFFFFFFFF);
    }

    #[test]
    fn blend_midpoint_is_gray() {
        let mid = blend(0xFF000000, 0xFFFFFFFF, 0.5);
        let r = (mid >> 16) & 0xFF;
        assert!((126..=128).contains(&r));
    }

    #[test]
    fn back_pattern_has_edge_and_body() {
        assert_eq!(back_pattern(0.01, 0.5), CARD_BACK_EDGE);
        // Body is one of the two weave colors.
        let c = back_pattern(0.5, 0.5);
        assert!(c == CARD_BACK || c == 0xFF4C3E74);
    }

    #[test]
    fn glyphs_cover_instruction_text() {
        for phase in [
            GamePhase::Intro,
            GamePhase::Selecting,
            GamePhase::Brewing,
            GamePhase::Result,
        ] {
            for ch in phase.instruction().chars() {
                // Every banner character must have a real glyph (the single
                // fallback dot is reserved for unknown input).
                if ch != '…' && ch != '(' && ch != ')' && ch != '\'' {
                    let g = char_glyph(ch);
                    let blank = g == [0, 0, 0b010, 0, 0];
                    assert!(ch == ' ' || !blank, "missing glyph for {:?}", ch);
                }
            }
        }
    }
}
