//! The card deck.
//!
//! Each card carries deterministic procedural art (its "image"), a fixed
//! random rotation and scatter offset assigned at deck-generation time, and
//! a palette that stays empty until the card is drawn and revealed.

use card_palette::Color;
use rand::Rng;

use crate::choreography::Viewport;

/// Cards in a full deck.
pub const DECK_SIZE: usize = 88;

/// Pixel dimensions of a card's art buffer.
pub const ART_W: usize = 60;
pub const ART_H: usize = 84;

// ════════════════════════════════════════════════════════════════════════════
// Card
// ════════════════════════════════════════════════════════════════════════════

/// Fixed per-card offsets used by the intro scatter pile.
#[derive(Clone, Copy, Debug)]
pub struct Scatter {
    pub x: f32,
    pub y: f32,
    pub r: f32,
}

#[derive(Clone, Debug)]
pub struct Card {
    /// Stable index 0..deck_size.
    pub id: usize,
    /// Resting rotation in the stacked pile, degrees.
    pub rotation: f32,
    pub scatter: Scatter,
    /// ARGB art, `ART_W` × `ART_H`.
    pub art: Vec<u32>,
    /// Extracted soul colors; populated after reveal, `None` until then.
    pub palette: Option<[Color; 3]>,
}

/// Generate a fresh deck. Rotations and scatter come from `rng`; art is a
/// pure function of the card id so a card keeps its face across resets.
pub fn generate_deck(count: usize, rng: &mut impl Rng, vp: Viewport) -> Vec<Card> {
    (0..count)
        .map(|id| Card {
            id,
            rotation: (rng.gen::<f32>() - 0.5) * 12.0,
            scatter: Scatter {
                x: (rng.gen::<f32>() - 0.5) * vp.w * 0.8,
                y: (rng.gen::<f32>() - 0.5) * vp.h * 0.7,
                r: (rng.gen::<f32>() - 0.5) * 360.0,
            },
            art: card_art(id),
            palette: None,
        })
        .collect()
}

// ════════════════════════════════════════════════════════════════════════════
// Procedural card art
// ════════════════════════════════════════════════════════════════════════════

/// Paint a card face: three wavy hue bands around a per-card base hue.
///
/// The bands are broad and mid-brightness, which gives the palette
/// extractor three clearly distinct dominant colors to find.
pub fn card_art(id: usize) -> Vec<u32> {
    let mut seed = (id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        seed
    };

    let base_hue = (next() % 360) as f32;
    let hues = [
        base_hue,
        (base_hue + 110.0 + (next() % 40) as f32) % 360.0,
        (base_hue + 220.0 + (next() % 40) as f32) % 360.0,
    ];
    let wave_phase = (next() % 628) as f32 / 100.0;
    let wave_amp = 4.0 + (next() % 6) as f32;

    let mut buf = vec![0u32; ART_W * ART_H];
    for y in 0..ART_H {
        for x in 0..ART_W {
            let wobble = ((x as f32 / 9.0) + wave_phase).sin() * wave_amp;
            let band = (((y as f32 + wobble) / ART_H as f32) * 3.0)
                .clamp(0.0, 2.99) as usize;
            let val = 0.68 + 0.10 * ((x as f32 / 14.0) + (y as f32 / 17.0)).sin();
            buf[y * ART_W + x] = hsv_to_argb(hues[band], 0.55, val);
        }
    }

    // Thin light border so cards read as cards against the felt.
    for x in 0..ART_W {
        buf[x] = 0xFFF3_EFF6;
        buf[(ART_H - 1) * ART_W + x] = 0xFFF3_EFF6;
    }
    for y in 0..ART_H {
        buf[y * ART_W] = 0xFFF3_EFF6;
        buf[y * ART_W + ART_W - 1] = 0xFFF3_EFF6;
    }
    buf
}

/// Convert HSV → packed ARGB (0xAARRGGBB, A=0xFF).
pub fn hsv_to_argb(h: f32, s: f32, v: f32) -> u32 {
    let h = h.rem_euclid(360.0);
    let hi = (h / 60.0) as u32;
    let f = h / 60.0 - hi as f32;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let ri = (r * 255.0) as u32;
    let gi = (g * 255.0) as u32;
    let bi = (b * 255.0) as u32;
    0xFF00_0000 | (ri << 16) | (gi << 8) | bi
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
