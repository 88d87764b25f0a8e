//! # card_palette
//!
//! Extracts the three most representative colors from a card's pixel art.
//!
//! The extractor is a *total* function: whatever the input looks like, it
//! returns exactly three colors. Degenerate inputs (empty buffers, images
//! that are all shadow or all glare, images without three sufficiently
//! distinct hues) fall back to [`DEFAULT_PALETTE`].
//!
//! Pixels travel as packed `0xAARRGGBB` words, the same layout a software
//! framebuffer uses, so the extractor can be pointed at any on-screen
//! surface without conversion.

use std::collections::HashMap;

// ════════════════════════════════════════════════════════════════════════════
// Color
// ════════════════════════════════════════════════════════════════════════════

/// An opaque RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color { r: 0xFF, g: 0xFF, b: 0xFF };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Unpack from `0xAARRGGBB` (alpha ignored).
    pub fn from_argb(px: u32) -> Self {
        Color {
            r: ((px >> 16) & 0xFF) as u8,
            g: ((px >> 8) & 0xFF) as u8,
            b: (px & 0xFF) as u8,
        }
    }

    /// Pack as `0xFFRRGGBB`.
    pub fn to_argb(self) -> u32 {
        0xFF00_0000 | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Parse `#rrggbb` (case-insensitive, leading `#` required).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Color { r, g, b })
    }

    /// Format as `#rrggbb`.
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Perceptual brightness 0–255 (ITU-R 601 luma weights).
    pub fn brightness(self) -> u32 {
        (self.r as u32 * 299 + self.g as u32 * 587 + self.b as u32 * 114) / 1000
    }

    /// Sum of absolute per-channel differences, 0–765.
    pub fn diff_sum(self, other: Color) -> u32 {
        let d = |a: u8, b: u8| (a as i32 - b as i32).unsigned_abs();
        d(self.r, other.r) + d(self.g, other.g) + d(self.b, other.b)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Extraction parameters
// ════════════════════════════════════════════════════════════════════════════

/// Side length of the downscaled sampling grid.
pub const SAMPLE_SIZE: usize = 50;

/// Only every Nth grid cell is counted.
const SAMPLE_STRIDE: usize = 4;

/// Pixels darker than this are treated as shadow and skipped.
const MIN_BRIGHTNESS: u32 = 30;

/// Pixels brighter than this are treated as glare and skipped.
const MAX_BRIGHTNESS: u32 = 235;

/// Two colors count as distinct when their channel-difference sum exceeds this.
const MIN_DIFF_SUM: u32 = 100;

/// Palette used whenever extraction cannot produce three qualifying colors.
pub const DEFAULT_PALETTE: [Color; 3] = [
    Color { r: 0xE0, g: 0xC3, b: 0xFC },
    Color { r: 0x8E, g: 0xC5, b: 0xFC },
    Color { r: 0xF0, g: 0x93, b: 0xFB },
];

// ════════════════════════════════════════════════════════════════════════════
// extract_palette
// ════════════════════════════════════════════════════════════════════════════

/// Extract three representative colors from an ARGB buffer.
///
/// # Algorithm
///
/// 1. Downscale (nearest-neighbor) onto a `SAMPLE_SIZE`² grid and count the
///    frequency of every `SAMPLE_STRIDE`th cell, skipping shadow and glare
///    pixels.
/// 2. Sort colors by frequency (ties broken by channel value so the result
///    is deterministic).
/// 3. Take the most frequent color, then greedily accept further colors only
///    if their [`Color::diff_sum`] against *every* accepted color exceeds
///    `MIN_DIFF_SUM`.
/// 4. If fewer than three colors qualify, pad with the runner-up (or white),
///    and fall back to [`DEFAULT_PALETTE`] when the histogram itself is too
///    small.
pub fn extract_palette(argb: &[u32], width: usize, height: usize) -> [Color; 3] {
    if width == 0 || height == 0 || argb.len() < width * height {
        return DEFAULT_PALETTE;
    }

    let mut counts: HashMap<Color, usize> = HashMap::new();
    let mut cell = 0usize;
    for gy in 0..SAMPLE_SIZE {
        for gx in 0..SAMPLE_SIZE {
            cell += 1;
            if cell % SAMPLE_STRIDE != 0 {
                continue;
            }
            let sx = gx * width / SAMPLE_SIZE;
            let sy = gy * height / SAMPLE_SIZE;
            let color = Color::from_argb(argb[sy * width + sx]);
            let lum = color.brightness();
            if lum < MIN_BRIGHTNESS || lum > MAX_BRIGHTNESS {
                continue;
            }
            *counts.entry(color).or_insert(0) += 1;
        }
    }

    let mut sorted: Vec<(Color, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    if sorted.len() < 3 {
        return DEFAULT_PALETTE;
    }

    let mut result: Vec<Color> = vec![sorted[0].0];
    for &(candidate, _) in &sorted[1..] {
        if result.len() >= 3 {
            break;
        }
        if result.iter().all(|c| c.diff_sum(candidate) > MIN_DIFF_SUM) {
            result.push(candidate);
        }
    }
    while result.len() < 3 {
        result.push(sorted.get(1).map(|&(c, _)| c).unwrap_or(Color::WHITE));
    }

    [result[0], result[1], result[2]]
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    /// Buffer filled with three vertical color bands.
    fn banded(a: Color, b: Color, c: Color, w: usize, h: usize) -> Vec<u32> {
        let mut buf = vec![0u32; w * h];
        for y in 0..h {
            for x in 0..w {
                let color = if x < w / 3 {
                    a
                } else if x < 2 * w / 3 {
                    b
                } else {
                    c
                };
                buf[y * w + x] = color.to_argb();
            }
        }
        buf
    }

    #[test]
    fn hex_roundtrip() {
        let c = Color::new(0xE0, 0xC3, 0xFC);
        assert_eq!(Color::from_hex(&c.hex()), Some(c));
        assert_eq!(c.hex(), "#e0c3fc");
    }

    #[test]
    fn hex_rejects_garbage() {
        assert_eq!(Color::from_hex("e0c3fc"), None);
        assert_eq!(Color::from_hex("#zzzzzz"), None);
        assert_eq!(Color::from_hex("#fff"), None);
    }

    #[test]
    fn argb_roundtrip() {
        let c = Color::new(10, 200, 99);
        assert_eq!(Color::from_argb(c.to_argb()), c);
    }

    #[test]
    fn extracts_three_distinct_bands() {
        let a = Color::new(200, 40, 40);
        let b = Color::new(40, 200, 40);
        let c = Color::new(40, 40, 200);
        let palette = extract_palette(&banded(a, b, c, 120, 90), 120, 90);
        assert_eq!(palette.len(), 3);
        for i in 0..3 {
            for j in (i + 1)..3 {
                assert!(
                    palette[i].diff_sum(palette[j]) > 100,
                    "{} vs {} not distinct",
                    palette[i].hex(),
                    palette[j].hex()
                );
            }
        }
        assert!(palette.contains(&a));
        assert!(palette.contains(&b));
        assert!(palette.contains(&c));
    }

    #[test]
    fn uniform_image_falls_back() {
        let buf = vec![Color::new(100, 100, 100).to_argb(); 64 * 64];
        assert_eq!(extract_palette(&buf, 64, 64), DEFAULT_PALETTE);
    }

    #[test]
    fn all_shadow_falls_back() {
        let buf = vec![Color::new(5, 5, 5).to_argb(); 64 * 64];
        assert_eq!(extract_palette(&buf, 64, 64), DEFAULT_PALETTE);
    }

    #[test]
    fn all_glare_falls_back() {
        let buf = vec![Color::new(250, 250, 250).to_argb(); 64 * 64];
        assert_eq!(extract_palette(&buf, 64, 64), DEFAULT_PALETTE);
    }

    #[test]
    fn empty_buffer_falls_back() {
        assert_eq!(extract_palette(&[], 0, 0), DEFAULT_PALETTE);
        assert_eq!(extract_palette(&[0; 10], 50, 50), DEFAULT_PALETTE);
    }

    #[test]
    fn near_identical_hues_pad_from_runner_up() {
        // Two bands that differ but not by the distinctness threshold,
        // plus one clearly distinct band.
        let a = Color::new(120, 60, 60);
        let b = Color::new(140, 70, 70); // diff_sum vs a = 40 → rejected
        let c = Color::new(40, 40, 200);
        let palette = extract_palette(&banded(a, b, c, 120, 90), 120, 90);
        // Greedy pass keeps a and c; the third slot is padded, never absent.
        assert!(palette.contains(&a));
        assert!(palette.contains(&c));
    }

    #[test]
    fn deterministic_for_same_input() {
        let a = Color::new(200, 40, 40);
        let b = Color::new(40, 200, 40);
        let c = Color::new(40, 40, 200);
        let buf = banded(a, b, c, 120, 90);
        assert_eq!(
            extract_palette(&buf, 120, 90),
            extract_palette(&buf, 120, 90)
        );
    }
}
