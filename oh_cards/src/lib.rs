//! # oh_cards
//!
//! A browser-free rendition of the OH Cards divination game: draw three
//! cards from a shuffled deck of 88, extract each card's soul colors, pour
//! your chosen colors into a glass, and receive a generated reading of the
//! blend.
//!
//! ## Gesture → Action mapping (hand mode)
//!
//! | Gesture | Phase | Action |
//! |---|---|---|
//! | Open hand | Stacked | Begin shuffling |
//! | Point (index only) | Shuffling | Freeze the deck into the fan |
//! | Hover 1.8 s | Selecting | Commit the hovered card |
//! | Shake or open hand | Revealing | Flip the drawn cards |
//! | Pinch over a swatch | Color selection | Choose that card's color |
//! | Hover 1.5 s over a source | Filling glass | Pour that color |
//!
//! ## Mouse mode
//!
//! Clicks replace gestures everywhere except the pour, which keeps its
//! dwell in both modes. `Tab` toggles modes at any time without resetting
//! the session; `R` resets; `Q` quits.
//!
//! ## Architecture
//!
//! One control loop ticks at ~60 fps. The hand tracker runs on its own
//! thread and only *writes* cursor/gesture samples into a channel; every
//! phase transition happens inside the tick, which reads the latest sample.
//! Palette extraction and the interpretation call run on worker threads and
//! report back over a channel, tagged with the session generation so results
//! from a reset-away session are dropped on arrival.

pub mod app;
pub mod choreography;
pub mod deck;
pub mod gesture;
pub mod state;
pub mod tasks;
pub mod tracker;
pub mod visualizer;
