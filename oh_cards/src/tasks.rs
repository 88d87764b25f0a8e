//! Background work: palette extraction and oracle brewing.
//!
//! Both jobs run on plain worker threads and report back over a single
//! `mpsc` channel the control loop drains once per frame. Every result
//! carries the session generation it was issued under; [`crate::state`]
//! drops results whose generation no longer matches, so a reset mid-flight
//! can never corrupt the next session.
//!
//! Workers never panic the app: extraction falls back to the default
//! palette and brewing falls back to a locally composed reading, so every
//! job produces exactly one event.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use card_palette::{extract_palette, Color};
use color_oracle::{OracleClient, Reading};

use crate::deck::{ART_H, ART_W};

// ════════════════════════════════════════════════════════════════════════════
// TaskEvent
// ════════════════════════════════════════════════════════════════════════════

/// A completed background job.
#[derive(Clone, Debug)]
pub enum TaskEvent {
    Palette {
        generation: u64,
        card_id: usize,
        palette: [Color; 3],
    },
    Reading {
        generation: u64,
        reading: Reading,
    },
}

// ════════════════════════════════════════════════════════════════════════════
// TaskHub
// ════════════════════════════════════════════════════════════════════════════

/// Owns the result channel and spawns workers onto it.
pub struct TaskHub {
    tx: Sender<TaskEvent>,
    rx: Receiver<TaskEvent>,
}

impl TaskHub {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        TaskHub { tx, rx }
    }

    /// Collect every result that has arrived since the last drain.
    pub fn drain(&self) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = self.rx.try_recv() {
            events.push(ev);
        }
        events
    }

    /// Extract palettes for each `(card_id, art)` job, one thread per card.
    /// The jobs are independent and small, so fan-out beats a queue here.
    pub fn spawn_extraction(&self, generation: u64, jobs: Vec<(usize, Vec<u32>)>) {
        for (card_id, art) in jobs {
            let tx = self.tx.clone();
            thread::spawn(move || {
                let palette = extract_palette(&art, ART_W, ART_H);
                log::debug!("card {} palette extracted", card_id);
                // Send failure means the hub is gone; nothing to do.
                let _ = tx.send(TaskEvent::Palette {
                    generation,
                    card_id,
                    palette,
                });
            });
        }
    }

    /// Ask the oracle for a reading of `colors` on a worker thread. `brew`
    /// is total — it falls back internally — so this always yields an event.
    pub fn spawn_brewing(&self, generation: u64, client: OracleClient, colors: [Color; 3]) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            let reading = client.brew(colors);
            let _ = tx.send(TaskEvent::Reading { generation, reading });
        });
    }
}

impl Default for TaskHub {
    fn default() -> Self {
        Self::new()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::card_art;
    use std::time::{Duration, Instant};

    fn drain_until(hub: &TaskHub, want: usize) -> Vec<TaskEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while events.len() < want && Instant::now() < deadline {
            events.extend(hub.drain());
            thread::sleep(Duration::from_millis(5));
        }
        events
    }

    #[test]
    fn extraction_fans_out_and_tags_generation() {
        let hub = TaskHub::new();
        let jobs = vec![(3usize, card_art(3)), (7, card_art(7)), (11, card_art(11))];
        hub.spawn_extraction(9, jobs);

        let events = drain_until(&hub, 3);
        assert_eq!(events.len(), 3);
        let mut ids: Vec<usize> = events
            .iter()
            .map(|ev| match ev {
                TaskEvent::Palette { generation, card_id, .. } => {
                    assert_eq!(*generation, 9);
                    *card_id
                }
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![3, 7, 11]);
    }

    #[test]
    fn extraction_of_real_art_is_not_default() {
        let hub = TaskHub::new();
        hub.spawn_extraction(0, vec![(5, card_art(5))]);
        let events = drain_until(&hub, 1);
        match &events[0] {
            TaskEvent::Palette { palette, .. } => {
                assert_ne!(*palette, card_palette::DEFAULT_PALETTE);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn brewing_without_key_yields_fallback_reading() {
        let hub = TaskHub::new();
        let colors = card_palette::DEFAULT_PALETTE;
        // No API key: brew short-circuits to the fallback without touching
        // the network.
        hub.spawn_brewing(4, OracleClient::new(None), colors);
        let events = drain_until(&hub, 1);
        match &events[0] {
            TaskEvent::Reading { generation, reading } => {
                assert_eq!(*generation, 4);
                assert!(!reading.name.is_empty());
                assert_eq!(reading.colors, colors);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn drain_on_empty_hub_is_empty() {
        let hub = TaskHub::new();
        assert!(hub.drain().is_empty());
    }
}
