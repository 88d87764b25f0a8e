//! Hand-tracking source — drives a landmark-detector subprocess.
//!
//! The detector (a MediaPipe hand-landmarker wrapper) owns the camera and
//! prints one line per frame on stdout: `READY` once after startup, then a
//! JSON [`FramePacket`] per camera frame. This module spawns it, fuses its
//! frames into [`GestureSample`]s on a reader thread, and delivers them
//! over an `mpsc` channel.
//!
//! Consumers don't need to know whether samples came from real tracking or
//! the mouse; the control loop just drains whichever channel is live. A new
//! channel is created per tracker session, so samples from a torn-down
//! session are never deliverable to the next one.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::gesture::{FramePacket, GestureFuser, GestureSample};

/// How long the detector may take to print `READY` before the session is
/// declared failed.
pub const INIT_TIMEOUT: Duration = Duration::from_secs(15);

/// Hands tracked and confidence floors, passed to the detector.
pub const MAX_HANDS: u32 = 1;
pub const MIN_CONFIDENCE: f32 = 0.55;

// ════════════════════════════════════════════════════════════════════════════
// TrackerEvent
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum TrackerEvent {
    /// Detector finished startup and is delivering frames.
    Ready,
    /// One fused cursor/gesture sample.
    Sample(GestureSample),
    /// Detector could not start or died; hand mode is inert until retried.
    Failed(String),
}

// ════════════════════════════════════════════════════════════════════════════
// TrackerHandle
// ════════════════════════════════════════════════════════════════════════════

/// A live tracker session. Dropping the handle kills the detector process
/// unconditionally, releasing the capture device.
pub struct TrackerHandle {
    pub rx: Receiver<TrackerEvent>,
    child: Arc<Mutex<Child>>,
    started: Instant,
    ready_seen: bool,
    failed: bool,
}

impl TrackerHandle {
    /// Spawn the detector command and begin streaming samples.
    ///
    /// `command` is the detector argv (e.g. `["python3", "hand_detect.py"]`);
    /// tracking options are appended as flags. `view` is the window size the
    /// cursor should be mapped onto.
    pub fn spawn(command: &[String], view: (f32, f32)) -> Result<Self, String> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| "empty tracker command".to_string())?;

        log::info!("starting hand detector: {}", program);
        let mut child = Command::new(program)
            .args(args)
            .arg(format!("--max-hands={}", MAX_HANDS))
            .arg(format!("--min-confidence={}", MIN_CONFIDENCE))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| format!("failed to start detector: {}", e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| "detector has no stdout".to_string())?;

        let (tx, rx) = mpsc::channel();
        let child = Arc::new(Mutex::new(child));
        thread::spawn(move || reader_thread(stdout, view, tx));

        Ok(TrackerHandle {
            rx,
            child,
            started: Instant::now(),
            ready_seen: false,
            failed: false,
        })
    }

    /// Drain pending events, enforcing the init timeout. Returns the events
    /// in arrival order; a `Failed` event is synthesized if the detector has
    /// not signalled `READY` within [`INIT_TIMEOUT`].
    pub fn poll(&mut self) -> Vec<TrackerEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = self.rx.try_recv() {
            match &ev {
                TrackerEvent::Ready => self.ready_seen = true,
                TrackerEvent::Failed(_) => self.failed = true,
                TrackerEvent::Sample(_) => {}
            }
            events.push(ev);
        }
        if !self.ready_seen && !self.failed && self.started.elapsed() > INIT_TIMEOUT {
            self.failed = true;
            events.push(TrackerEvent::Failed(format!(
                "detector not ready after {}s",
                INIT_TIMEOUT.as_secs()
            )));
        }
        events
    }

    pub fn is_ready(&self) -> bool {
        self.ready_seen && !self.failed
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        if let Ok(mut child) = self.child.lock() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Reader thread
// ════════════════════════════════════════════════════════════════════════════

fn reader_thread(
    stdout: std::process::ChildStdout,
    view: (f32, f32),
    tx: Sender<TrackerEvent>,
) {
    let reader = BufReader::new(stdout);
    let mut fuser = GestureFuser::new(view.0, view.1);
    let mut lines = reader.lines();

    // Handshake: the first line must be READY.
    match lines.next() {
        Some(Ok(line)) if line.trim() == "READY" => {
            if tx.send(TrackerEvent::Ready).is_err() {
                return;
            }
        }
        Some(Ok(line)) => {
            let _ = tx.send(TrackerEvent::Failed(format!(
                "unexpected handshake: {}",
                line
            )));
            return;
        }
        Some(Err(e)) => {
            let _ = tx.send(TrackerEvent::Failed(format!("read error: {}", e)));
            return;
        }
        None => {
            let _ = tx.send(TrackerEvent::Failed("detector exited".to_string()));
            return;
        }
    }

    let epoch = Instant::now();
    for line in lines {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                let _ = tx.send(TrackerEvent::Failed(format!("read error: {}", e)));
                return;
            }
        };
        let packet: FramePacket = match serde_json::from_str(&line) {
            Ok(p) => p,
            Err(e) => {
                log::debug!("skipping unparseable tracker frame: {}", e);
                continue;
            }
        };
        if let Some(err) = packet.error {
            log::warn!("detector error: {}", err);
            continue;
        }
        let Some(hand) = packet.hands.first() else {
            continue;
        };
        if hand.score < MIN_CONFIDENCE {
            continue;
        }
        let now_ms = epoch.elapsed().as_millis() as u64;
        let sample = fuser.fuse(hand, now_ms);
        if tx.send(TrackerEvent::Sample(sample)).is_err() {
            return; // receiver dropped — session torn down
        }
    }
    let _ = tx.send(TrackerEvent::Failed("detector stream ended".to_string()));
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
