//! Macro playback
//!
//! One `play()` call spawns one independent playback thread that interprets
//! the action sequence as a small program: loop markers drive a frame stack,
//! everything else sleeps its (optionally randomized) delay and injects.
//! Playback is cooperatively cancellable and never blocks the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::model::{Action, Macro};
use crate::sink::InputSink;
use crate::MacroError;

/// Dwell between a synthesized press and release (chords, press-only keys).
const KEY_DWELL: Duration = Duration::from_millis(50);

/// Cap on any single inter-action wait; bounds cancellation latency.
const MAX_STEP_DELAY_SECS: f64 = 10.0;

/// Sent when a playback thread exits, if the player has a notifier.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOutcome {
    pub macro_name: String,
    /// True when the stop flag ended playback early.
    pub cancelled: bool,
    /// Non-marker actions executed (including ones whose injection failed).
    pub actions_run: usize,
}

/// Runtime loop bookkeeping, private to one playback execution.
struct LoopFrame {
    start_index: usize,
    target_count: u32,
    iterations_done: u32,
}

/// Immutable snapshot handed to the playback thread. Taken up front so
/// concurrent edits to the owning collection cannot be observed mid-run.
struct PlaybackJob {
    name: String,
    actions: Vec<Action>,
    anti_detect: bool,
    random_delay_percent: u8,
    micro_movement_radius: u8,
}

/// Fire-and-forget macro player.
///
/// The stop flag is shared by every playback this player has launched and is
/// reset whenever a new playback starts, matching the control surface the UI
/// exposes (one global "stop").
pub struct MacroPlayer {
    sink: Arc<dyn InputSink>,
    stop: Arc<AtomicBool>,
    notify: Option<Sender<PlaybackOutcome>>,
}

impl MacroPlayer {
    pub fn new(sink: Arc<dyn InputSink>) -> Self {
        Self {
            sink,
            stop: Arc::new(AtomicBool::new(false)),
            notify: None,
        }
    }

    /// Player that reports every playback outcome on `notify`.
    pub fn with_notifier(sink: Arc<dyn InputSink>, notify: Sender<PlaybackOutcome>) -> Self {
        Self {
            sink,
            stop: Arc::new(AtomicBool::new(false)),
            notify: Some(notify),
        }
    }

    /// Launch an asynchronous playback of `mac`. Disabled macros are a no-op.
    /// Does not block and returns no handle; completion is observable only
    /// through the notifier.
    pub fn play(&self, mac: &Macro) {
        if !mac.enabled {
            debug!("Macro '{}' is disabled, not playing", mac.name);
            return;
        }
        let job = PlaybackJob {
            name: mac.name.clone(),
            actions: mac.actions.clone(),
            anti_detect: mac.anti_detect,
            random_delay_percent: mac.random_delay_percent,
            micro_movement_radius: mac.micro_movement_radius,
        };
        let sink = self.sink.clone();
        let stop = self.stop.clone();
        let notify = self.notify.clone();
        stop.store(false, Ordering::SeqCst);

        thread::spawn(move || {
            info!("Playback of '{}' started ({} actions)", job.name, job.actions.len());
            let (actions_run, cancelled) = run_playback(&job, sink.as_ref(), &stop);
            info!(
                "Playback of '{}' {} after {} actions",
                job.name,
                if cancelled { "cancelled" } else { "finished" },
                actions_run
            );
            if let Some(tx) = notify {
                let _ = tx.send(PlaybackOutcome {
                    macro_name: job.name,
                    cancelled,
                    actions_run,
                });
            }
        });
    }

    /// Request cancellation of in-flight playbacks. Observed once per action;
    /// latency is bounded by the per-step delay cap.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn run_playback(job: &PlaybackJob, sink: &dyn InputSink, stop: &AtomicBool) -> (usize, bool) {
    let mut loop_stack: Vec<LoopFrame> = Vec::new();
    let mut actions_run = 0usize;
    let mut i = 0usize;

    while i < job.actions.len() {
        if stop.load(Ordering::SeqCst) {
            return (actions_run, true);
        }
        match &job.actions[i] {
            Action::LoopStart { count } => {
                loop_stack.push(LoopFrame {
                    start_index: i,
                    target_count: (*count).max(1),
                    iterations_done: 0,
                });
                i += 1;
            }
            Action::LoopEnd => {
                // A stray LoopEnd with no open frame is skipped.
                match loop_stack.last_mut() {
                    Some(frame) => {
                        frame.iterations_done += 1;
                        if frame.iterations_done < frame.target_count {
                            i = frame.start_index + 1;
                        } else {
                            loop_stack.pop();
                            i += 1;
                        }
                    }
                    None => i += 1,
                }
            }
            action => {
                let delay = effective_delay(action, job.anti_detect, job.random_delay_percent);
                if delay > 0.0 {
                    thread::sleep(Duration::from_secs_f64(delay.min(MAX_STEP_DELAY_SECS)));
                }
                // One bad action never aborts the macro.
                if let Err(e) = inject(action, sink, job) {
                    warn!("Action {i} of '{}' failed: {e}", job.name);
                }
                actions_run += 1;
                i += 1;
            }
        }
    }
    (actions_run, false)
}

/// Anti-detection delay model: explicit per-action bounds win when valid,
/// otherwise the recorded delay varies symmetrically by the macro percent.
fn effective_delay(action: &Action, anti_detect: bool, percent: u8) -> f64 {
    let delay = action.delay();
    let bounds = action.random_delay();
    if !anti_detect || (bounds.is_none() && percent == 0) {
        return delay;
    }
    let mut rng = rand::thread_rng();
    if let Some(bounds) = bounds.filter(|b| b.is_valid()) {
        return rng.gen_range(bounds.min..=bounds.max);
    }
    let variation = delay * percent as f64 / 100.0;
    let lo = (delay - variation).max(0.0);
    let hi = delay + variation;
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

fn inject(action: &Action, sink: &dyn InputSink, job: &PlaybackJob) -> Result<(), MacroError> {
    match action {
        Action::KeyPress {
            key,
            second_key,
            auto_release,
            ..
        } => {
            if let Some(second) = second_key {
                // Modifier+key combo: hold the chord briefly, release in
                // reverse order.
                sink.key_press(second)?;
                sink.key_press(key)?;
                thread::sleep(KEY_DWELL);
                sink.key_release(key)?;
                sink.key_release(second)?;
            } else {
                sink.key_press(key)?;
                if *auto_release {
                    thread::sleep(KEY_DWELL);
                    sink.key_release(key)?;
                }
            }
        }
        Action::KeyRelease { key, .. } => sink.key_release(key)?,
        Action::MouseClick { button, x, y, .. } => {
            position_for_click(sink, *x, *y, job)?;
            sink.click(*button)?;
        }
        Action::MouseMove { x, y, .. } => move_cursor(sink, *x, *y, job)?,
        // Clicks already inject a full press/release pair; a recorded button
        // release carries only its delay.
        Action::MouseRelease { .. } => {}
        Action::LoopStart { .. } | Action::LoopEnd => unreachable!("markers handled by the interpreter"),
    }
    Ok(())
}

/// Park the cursor on the click target, optionally overshooting by a random
/// offset first so the approach does not land pixel-perfect.
fn position_for_click(
    sink: &dyn InputSink,
    x: i32,
    y: i32,
    job: &PlaybackJob,
) -> Result<(), MacroError> {
    if job.anti_detect && job.micro_movement_radius > 0 {
        let radius = job.micro_movement_radius as i32;
        let mut rng = rand::thread_rng();
        let dx = rng.gen_range(-radius..=radius);
        let dy = rng.gen_range(-radius..=radius);
        sink.mouse_move((x + dx) as f64, (y + dy) as f64)?;
        thread::sleep(Duration::from_secs_f64(rng.gen_range(0.01..0.1)));
    }
    sink.mouse_move(x as f64, y as f64)
}

/// Move to the target, interpolating in jittered steps when anti-detection
/// applies. The jitter radius shrinks to zero as the cursor closes in and the
/// final step snaps exactly onto the target.
fn move_cursor(sink: &dyn InputSink, x: i32, y: i32, job: &PlaybackJob) -> Result<(), MacroError> {
    if !(job.anti_detect && job.micro_movement_radius > 0) {
        return sink.mouse_move(x as f64, y as f64);
    }
    let (cur_x, cur_y) = sink.cursor_position()?;
    let (tx, ty) = (x as f64, y as f64);
    let distance = ((tx - cur_x).powi(2) + (ty - cur_y).powi(2)).sqrt();
    let steps = ((distance / 10.0) as u32).clamp(5, 20);
    let mut rng = rand::thread_rng();
    for step in 1..=steps {
        let progress = step as f64 / steps as f64;
        let radius = job.micro_movement_radius as f64 * (1.0 - progress);
        let jitter_x = if radius > 0.0 { rng.gen_range(-radius..=radius) } else { 0.0 };
        let jitter_y = if radius > 0.0 { rng.gen_range(-radius..=radius) } else { 0.0 };
        sink.mouse_move(
            cur_x + (tx - cur_x) * progress + jitter_x,
            cur_y + (ty - cur_y) * progress + jitter_y,
        )?;
        thread::sleep(Duration::from_secs_f64(rng.gen_range(0.005..0.02)));
    }
    sink.mouse_move(tx, ty)
}
