//! Macro recording
//!
//! Turns a live stream of capture events into an action sequence with
//! relative timing. The recorder subscribes to a [`CaptureSource`]; the
//! handler runs on the listener thread, so all state sits behind a lock and
//! the owner observes progress through an mpsc channel.

use std::collections::HashSet;
use std::mem;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::capture::{CaptureSource, InputEvent, Subscription};
use crate::model::Action;
use crate::MacroError;

/// Movements this close to the last recorded position are coalesced.
const MOVE_COALESCE_PX: i32 = 5;

const DEFAULT_STOP_KEY: &str = "escape";

/// Progress notifications emitted while recording.
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    Recorded(Action),
    Finished,
}

struct RecorderState {
    recording: bool,
    simplified: bool,
    actions: Vec<Action>,
    pressed: HashSet<String>,
    last_event: Instant,
}

/// Records input events into an ordered action sequence.
pub struct MacroRecorder {
    state: Arc<Mutex<RecorderState>>,
    tx: Sender<RecorderEvent>,
    rx: Receiver<RecorderEvent>,
    subscription: Option<Box<dyn Subscription>>,
    stop_key: String,
}

impl MacroRecorder {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            state: Arc::new(Mutex::new(RecorderState {
                recording: false,
                simplified: true,
                actions: Vec::new(),
                pressed: HashSet::new(),
                last_event: Instant::now(),
            })),
            tx,
            rx,
            subscription: None,
            stop_key: DEFAULT_STOP_KEY.to_string(),
        }
    }

    /// Use a different key to end recording (default: escape).
    pub fn with_stop_key(mut self, key: impl Into<String>) -> Self {
        self.stop_key = key.into().to_lowercase();
        self
    }

    /// Reset state and install listeners. Returns immediately; events arrive
    /// on the listener thread. In simplified mode only presses are kept and
    /// chords are folded into the press.
    pub fn start_recording(
        &mut self,
        source: &dyn CaptureSource,
        simplified: bool,
    ) -> Result<(), MacroError> {
        self.subscription = None;
        {
            let mut st = self.state.lock();
            st.recording = true;
            st.simplified = simplified;
            st.actions.clear();
            st.pressed.clear();
            st.last_event = Instant::now();
        }

        let state = self.state.clone();
        let tx = self.tx.clone();
        let stop_key = self.stop_key.clone();
        match source.subscribe(Box::new(move |event| {
            handle_event(&state, &tx, &stop_key, event);
        })) {
            Ok(sub) => {
                info!("Recording started (simplified: {simplified})");
                self.subscription = Some(sub);
                Ok(())
            }
            Err(e) => {
                // No partial state survives a failed install.
                self.state.lock().recording = false;
                Err(e)
            }
        }
    }

    /// Uninstall listeners and fire the finished notification. Recorded
    /// actions stay available until taken.
    pub fn stop_recording(&mut self) {
        self.subscription = None;
        let mut st = self.state.lock();
        if st.recording {
            st.recording = false;
            let _ = self.tx.send(RecorderEvent::Finished);
            info!("Recording stopped ({} actions)", st.actions.len());
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().recording
    }

    /// Drain the recorded action sequence.
    pub fn take_actions(&mut self) -> Vec<Action> {
        mem::take(&mut self.state.lock().actions)
    }

    pub fn actions(&self) -> Vec<Action> {
        self.state.lock().actions.clone()
    }

    /// Receiver for [`RecorderEvent`] notifications.
    pub fn events(&self) -> &Receiver<RecorderEvent> {
        &self.rx
    }
}

impl Default for MacroRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn elapsed_delay(st: &mut RecorderState) -> f64 {
    let now = Instant::now();
    let delay = now.duration_since(st.last_event).as_secs_f64();
    st.last_event = now;
    delay
}

fn record(st: &mut RecorderState, tx: &Sender<RecorderEvent>, action: Action) {
    debug!("recorded {action:?}");
    st.actions.push(action.clone());
    let _ = tx.send(RecorderEvent::Recorded(action));
}

fn handle_event(
    state: &Mutex<RecorderState>,
    tx: &Sender<RecorderEvent>,
    stop_key: &str,
    event: &InputEvent,
) {
    let mut st = state.lock();
    if !st.recording {
        return;
    }
    match event {
        InputEvent::KeyDown { key } => {
            let delay = elapsed_delay(&mut st);
            // Chord: pick one other currently-held key, if any.
            let second_key = if st.simplified {
                st.pressed.iter().find(|k| k.as_str() != key.as_str()).cloned()
            } else {
                None
            };
            st.pressed.insert(key.clone());
            let auto_release = st.simplified;
            record(
                &mut st,
                tx,
                Action::KeyPress {
                    key: key.clone(),
                    second_key,
                    delay,
                    auto_release,
                    random_delay: None,
                },
            );
        }
        InputEvent::KeyUp { key } => {
            st.pressed.remove(key);
            if key.eq_ignore_ascii_case(stop_key) {
                st.recording = false;
                let _ = tx.send(RecorderEvent::Finished);
                info!("Stop key observed, recording finished");
                return;
            }
            // Press-only model: releases are not recorded in simplified mode
            // and do not advance the timestamp.
            if st.simplified {
                return;
            }
            let delay = elapsed_delay(&mut st);
            record(
                &mut st,
                tx,
                Action::KeyRelease {
                    key: key.clone(),
                    delay,
                    random_delay: None,
                },
            );
        }
        InputEvent::ButtonPress { button, x, y } => {
            let delay = elapsed_delay(&mut st);
            record(
                &mut st,
                tx,
                Action::MouseClick {
                    button: *button,
                    x: *x,
                    y: *y,
                    delay,
                    random_delay: None,
                },
            );
        }
        InputEvent::ButtonRelease { button, x, y } => {
            // The timestamp advances even when the release is suppressed.
            let delay = elapsed_delay(&mut st);
            if st.simplified {
                return;
            }
            record(
                &mut st,
                tx,
                Action::MouseRelease {
                    button: *button,
                    x: *x,
                    y: *y,
                    delay,
                },
            );
        }
        InputEvent::PointerMove { x, y } => {
            if let Some((lx, ly)) = st.actions.last().and_then(Action::coords) {
                if (lx - x).abs() < MOVE_COALESCE_PX && (ly - y).abs() < MOVE_COALESCE_PX {
                    return;
                }
            }
            let delay = elapsed_delay(&mut st);
            record(
                &mut st,
                tx,
                Action::MouseMove {
                    x: *x,
                    y: *y,
                    delay,
                },
            );
        }
    }
}
