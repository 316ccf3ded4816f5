//! Input capture boundary
//!
//! The recorder and the hotkey manager consume raw input through the
//! [`CaptureSource`] trait so tests can drive them with synthetic events.
//! [`GlobalCapture`] is the real backend: rdev only supports one process-wide
//! listener and cannot tear it down once installed, so a single shared listen
//! thread fans events out to however many subscribers are live. Dropping a
//! [`Subscription`] detaches its handler; the listener itself stays parked.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::thread;

use parking_lot::Mutex;
use rdev::EventType;
use tracing::{error, info};

use crate::model::MouseButton;
use crate::{keys, MacroError};

/// A raw input event as delivered by a capture backend.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown { key: String },
    KeyUp { key: String },
    ButtonPress { button: MouseButton, x: i32, y: i32 },
    ButtonRelease { button: MouseButton, x: i32, y: i32 },
    PointerMove { x: i32, y: i32 },
}

/// Callback invoked for every captured event, on the listener thread.
pub type EventHandler = Box<dyn FnMut(&InputEvent) + Send>;

/// Uninstall guard: dropping it stops event delivery to the handler.
pub trait Subscription: Send {}

/// Source of raw input events.
pub trait CaptureSource {
    fn subscribe(&self, handler: EventHandler) -> Result<Box<dyn Subscription>, MacroError>;
}

/// The process-wide rdev-backed capture source.
#[derive(Debug, Default)]
pub struct GlobalCapture;

impl GlobalCapture {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureSource for GlobalCapture {
    fn subscribe(&self, handler: EventHandler) -> Result<Box<dyn Subscription>, MacroError> {
        registry().attach(handler)
    }
}

struct Registry {
    handlers: Mutex<HashMap<u64, EventHandler>>,
    next_id: AtomicU64,
    started: Mutex<bool>,
    listen_error: Mutex<Option<String>>,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Registry {
        handlers: Mutex::new(HashMap::new()),
        next_id: AtomicU64::new(0),
        started: Mutex::new(false),
        listen_error: Mutex::new(None),
    })
}

impl Registry {
    fn attach(&'static self, handler: EventHandler) -> Result<Box<dyn Subscription>, MacroError> {
        self.ensure_listener();
        // rdev reports listen failures asynchronously; a failure observed by
        // an earlier subscriber is surfaced to every later one.
        if let Some(err) = self.listen_error.lock().clone() {
            return Err(MacroError::ListenerInstall(err));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.handlers.lock().insert(id, handler);
        Ok(Box::new(Hook { id }))
    }

    fn ensure_listener(&'static self) {
        let mut started = self.started.lock();
        if *started {
            return;
        }
        *started = true;
        thread::spawn(move || {
            info!("Global input listener started");
            // rdev button events carry no coordinates; track the pointer
            // from move events and stamp presses with the last known spot.
            let mut pos = (0i32, 0i32);
            let result = rdev::listen(move |event: rdev::Event| {
                let mapped = match event.event_type {
                    EventType::KeyPress(key) => Some(InputEvent::KeyDown {
                        key: keys::key_name(key),
                    }),
                    EventType::KeyRelease(key) => Some(InputEvent::KeyUp {
                        key: keys::key_name(key),
                    }),
                    EventType::ButtonPress(button) => {
                        map_button(button).map(|button| InputEvent::ButtonPress {
                            button,
                            x: pos.0,
                            y: pos.1,
                        })
                    }
                    EventType::ButtonRelease(button) => {
                        map_button(button).map(|button| InputEvent::ButtonRelease {
                            button,
                            x: pos.0,
                            y: pos.1,
                        })
                    }
                    EventType::MouseMove { x, y } => {
                        pos = (x as i32, y as i32);
                        Some(InputEvent::PointerMove { x: pos.0, y: pos.1 })
                    }
                    EventType::Wheel { .. } => None,
                };
                if let Some(ev) = mapped {
                    for handler in registry().handlers.lock().values_mut() {
                        handler(&ev);
                    }
                }
            });
            if let Err(e) = result {
                let msg = format!("{e:?}");
                error!("Input listener failed: {msg}");
                *registry().listen_error.lock() = Some(msg);
            }
        });
    }
}

fn map_button(button: rdev::Button) -> Option<MouseButton> {
    match button {
        rdev::Button::Left => Some(MouseButton::Left),
        rdev::Button::Right => Some(MouseButton::Right),
        _ => None,
    }
}

struct Hook {
    id: u64,
}

impl Subscription for Hook {}

impl Drop for Hook {
    fn drop(&mut self) {
        registry().handlers.lock().remove(&self.id);
    }
}
