//! Macrotape - input-automation macro engine
//!
//! This library provides components for:
//! - Recording keyboard/mouse input with inter-event timing
//! - Replaying macros asynchronously, with nested loops and randomized
//!   anti-detection jitter
//! - Continuous auto-clicking at a configurable rate
//! - Global hotkeys that trigger macro playback
//!
//! The engine is a library invoked by a UI layer; it owns no CLI or file
//! format. Input capture and injection go through the [`CaptureSource`] and
//! [`InputSink`] boundaries so callers can substitute their own backends
//! (the bundled ones use rdev).

pub mod capture;
pub mod clicker;
pub mod hotkey;
pub mod keys;
pub mod model;
pub mod player;
pub mod recorder;
pub mod sink;

pub use capture::{CaptureSource, GlobalCapture, InputEvent, Subscription};
pub use clicker::{AutoClicker, ClickerConfig};
pub use hotkey::HotkeyManager;
pub use model::{Action, DelayBounds, Macro, MouseButton};
pub use player::{MacroPlayer, PlaybackOutcome};
pub use recorder::{MacroRecorder, RecorderEvent};
pub use sink::{InputSink, SystemSink};

use thiserror::Error;

/// Main error type for Macrotape
#[derive(Error, Debug)]
pub enum MacroError {
    #[error("Failed to install input listener: {0}")]
    ListenerInstall(String),

    #[error("Failed to inject input event: {0}")]
    Injection(String),

    #[error("Unknown key identifier: {0}")]
    UnknownKey(String),
}
