//! Input injection boundary
//!
//! Playback and the auto-clicker drive an [`InputSink`] rather than the OS
//! directly, which is also the seam the tests mock. [`SystemSink`] injects
//! through rdev.

use parking_lot::Mutex;
use rdev::EventType;
use tracing::debug;

use crate::model::MouseButton;
use crate::{keys, MacroError};

/// Injects synthetic input into the system.
pub trait InputSink: Send + Sync {
    fn key_press(&self, key: &str) -> Result<(), MacroError>;
    fn key_release(&self, key: &str) -> Result<(), MacroError>;
    fn mouse_move(&self, x: f64, y: f64) -> Result<(), MacroError>;
    fn cursor_position(&self) -> Result<(f64, f64), MacroError>;
    fn click(&self, button: MouseButton) -> Result<(), MacroError>;
}

/// rdev-backed injection.
///
/// rdev cannot query the pointer, so the cursor position is shadow-tracked
/// from our own moves. That is sufficient for the engine: interpolated moves
/// and jitter always start from a position the player itself set.
pub struct SystemSink {
    position: Mutex<(f64, f64)>,
}

impl SystemSink {
    pub fn new() -> Self {
        Self {
            position: Mutex::new((0.0, 0.0)),
        }
    }

    fn simulate(event: &EventType) -> Result<(), MacroError> {
        rdev::simulate(event).map_err(|e| MacroError::Injection(format!("{e:?}")))
    }

    fn resolve(key: &str) -> Result<rdev::Key, MacroError> {
        keys::parse_key(key).ok_or_else(|| MacroError::UnknownKey(key.to_string()))
    }
}

impl Default for SystemSink {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSink for SystemSink {
    fn key_press(&self, key: &str) -> Result<(), MacroError> {
        debug!("press {key}");
        Self::simulate(&EventType::KeyPress(Self::resolve(key)?))
    }

    fn key_release(&self, key: &str) -> Result<(), MacroError> {
        debug!("release {key}");
        Self::simulate(&EventType::KeyRelease(Self::resolve(key)?))
    }

    fn mouse_move(&self, x: f64, y: f64) -> Result<(), MacroError> {
        Self::simulate(&EventType::MouseMove { x, y })?;
        *self.position.lock() = (x, y);
        Ok(())
    }

    fn cursor_position(&self) -> Result<(f64, f64), MacroError> {
        Ok(*self.position.lock())
    }

    fn click(&self, button: MouseButton) -> Result<(), MacroError> {
        let button = match button {
            MouseButton::Left => rdev::Button::Left,
            MouseButton::Right => rdev::Button::Right,
        };
        Self::simulate(&EventType::ButtonPress(button))?;
        Self::simulate(&EventType::ButtonRelease(button))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_are_reported() {
        let sink = SystemSink::new();
        // Resolution fails before any injection is attempted.
        assert!(matches!(
            sink.key_press("definitely-not-a-key"),
            Err(MacroError::UnknownKey(_))
        ));
    }

    #[test]
    fn cursor_position_tracks_moves() {
        let sink = SystemSink::new();
        assert_eq!(sink.cursor_position().unwrap(), (0.0, 0.0));
    }
}
