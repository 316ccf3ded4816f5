//! Macro data model
//!
//! Macros are value snapshots: the recorder and the external editor produce
//! them, the player only reads them. The serde representation (tagged by
//! `type`, snake_case) is the contract with the external persistence layer.

use serde::{Deserialize, Serialize};

/// Mouse button used by clicks and the auto-clicker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
}

/// Explicit per-action random-delay window, set by the editor.
///
/// Only honored when `max > min > 0`; otherwise the macro-level percent
/// variation applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayBounds {
    pub min: f64,
    pub max: f64,
}

impl DelayBounds {
    pub fn is_valid(&self) -> bool {
        self.min > 0.0 && self.max > self.min
    }
}

/// A single recorded input event or control marker.
///
/// `delay` is the elapsed time in seconds since the previous recorded action
/// at capture time, always >= 0. Keys are opaque identifier strings (see
/// [`crate::keys`] for the mapping used by the bundled rdev backends).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    KeyPress {
        key: String,
        /// One other key held at capture time (chord), simplified mode only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        second_key: Option<String>,
        delay: f64,
        /// Recorded press-only: the player synthesizes the release after a
        /// short dwell since no explicit release was captured.
        #[serde(default)]
        auto_release: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        random_delay: Option<DelayBounds>,
    },
    KeyRelease {
        key: String,
        delay: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        random_delay: Option<DelayBounds>,
    },
    MouseClick {
        button: MouseButton,
        x: i32,
        y: i32,
        delay: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        random_delay: Option<DelayBounds>,
    },
    MouseRelease {
        button: MouseButton,
        x: i32,
        y: i32,
        delay: f64,
    },
    MouseMove {
        x: i32,
        y: i32,
        delay: f64,
    },
    LoopStart {
        count: u32,
    },
    LoopEnd,
}

impl Action {
    /// Recorded delay in seconds; loop markers carry none.
    pub fn delay(&self) -> f64 {
        match self {
            Action::KeyPress { delay, .. }
            | Action::KeyRelease { delay, .. }
            | Action::MouseClick { delay, .. }
            | Action::MouseRelease { delay, .. }
            | Action::MouseMove { delay, .. } => *delay,
            Action::LoopStart { .. } | Action::LoopEnd => 0.0,
        }
    }

    /// Screen coordinates, for the actions that carry them.
    pub fn coords(&self) -> Option<(i32, i32)> {
        match self {
            Action::MouseClick { x, y, .. }
            | Action::MouseRelease { x, y, .. }
            | Action::MouseMove { x, y, .. } => Some((*x, *y)),
            _ => None,
        }
    }

    pub fn random_delay(&self) -> Option<DelayBounds> {
        match self {
            Action::KeyPress { random_delay, .. }
            | Action::KeyRelease { random_delay, .. }
            | Action::MouseClick { random_delay, .. } => *random_delay,
            _ => None,
        }
    }
}

/// A named, ordered sequence of actions plus per-macro playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    pub name: String,
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub anti_detect: bool,
    /// Symmetric delay variation, 0-100 percent.
    #[serde(default = "default_delay_percent")]
    pub random_delay_percent: u8,
    /// Positional jitter radius in pixels, 0-20.
    #[serde(default = "default_radius")]
    pub micro_movement_radius: u8,
    /// Recorded in simplified (press-only) mode.
    #[serde(default = "default_true")]
    pub simplified: bool,
}

fn default_true() -> bool {
    true
}

fn default_delay_percent() -> u8 {
    20
}

fn default_radius() -> u8 {
    5
}

impl Macro {
    pub fn new(name: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            name: name.into(),
            actions,
            hotkey: None,
            enabled: true,
            anti_detect: false,
            random_delay_percent: default_delay_percent(),
            micro_movement_radius: default_radius(),
            simplified: true,
        }
    }

    pub fn with_hotkey(mut self, hotkey: impl Into<String>) -> Self {
        self.hotkey = Some(hotkey.into());
        self
    }

    pub fn with_anti_detect(mut self, enabled: bool) -> Self {
        self.anti_detect = enabled;
        self
    }

    /// Set the delay variation percent, clamped to 0-100.
    pub fn with_random_delay_percent(mut self, percent: u8) -> Self {
        self.random_delay_percent = percent.min(100);
        self
    }

    /// Set the jitter radius in pixels, clamped to 0-20.
    pub fn with_micro_movement_radius(mut self, radius: u8) -> Self {
        self.micro_movement_radius = radius.min(20);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_are_clamped() {
        let mac = Macro::new("m", vec![])
            .with_random_delay_percent(150)
            .with_micro_movement_radius(40);
        assert_eq!(mac.random_delay_percent, 100);
        assert_eq!(mac.micro_movement_radius, 20);
    }

    #[test]
    fn actions_serialize_with_stable_tags() {
        let json = serde_json::to_value(Action::KeyPress {
            key: "a".into(),
            second_key: None,
            delay: 0.5,
            auto_release: true,
            random_delay: None,
        })
        .unwrap();
        assert_eq!(json["type"], "key_press");

        let json = serde_json::to_value(Action::MouseClick {
            button: MouseButton::Left,
            x: 10,
            y: 20,
            delay: 0.0,
            random_delay: None,
        })
        .unwrap();
        assert_eq!(json["type"], "mouse_click");
        assert_eq!(json["button"], "left");

        assert_eq!(
            serde_json::to_value(Action::LoopStart { count: 3 }).unwrap()["type"],
            "loop_start"
        );
    }

    #[test]
    fn macro_deserializes_with_defaults() {
        let mac: Macro = serde_json::from_str(r#"{"name":"m","actions":[]}"#).unwrap();
        assert!(mac.enabled);
        assert!(mac.simplified);
        assert_eq!(mac.random_delay_percent, 20);
        assert_eq!(mac.micro_movement_radius, 5);
        assert!(mac.hotkey.is_none());
    }

    #[test]
    fn delay_bounds_validity() {
        assert!(DelayBounds { min: 0.1, max: 0.5 }.is_valid());
        assert!(!DelayBounds { min: 0.0, max: 0.5 }.is_valid());
        assert!(!DelayBounds { min: 0.5, max: 0.5 }.is_valid());
        assert!(!DelayBounds { min: 0.5, max: 0.1 }.is_valid());
    }
}
