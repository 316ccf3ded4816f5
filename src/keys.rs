//! Key-identifier mapping
//!
//! Macros store keys as opaque strings so the persistence layer and the UI
//! never depend on a backend key type. This module is the bridge used by the
//! bundled rdev capture/injection backends: every name round-trips through
//! [`key_name`] and [`parse_key`]. Keys rdev reports but the table does not
//! name fall back to `unknown(<code>)`.

use rdev::Key;

const KEY_NAMES: &[(Key, &str)] = &[
    (Key::KeyA, "a"),
    (Key::KeyB, "b"),
    (Key::KeyC, "c"),
    (Key::KeyD, "d"),
    (Key::KeyE, "e"),
    (Key::KeyF, "f"),
    (Key::KeyG, "g"),
    (Key::KeyH, "h"),
    (Key::KeyI, "i"),
    (Key::KeyJ, "j"),
    (Key::KeyK, "k"),
    (Key::KeyL, "l"),
    (Key::KeyM, "m"),
    (Key::KeyN, "n"),
    (Key::KeyO, "o"),
    (Key::KeyP, "p"),
    (Key::KeyQ, "q"),
    (Key::KeyR, "r"),
    (Key::KeyS, "s"),
    (Key::KeyT, "t"),
    (Key::KeyU, "u"),
    (Key::KeyV, "v"),
    (Key::KeyW, "w"),
    (Key::KeyX, "x"),
    (Key::KeyY, "y"),
    (Key::KeyZ, "z"),
    (Key::Num0, "0"),
    (Key::Num1, "1"),
    (Key::Num2, "2"),
    (Key::Num3, "3"),
    (Key::Num4, "4"),
    (Key::Num5, "5"),
    (Key::Num6, "6"),
    (Key::Num7, "7"),
    (Key::Num8, "8"),
    (Key::Num9, "9"),
    (Key::F1, "f1"),
    (Key::F2, "f2"),
    (Key::F3, "f3"),
    (Key::F4, "f4"),
    (Key::F5, "f5"),
    (Key::F6, "f6"),
    (Key::F7, "f7"),
    (Key::F8, "f8"),
    (Key::F9, "f9"),
    (Key::F10, "f10"),
    (Key::F11, "f11"),
    (Key::F12, "f12"),
    (Key::Escape, "escape"),
    (Key::Space, "space"),
    (Key::Return, "enter"),
    (Key::Tab, "tab"),
    (Key::Backspace, "backspace"),
    (Key::Delete, "delete"),
    (Key::Insert, "insert"),
    (Key::Home, "home"),
    (Key::End, "end"),
    (Key::PageUp, "page_up"),
    (Key::PageDown, "page_down"),
    (Key::UpArrow, "up"),
    (Key::DownArrow, "down"),
    (Key::LeftArrow, "left"),
    (Key::RightArrow, "right"),
    (Key::ShiftLeft, "shift"),
    (Key::ShiftRight, "shift_right"),
    (Key::ControlLeft, "ctrl"),
    (Key::ControlRight, "ctrl_right"),
    (Key::Alt, "alt"),
    (Key::AltGr, "alt_gr"),
    (Key::MetaLeft, "meta"),
    (Key::MetaRight, "meta_right"),
    (Key::CapsLock, "caps_lock"),
    (Key::NumLock, "num_lock"),
    (Key::ScrollLock, "scroll_lock"),
    (Key::PrintScreen, "print_screen"),
    (Key::Pause, "pause"),
    (Key::Kp0, "kp_0"),
    (Key::Kp1, "kp_1"),
    (Key::Kp2, "kp_2"),
    (Key::Kp3, "kp_3"),
    (Key::Kp4, "kp_4"),
    (Key::Kp5, "kp_5"),
    (Key::Kp6, "kp_6"),
    (Key::Kp7, "kp_7"),
    (Key::Kp8, "kp_8"),
    (Key::Kp9, "kp_9"),
    (Key::KpReturn, "kp_enter"),
    (Key::KpMinus, "kp_minus"),
    (Key::KpPlus, "kp_plus"),
    (Key::KpMultiply, "kp_multiply"),
    (Key::KpDivide, "kp_divide"),
    (Key::KpDelete, "kp_delete"),
    (Key::Function, "function"),
    (Key::IntlBackslash, "intl_backslash"),
    (Key::BackQuote, "`"),
    (Key::Minus, "-"),
    (Key::Equal, "="),
    (Key::LeftBracket, "["),
    (Key::RightBracket, "]"),
    (Key::SemiColon, ";"),
    (Key::Quote, "'"),
    (Key::BackSlash, "\\"),
    (Key::Comma, ","),
    (Key::Dot, "."),
    (Key::Slash, "/"),
];

/// Canonical string identifier for a key.
pub fn key_name(key: Key) -> String {
    if let Key::Unknown(code) = key {
        return format!("unknown({code})");
    }
    KEY_NAMES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("{key:?}").to_lowercase())
}

/// Parse a key identifier back to a key. Case-insensitive; returns `None`
/// for identifiers this backend cannot inject.
pub fn parse_key(name: &str) -> Option<Key> {
    let lower = name.to_lowercase();
    if let Some(code) = lower
        .strip_prefix("unknown(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return code.parse().ok().map(Key::Unknown);
    }
    KEY_NAMES
        .iter()
        .find(|(_, n)| *n == lower)
        .map(|(k, _)| *k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_keys_round_trip() {
        for (key, name) in KEY_NAMES {
            assert_eq!(parse_key(name), Some(*key), "{name}");
            assert_eq!(key_name(*key), *name);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(parse_key("F10"), Some(Key::F10));
        assert_eq!(parse_key("Escape"), Some(Key::Escape));
    }

    #[test]
    fn numpad_and_intl_keys_replay() {
        // Every key the capture side can name must parse back for injection.
        for key in [
            Key::KpReturn,
            Key::Kp0,
            Key::Kp9,
            Key::KpPlus,
            Key::KpDelete,
            Key::IntlBackslash,
            Key::Function,
        ] {
            let name = key_name(key);
            assert_eq!(parse_key(&name), Some(key), "{name}");
        }
    }

    #[test]
    fn unknown_codes_round_trip() {
        assert_eq!(key_name(Key::Unknown(187)), "unknown(187)");
        assert_eq!(parse_key("unknown(187)"), Some(Key::Unknown(187)));
    }

    #[test]
    fn unparseable_names_are_rejected() {
        assert_eq!(parse_key("definitely-not-a-key"), None);
    }
}
