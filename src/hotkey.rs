//! Global hotkey dispatch
//!
//! Maps key identifiers to macros and triggers playback when the key is seen
//! by a capture source. The table is shared between the owning thread
//! (register/unregister) and the listener thread (lookup); keys are
//! normalized to lowercase on insert so at most one macro fires per event.
//! Auto-repeating keys retrigger playback on every repeat; no suppression.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::capture::{CaptureSource, InputEvent, Subscription};
use crate::model::Macro;
use crate::player::MacroPlayer;
use crate::MacroError;

pub struct HotkeyManager {
    player: Arc<MacroPlayer>,
    table: Arc<Mutex<HashMap<String, Macro>>>,
    subscription: Option<Box<dyn Subscription>>,
}

impl HotkeyManager {
    pub fn new(player: Arc<MacroPlayer>) -> Self {
        Self {
            player,
            table: Arc::new(Mutex::new(HashMap::new())),
            subscription: None,
        }
    }

    /// Bind `hotkey` to `mac`; replaces an existing binding for the key.
    /// Safe to call while the listener is running.
    pub fn register(&self, hotkey: impl Into<String>, mac: Macro) {
        let hotkey = hotkey.into().to_lowercase();
        debug!("Registering hotkey '{hotkey}' -> '{}'", mac.name);
        self.table.lock().insert(hotkey, mac);
    }

    pub fn unregister(&self, hotkey: &str) {
        self.table.lock().remove(&hotkey.to_lowercase());
    }

    pub fn bindings(&self) -> Vec<String> {
        self.table.lock().keys().cloned().collect()
    }

    /// Install the global key listener. Replaces a previous installation.
    pub fn start_listening(&mut self, source: &dyn CaptureSource) -> Result<(), MacroError> {
        self.subscription = None;
        let table = self.table.clone();
        let player = self.player.clone();
        let sub = source.subscribe(Box::new(move |event| {
            if let InputEvent::KeyDown { key } = event {
                let found = table.lock().get(&key.to_lowercase()).cloned();
                if let Some(mac) = found {
                    debug!("Hotkey '{key}' fired for macro '{}'", mac.name);
                    player.play(&mac);
                }
            }
        }))?;
        self.subscription = Some(sub);
        info!("Hotkey listener started");
        Ok(())
    }

    pub fn stop_listening(&mut self) {
        if self.subscription.take().is_some() {
            info!("Hotkey listener stopped");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.subscription.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::EventHandler;
    use crate::model::Action;
    use crate::player::PlaybackOutcome;
    use crate::sink::InputSink;
    use crate::model::MouseButton;
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeCapture {
        handlers: Arc<Mutex<HashMap<u64, EventHandler>>>,
        next_id: std::sync::atomic::AtomicU64,
    }

    struct FakeSubscription {
        id: u64,
        handlers: Arc<Mutex<HashMap<u64, EventHandler>>>,
    }
    impl Subscription for FakeSubscription {}
    impl Drop for FakeSubscription {
        fn drop(&mut self) {
            self.handlers.lock().remove(&self.id);
        }
    }

    impl CaptureSource for FakeCapture {
        fn subscribe(&self, handler: EventHandler) -> Result<Box<dyn Subscription>, MacroError> {
            let id = self
                .next_id
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.handlers.lock().insert(id, handler);
            Ok(Box::new(FakeSubscription {
                id,
                handlers: self.handlers.clone(),
            }))
        }
    }

    impl FakeCapture {
        fn fire(&self, event: InputEvent) {
            for handler in self.handlers.lock().values_mut() {
                handler(&event);
            }
        }
    }

    struct NullSink;
    impl InputSink for NullSink {
        fn key_press(&self, _: &str) -> Result<(), MacroError> {
            Ok(())
        }
        fn key_release(&self, _: &str) -> Result<(), MacroError> {
            Ok(())
        }
        fn mouse_move(&self, _: f64, _: f64) -> Result<(), MacroError> {
            Ok(())
        }
        fn cursor_position(&self) -> Result<(f64, f64), MacroError> {
            Ok((0.0, 0.0))
        }
        fn click(&self, _: MouseButton) -> Result<(), MacroError> {
            Ok(())
        }
    }

    fn setup() -> (HotkeyManager, FakeCapture, mpsc::Receiver<PlaybackOutcome>) {
        let (tx, rx) = mpsc::channel();
        let player = Arc::new(MacroPlayer::with_notifier(Arc::new(NullSink), tx));
        let mut manager = HotkeyManager::new(player);
        let capture = FakeCapture::default();
        manager.start_listening(&capture).unwrap();
        (manager, capture, rx)
    }

    fn trivial_macro(name: &str) -> Macro {
        Macro::new(
            name,
            vec![Action::KeyPress {
                key: "a".into(),
                second_key: None,
                delay: 0.0,
                auto_release: false,
                random_delay: None,
            }],
        )
    }

    #[test]
    fn matching_key_plays_exactly_once() {
        let (manager, capture, rx) = setup();
        manager.register("f10", trivial_macro("m"));

        capture.fire(InputEvent::KeyDown { key: "f10".into() });

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.macro_name, "m");
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn lookup_normalizes_case() {
        let (manager, capture, rx) = setup();
        manager.register("F10", trivial_macro("m"));

        capture.fire(InputEvent::KeyDown { key: "f10".into() });
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn unregistered_key_triggers_nothing() {
        let (manager, capture, rx) = setup();
        manager.register("f10", trivial_macro("m"));
        manager.unregister("f10");

        capture.fire(InputEvent::KeyDown { key: "f10".into() });
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn non_matching_keys_are_ignored() {
        let (manager, capture, rx) = setup();
        manager.register("f10", trivial_macro("m"));

        capture.fire(InputEvent::KeyDown { key: "f9".into() });
        capture.fire(InputEvent::KeyUp { key: "f10".into() });
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn stop_listening_detaches() {
        let (mut manager, capture, rx) = setup();
        manager.register("f10", trivial_macro("m"));
        manager.stop_listening();
        assert!(!manager.is_listening());

        capture.fire(InputEvent::KeyDown { key: "f10".into() });
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        // Bindings survive; only delivery stops.
        assert_eq!(manager.bindings(), vec!["f10".to_string()]);
    }
}
