//! Continuous auto-clicker
//!
//! Independent of macros: one background loop clicking at a target rate
//! until stopped, with the same anti-detection knobs as playback. Unlike the
//! player, a single injection error terminates the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tracing::{error, info};

use crate::model::MouseButton;
use crate::sink::InputSink;
use crate::MacroError;

/// Shortest interval the rate jitter may produce.
const MIN_INTERVAL_SECS: f64 = 0.001;

#[derive(Debug, Clone)]
pub struct ClickerConfig {
    /// Target rate, clamped to 1-10000.
    pub clicks_per_minute: u32,
    pub button: MouseButton,
    pub anti_detect: bool,
    /// Symmetric interval variation, 0-100 percent.
    pub random_delay_percent: u8,
    /// Cursor nudge radius in pixels, 0-20.
    pub micro_movement_radius: u8,
}

impl Default for ClickerConfig {
    fn default() -> Self {
        Self {
            clicks_per_minute: 60,
            button: MouseButton::Left,
            anti_detect: false,
            random_delay_percent: 20,
            micro_movement_radius: 5,
        }
    }
}

pub struct AutoClicker {
    sink: Arc<dyn InputSink>,
    running: Arc<AtomicBool>,
    config: Arc<Mutex<ClickerConfig>>,
}

impl AutoClicker {
    pub fn new(sink: Arc<dyn InputSink>) -> Self {
        Self {
            sink,
            running: Arc::new(AtomicBool::new(false)),
            config: Arc::new(Mutex::new(ClickerConfig::default())),
        }
    }

    pub fn set_clicks_per_minute(&self, cpm: u32) {
        self.config.lock().clicks_per_minute = cpm.clamp(1, 10_000);
    }

    pub fn set_button(&self, button: MouseButton) {
        self.config.lock().button = button;
    }

    pub fn set_anti_detect(&self, enabled: bool) {
        self.config.lock().anti_detect = enabled;
    }

    pub fn set_random_delay_percent(&self, percent: u8) {
        self.config.lock().random_delay_percent = percent.min(100);
    }

    pub fn set_micro_movement_radius(&self, radius: u8) {
        self.config.lock().micro_movement_radius = radius.min(20);
    }

    pub fn config(&self) -> ClickerConfig {
        self.config.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the click loop on a background thread. The rate is fixed for
    /// the lifetime of one run; the other settings are re-read every cycle,
    /// so changing them takes effect immediately. No-op when already running.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let config = self.config.clone();
        let sink = self.sink.clone();
        let running = self.running.clone();

        thread::spawn(move || {
            let base_interval = {
                let cfg = config.lock();
                info!(
                    "Auto-clicker started ({} cpm, {:?})",
                    cfg.clicks_per_minute, cfg.button
                );
                60.0 / cfg.clicks_per_minute as f64
            };
            while running.load(Ordering::SeqCst) {
                let cfg = config.lock().clone();
                let interval = if cfg.anti_detect && cfg.random_delay_percent > 0 {
                    let variation = base_interval * cfg.random_delay_percent as f64 / 100.0;
                    let lo = (base_interval - variation).max(MIN_INTERVAL_SECS);
                    let hi = base_interval + variation;
                    rand::thread_rng().gen_range(lo..=hi)
                } else {
                    base_interval
                };
                if let Err(e) = click_once(sink.as_ref(), &cfg) {
                    error!("Auto-clicker stopped: {e}");
                    break;
                }
                thread::sleep(Duration::from_secs_f64(interval));
            }
            running.store(false, Ordering::SeqCst);
            info!("Auto-clicker stopped");
        });
    }

    /// Request the loop to stop; observed once per click cycle.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn click_once(sink: &dyn InputSink, cfg: &ClickerConfig) -> Result<(), MacroError> {
    if cfg.anti_detect && cfg.micro_movement_radius > 0 {
        // Nudge the cursor off the spot and back before the click.
        let (x, y) = sink.cursor_position()?;
        let radius = cfg.micro_movement_radius as i32;
        let mut rng = rand::thread_rng();
        let dx = rng.gen_range(-radius..=radius) as f64;
        let dy = rng.gen_range(-radius..=radius) as f64;
        sink.mouse_move(x + dx, y + dy)?;
        thread::sleep(Duration::from_secs_f64(rng.gen_range(0.01..0.05)));
        sink.mouse_move(x, y)?;
    }
    sink.click(cfg.button)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingSink {
        clicks: AtomicUsize,
        last_button: Mutex<Option<MouseButton>>,
        fail: bool,
    }

    impl CountingSink {
        fn new(fail: bool) -> Self {
            Self {
                clicks: AtomicUsize::new(0),
                last_button: Mutex::new(None),
                fail,
            }
        }
    }

    impl InputSink for CountingSink {
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
        fn click(&self, button: MouseButton) -> Result<(), MacroError> {
            self.clicks.fetch_add(1, Ordering::SeqCst);
            *self.last_button.lock() = Some(button);
            if self.fail {
                Err(MacroError::Injection("device gone".into()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn settings_are_clamped() {
        let clicker = AutoClicker::new(Arc::new(CountingSink::new(false)));
        clicker.set_clicks_per_minute(0);
        assert_eq!(clicker.config().clicks_per_minute, 1);
        clicker.set_clicks_per_minute(50_000);
        assert_eq!(clicker.config().clicks_per_minute, 10_000);
        clicker.set_random_delay_percent(200);
        assert_eq!(clicker.config().random_delay_percent, 100);
        clicker.set_micro_movement_radius(30);
        assert_eq!(clicker.config().micro_movement_radius, 20);
    }

    #[test]
    fn clicks_until_stopped() {
        let sink = Arc::new(CountingSink::new(false));
        let clicker = AutoClicker::new(sink.clone());
        clicker.set_clicks_per_minute(6_000); // 10ms interval

        clicker.start();
        thread::sleep(Duration::from_millis(100));
        clicker.stop();
        thread::sleep(Duration::from_millis(50));

        let count = sink.clicks.load(Ordering::SeqCst);
        assert!(count >= 2, "only {count} clicks");
        assert!(!clicker.is_running());

        thread::sleep(Duration::from_millis(50));
        assert_eq!(sink.clicks.load(Ordering::SeqCst), count);
    }

    #[test]
    fn setting_changes_apply_mid_run() {
        let sink = Arc::new(CountingSink::new(false));
        let clicker = AutoClicker::new(sink.clone());
        clicker.set_clicks_per_minute(6_000); // 10ms interval

        clicker.start();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(*sink.last_button.lock(), Some(MouseButton::Left));

        clicker.set_button(MouseButton::Right);
        thread::sleep(Duration::from_millis(100));
        clicker.stop();

        assert_eq!(*sink.last_button.lock(), Some(MouseButton::Right));
    }

    #[test]
    fn injection_error_aborts_the_loop() {
        let sink = Arc::new(CountingSink::new(true));
        let clicker = AutoClicker::new(sink.clone());
        clicker.set_clicks_per_minute(10_000);

        clicker.start();
        thread::sleep(Duration::from_millis(100));

        assert!(!clicker.is_running());
        assert_eq!(sink.clicks.load(Ordering::SeqCst), 1);
    }
}
