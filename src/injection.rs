//! Input injection
//!
//! Everything the controller does to the desktop goes through [`InputSink`].
//! The sink is chosen once at startup: [`EnigoSink`] drives the real pointer
//! and keyboard, [`TracingSink`] only logs (dry run).

use std::sync::Arc;
use tracing::{debug, info};

/// Mouse button for a click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// Fire-and-forget desktop input
///
/// Implementations log their own failures; a missed event is never fatal to
/// the frame loop.
pub trait InputSink {
    /// Move the pointer by a relative offset in pixels
    fn move_relative(&self, dx: i32, dy: i32);

    /// Click, optionally after moving to an absolute position
    fn click(&self, button: MouseButton, at: Option<(i32, i32)>);

    /// Type text at the current focus
    fn type_text(&self, text: &str);

    fn double_click(&self) {
        self.click(MouseButton::Left, None);
        self.click(MouseButton::Left, None);
    }
}

impl<T: InputSink + ?Sized> InputSink for Arc<T> {
    fn move_relative(&self, dx: i32, dy: i32) {
        (**self).move_relative(dx, dy)
    }

    fn click(&self, button: MouseButton, at: Option<(i32, i32)>) {
        (**self).click(button, at)
    }

    fn type_text(&self, text: &str) {
        (**self).type_text(text)
    }

    fn double_click(&self) {
        (**self).double_click()
    }
}

impl<T: InputSink + ?Sized> InputSink for Box<T> {
    fn move_relative(&self, dx: i32, dy: i32) {
        (**self).move_relative(dx, dy)
    }

    fn click(&self, button: MouseButton, at: Option<(i32, i32)>) {
        (**self).click(button, at)
    }

    fn type_text(&self, text: &str) {
        (**self).type_text(text)
    }

    fn double_click(&self) {
        (**self).double_click()
    }
}

/// Logs every event instead of injecting it
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl InputSink for TracingSink {
    fn move_relative(&self, dx: i32, dy: i32) {
        debug!("[dry-run] move ({}, {})", dx, dy);
    }

    fn click(&self, button: MouseButton, at: Option<(i32, i32)>) {
        info!("[dry-run] {:?} click at {:?}", button, at);
    }

    fn type_text(&self, text: &str) {
        info!("[dry-run] type {} characters: {:?}", text.chars().count(), text);
    }
}

#[cfg(feature = "desktop")]
pub use desktop::EnigoSink;

#[cfg(feature = "desktop")]
mod desktop {
    use super::{InputSink, MouseButton};
    use enigo::{Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};
    use parking_lot::Mutex;
    use std::thread;
    use std::time::Duration;
    use tracing::{debug, warn};

    /// OS input via enigo
    pub struct EnigoSink {
        enigo: Mutex<Enigo>,
        keystroke_delay: Duration,
    }

    impl EnigoSink {
        pub fn new(keystroke_delay_ms: u64) -> anyhow::Result<Self> {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| anyhow::anyhow!("Failed to initialise enigo: {}", e))?;
            Ok(Self {
                enigo: Mutex::new(enigo),
                keystroke_delay: Duration::from_millis(keystroke_delay_ms),
            })
        }
    }

    impl InputSink for EnigoSink {
        fn move_relative(&self, dx: i32, dy: i32) {
            if dx == 0 && dy == 0 {
                return;
            }
            if let Err(e) = self.enigo.lock().move_mouse(dx, dy, Coordinate::Rel) {
                warn!("Pointer move failed: {}", e);
            }
        }

        fn click(&self, button: MouseButton, at: Option<(i32, i32)>) {
            let mut enigo = self.enigo.lock();
            if let Some((x, y)) = at {
                if let Err(e) = enigo.move_mouse(x, y, Coordinate::Abs) {
                    warn!("Pointer move before click failed: {}", e);
                }
            }
            let button = match button {
                MouseButton::Left => Button::Left,
                MouseButton::Right => Button::Right,
            };
            if let Err(e) = enigo.button(button, Direction::Click) {
                warn!("Click failed: {}", e);
            }
        }

        fn type_text(&self, text: &str) {
            if text.is_empty() {
                debug!("Empty text provided, nothing to type");
                return;
            }

            let mut enigo = self.enigo.lock();
            if self.keystroke_delay.is_zero() {
                if let Err(e) = enigo.text(text) {
                    warn!("Text insertion failed: {}", e);
                }
            } else {
                for c in text.chars() {
                    if let Err(e) = enigo.text(&c.to_string()) {
                        warn!("Failed to type character '{}': {}", c, e);
                    }
                    thread::sleep(self.keystroke_delay);
                }
            }
            debug!("Typed {} characters via enigo", text.chars().count());
        }
    }
}
