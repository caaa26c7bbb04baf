use tokio::sync::watch;

use super::region::HudRegion;

// Runs on every draw call: debug-level output only.
const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// A text-draw primitive: `fillText(text, x, y)` on the game's surface.
pub trait TextSurface {
    type Output;

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Self::Output;
}

impl<F, R> TextSurface for F
where
    F: FnMut(&str, f64, f64) -> R,
{
    type Output = R;

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> R {
        self(text, x, y)
    }
}

/// Writer side of the shared timer value.
///
/// There is exactly one of these per session; cloning is not offered so the
/// single-writer rule holds by construction.
#[derive(Debug)]
pub struct TimerCapture {
    region: HudRegion,
    sample: watch::Sender<u32>,
}

/// Reader side of the shared timer value, handed to the monitor.
#[derive(Debug, Clone)]
pub struct TimerReader {
    sample: watch::Receiver<u32>,
}

impl TimerCapture {
    /// Creates the shared sample (starting at 0) and its reader.
    pub fn new(region: HudRegion) -> (Self, TimerReader) {
        let (tx, rx) = watch::channel(0);
        (Self { region, sample: tx }, TimerReader { sample: rx })
    }

    /// Applies the HUD heuristic and publishes the value on a match.
    pub fn inspect(&self, text: &str, x: f64, y: f64) -> Option<u32> {
        let value = self.region.matches(text, x, y)?;
        let previous = self.sample.send_replace(value);
        if previous != value {
            log_debug!("timer {} -> {} (draw at {:.0},{:.0})", previous, value, x, y);
        }
        Some(value)
    }

    /// Wraps a draw primitive so every call is inspected before it runs.
    pub fn wrap<S: TextSurface>(self, surface: S) -> CapturingSurface<S> {
        CapturingSurface {
            inner: surface,
            capture: self,
        }
    }
}

impl TimerReader {
    pub fn current(&self) -> u32 {
        *self.sample.borrow()
    }
}

/// Decorator that forwards draws unchanged while feeding the timer capture.
pub struct CapturingSurface<S> {
    inner: S,
    capture: TimerCapture,
}

impl<S: TextSurface> TextSurface for CapturingSurface<S> {
    type Output = S::Output;

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> S::Output {
        self.capture.inspect(text, x, y);
        self.inner.fill_text(text, x, y)
    }
}
