use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Where on screen the countdown is drawn, and what it looks like.
///
/// The defaults fit one game's HUD layout; other layouts override them in
/// the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HudRegion {
    /// Draws at or below this y (pixels from the top) are not the timer.
    pub max_y: f64,
    /// Exclusive left edge of the central band.
    pub min_x: f64,
    /// Exclusive right edge of the central band.
    pub max_x: f64,
    /// Longest digit run accepted as a timer value.
    pub max_digits: usize,
}

impl Default for HudRegion {
    fn default() -> Self {
        Self {
            max_y: 150.0,
            min_x: 200.0,
            max_x: 800.0,
            max_digits: 2,
        }
    }
}

impl HudRegion {
    pub fn validate(&self) -> Result<()> {
        if self.max_digits == 0 {
            bail!("hud.max_digits must be at least 1");
        }
        if self.max_digits > 9 {
            bail!("hud.max_digits must be at most 9, got {}", self.max_digits);
        }
        if self.min_x >= self.max_x {
            bail!(
                "hud band is empty: min_x ({}) must be below max_x ({})",
                self.min_x,
                self.max_x
            );
        }
        Ok(())
    }

    /// Returns the timer value if this draw call looks like the HUD countdown.
    pub fn matches(&self, text: &str, x: f64, y: f64) -> Option<u32> {
        if !(y < self.max_y && x > self.min_x && x < self.max_x) {
            return None;
        }
        if !is_digit_run(text, self.max_digits) {
            return None;
        }
        text.parse().ok()
    }
}

fn is_digit_run(text: &str, max_digits: usize) -> bool {
    let len = text.len();
    (1..=max_digits).contains(&len) && text.bytes().all(|b| b.is_ascii_digit())
}
