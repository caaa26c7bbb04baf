use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Tunable thresholds for the freeze monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Sampling period of the monitor tick.
    pub tick_interval_ms: u64,

    /// Identical consecutive samples needed before a freeze is classified.
    /// 30 ticks at 100ms is three seconds.
    pub freeze_threshold: u32,

    /// Minimum gap between two accepted knockouts.
    pub cooldown_ms: u64,

    /// Freezes above this value are intro/menu screens.
    pub intro_cutoff: u32,

    /// Lowest timer value that counts as a health knockout. Values between
    /// zero and this floor never trigger.
    pub health_floor: u32,

    /// A match-end banner only counts if the last KO is older than this.
    pub match_end_quiet_ms: u64,

    /// Progress log cadence while frozen.
    pub progress_every_ticks: u32,
    /// Freezes shorter than this end without a log line.
    pub freeze_end_log_ticks: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            freeze_threshold: 30,
            cooldown_ms: 8_000,
            intro_cutoff: 85,
            health_floor: 3,
            match_end_quiet_ms: 3_000,
            progress_every_ticks: 10,
            freeze_end_log_ticks: 5,
        }
    }
}

impl MonitorConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("monitor.tick_interval_ms must be greater than zero");
        }
        if self.freeze_threshold == 0 {
            bail!("monitor.freeze_threshold must be greater than zero");
        }
        if self.health_floor == 0 {
            bail!("monitor.health_floor must be at least 1 so it stays clear of the timeup value");
        }
        if self.health_floor > self.intro_cutoff {
            bail!(
                "monitor.health_floor ({}) must not exceed monitor.intro_cutoff ({})",
                self.health_floor,
                self.intro_cutoff
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MonitorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
    }

    #[test]
    fn rejects_inverted_ranges() {
        let config = MonitorConfig {
            health_floor: 90,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MonitorConfig {
            health_floor: 0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MonitorConfig {
            freeze_threshold: 0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: MonitorConfig = serde_json::from_str(r#"{"cooldown_ms": 5000}"#).unwrap();
        assert_eq!(config.cooldown_ms, 5000);
        assert_eq!(config.freeze_threshold, 30);
    }
}
