use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MonitorConfig;

/// The timer value a time-out knockout freezes on.
pub const TIMEUP_VALUE: u32 = 0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MonitorPhase {
    Running,
    Freezing,
    Triggered,
}

impl Default for MonitorPhase {
    fn default() -> Self {
        MonitorPhase::Running
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum KoKind {
    Health,
    Timeup,
}

impl KoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KoKind::Health => "health",
            KoKind::Timeup => "timeup",
        }
    }
}

impl fmt::Display for KoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A knockout inferred from a timer freeze. Handed to the notifier and dropped.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KoEvent {
    pub kind: KoKind,
    pub timer_value: u32,
    pub timestamp: DateTime<Utc>,
}

/// What the monitor concluded when a freeze reached the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreezeDecision {
    /// Value above the intro cutoff: pre-round or menu screen.
    IntroSkip,
    Knockout(KoEvent),
    /// A knockout-shaped freeze inside the cooldown window.
    CooldownActive { elapsed_ms: Option<i64> },
    /// Values between the timeup value and the health floor never trigger.
    DeadZone,
}

/// Result of feeding one sample to [`FreezeState::observe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The value moved; `previous_run` is how long the freeze before it lasted.
    Changed { previous_run: u32 },
    Frozen { ticks: u32 },
    Decided { ticks: u32, decision: FreezeDecision },
}

impl TickOutcome {
    pub fn knockout(&self) -> Option<&KoEvent> {
        match self {
            TickOutcome::Decided {
                decision: FreezeDecision::Knockout(event),
                ..
            } => Some(event),
            _ => None,
        }
    }
}

/// Classifies a freeze that just reached the threshold.
pub fn classify(
    value: u32,
    now: DateTime<Utc>,
    last_ko_at: Option<DateTime<Utc>>,
    config: &MonitorConfig,
) -> FreezeDecision {
    if value > config.intro_cutoff {
        return FreezeDecision::IntroSkip;
    }

    let elapsed_ms = last_ko_at.map(|at| (now - at).num_milliseconds());
    let cooled = elapsed_ms.map_or(true, |ms| ms > config.cooldown_ms as i64);

    let kind = if value >= config.health_floor {
        KoKind::Health
    } else if value == TIMEUP_VALUE {
        KoKind::Timeup
    } else {
        return FreezeDecision::DeadZone;
    };

    if !cooled {
        return FreezeDecision::CooldownActive { elapsed_ms };
    }

    FreezeDecision::Knockout(KoEvent {
        kind,
        timer_value: value,
        timestamp: now,
    })
}

/// Serializable view of the monitor, published after every tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub phase: MonitorPhase,
    pub timer: Option<u32>,
    pub freeze_ticks: u32,
    pub ko_triggered: bool,
    pub last_ko_at: Option<DateTime<Utc>>,
    pub ko_count: u64,
}

/// Freeze/knockout state machine. Owned by the monitor task and advanced
/// once per tick.
#[derive(Debug, Clone, Default)]
pub struct FreezeState {
    /// `None` until the first tick, so the first sample always counts as a change.
    pub last_value: Option<u32>,
    pub freeze_ticks: u32,
    pub ko_triggered: bool,
    /// `None` means the cooldown is clear.
    pub last_ko_at: Option<DateTime<Utc>>,
    pub ko_count: u64,
}

impl FreezeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(
        &mut self,
        sample: u32,
        now: DateTime<Utc>,
        config: &MonitorConfig,
    ) -> TickOutcome {
        let outcome = if self.last_value == Some(sample) {
            self.freeze_ticks = self.freeze_ticks.saturating_add(1);
            let ticks = self.freeze_ticks;

            if ticks == config.freeze_threshold && !self.ko_triggered {
                let decision = classify(sample, now, self.last_ko_at, config);
                if let FreezeDecision::Knockout(event) = &decision {
                    self.ko_triggered = true;
                    self.last_ko_at = Some(event.timestamp);
                    self.ko_count += 1;
                }
                TickOutcome::Decided { ticks, decision }
            } else {
                TickOutcome::Frozen { ticks }
            }
        } else {
            let previous_run = self.freeze_ticks;
            self.freeze_ticks = 0;
            self.ko_triggered = false;
            TickOutcome::Changed { previous_run }
        };

        self.last_value = Some(sample);
        outcome
    }

    /// Applies a match-end banner. Returns whether it was accepted, in which
    /// case it restarts the cooldown window.
    pub fn note_match_end(&mut self, now: DateTime<Utc>, quiet_ms: u64) -> bool {
        let quiet = self
            .last_ko_at
            .map_or(true, |at| (now - at).num_milliseconds() > quiet_ms as i64);
        if quiet {
            self.last_ko_at = Some(now);
        }
        quiet
    }

    pub fn phase(&self) -> MonitorPhase {
        if self.ko_triggered {
            MonitorPhase::Triggered
        } else if self.freeze_ticks > 0 {
            MonitorPhase::Freezing
        } else {
            MonitorPhase::Running
        }
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            phase: self.phase(),
            timer: self.last_value,
            freeze_ticks: self.freeze_ticks,
            ko_triggered: self.ko_triggered,
            last_ko_at: self.last_ko_at,
            ko_count: self.ko_count,
        }
    }
}
