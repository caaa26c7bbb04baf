use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::capture::TimerReader;
use crate::notify::KoSink;
use crate::observer::MatchEnd;

use super::state::{FreezeDecision, FreezeState, TickOutcome};
use super::MonitorConfig;

// Set to false to silence the per-freeze chatter.
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Tick-level driver around [`FreezeState`]: logs what the state machine
/// decided and hands knockouts to the sink.
pub struct FreezeMonitor {
    state: FreezeState,
    config: MonitorConfig,
    sink: Arc<dyn KoSink>,
}

impl FreezeMonitor {
    pub fn new(config: MonitorConfig, sink: Arc<dyn KoSink>) -> Self {
        Self {
            state: FreezeState::new(),
            config,
            sink,
        }
    }

    pub fn state(&self) -> &FreezeState {
        &self.state
    }

    pub fn into_state(self) -> FreezeState {
        self.state
    }

    pub fn tick(&mut self, sample: u32, now: DateTime<Utc>) -> TickOutcome {
        let outcome = self.state.observe(sample, now, &self.config);

        match &outcome {
            TickOutcome::Changed { previous_run } => {
                if *previous_run >= self.config.freeze_end_log_ticks {
                    log_info!("Freeze ended after {} ticks", previous_run);
                }
            }
            TickOutcome::Frozen { ticks } => self.log_progress(*ticks, sample),
            TickOutcome::Decided { ticks, decision } => {
                self.log_progress(*ticks, sample);
                self.apply(decision);
            }
        }

        outcome
    }

    pub fn match_end(&mut self, notice: &MatchEnd, now: DateTime<Utc>) {
        if self.state.note_match_end(now, self.config.match_end_quiet_ms) {
            log_info!("Match ended ({:?} on screen)", notice.marker);
        } else {
            log_debug!("Match-end banner {:?} right after a K.O., ignored", notice.marker);
        }
    }

    fn log_progress(&self, ticks: u32, sample: u32) {
        let every = self.config.progress_every_ticks;
        if every > 0 && ticks % every == 0 {
            let secs = ticks as f64 * self.config.tick_interval_ms as f64 / 1000.0;
            log_info!("Frozen: {} ticks ({:.1}s) at timer={}", ticks, secs, sample);
        }
    }

    fn apply(&self, decision: &FreezeDecision) {
        match decision {
            FreezeDecision::IntroSkip => {
                log_info!(
                    "Timer above {}: likely intro, skipping",
                    self.config.intro_cutoff
                );
            }
            FreezeDecision::Knockout(event) => {
                log_info!("K.O. detected ({}) at timer={}s", event.kind, event.timer_value);
                self.sink.notify(event);
            }
            FreezeDecision::CooldownActive { elapsed_ms } => {
                let elapsed = elapsed_ms.unwrap_or_default() as f64 / 1000.0;
                log_info!(
                    "Cooldown active ({:.1}s < {:.0}s)",
                    elapsed,
                    self.config.cooldown_ms as f64 / 1000.0
                );
            }
            FreezeDecision::DeadZone => {
                log_info!(
                    "Freeze below the health floor ({}) but not at zero, no K.O.",
                    self.config.health_floor
                );
            }
        }
    }
}

/// Wall-clock stamps derived from the runtime's monotonic clock, so a paused
/// test runtime sees time move exactly as the ticker does.
struct SessionClock {
    started: Instant,
    wall: DateTime<Utc>,
}

impl SessionClock {
    fn start() -> Self {
        Self {
            started: Instant::now(),
            wall: Utc::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + elapsed
    }
}

/// Samples the timer every `tick_interval_ms` until cancelled. Returns the
/// final state so the caller can report on the session.
pub async fn monitor_loop(
    timer: TimerReader,
    mut match_ends: mpsc::UnboundedReceiver<MatchEnd>,
    sink: Arc<dyn KoSink>,
    config: MonitorConfig,
    cancel_token: CancellationToken,
) -> FreezeState {
    let mut ticker = tokio::time::interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let clock = SessionClock::start();
    let mut monitor = FreezeMonitor::new(config, sink);
    let mut match_ends_open = true;

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("freeze monitor shutting down");
                break;
            }
            notice = match_ends.recv(), if match_ends_open => {
                match notice {
                    Some(notice) => monitor.match_end(&notice, clock.now()),
                    None => match_ends_open = false,
                }
            }
            _ = ticker.tick() => {
                monitor.tick(timer.current(), clock.now());
            }
        }
    }

    monitor.into_state()
}
