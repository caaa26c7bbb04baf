use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::TimerReader;
use crate::notify::KoSink;
use crate::observer::MatchEnd;

use super::loop_worker::monitor_loop;
use super::state::{FreezeState, MonitorSnapshot};
use super::MonitorConfig;

/// Owns the monitor task for one session.
pub struct MonitorController {
    handle: Option<JoinHandle<FreezeState>>,
    cancel_token: Option<CancellationToken>,
}

impl MonitorController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(
        &mut self,
        timer: TimerReader,
        match_ends: mpsc::UnboundedReceiver<MatchEnd>,
        sink: Arc<dyn KoSink>,
        config: MonitorConfig,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("freeze monitor already active");
        }
        config.validate()?;

        info!(
            "Starting freeze monitor: {}ms ticks, K.O. after {} frozen ticks, {}ms cooldown",
            config.tick_interval_ms, config.freeze_threshold, config.cooldown_ms
        );

        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(monitor_loop(
            timer,
            match_ends,
            sink,
            config,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancels the task and returns its final state, if one was running.
    pub async fn stop(&mut self) -> Result<Option<MonitorSnapshot>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };
        let state = handle
            .await
            .context("freeze monitor task failed to join")?;
        Ok(Some(state.snapshot()))
    }
}

impl Default for MonitorController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{HudRegion, TimerCapture};
    use crate::monitor::MonitorPhase;
    use crate::notify::testing::RecordingSink;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn start_twice_is_rejected_and_stop_reports_final_state() {
        let (capture, reader) = TimerCapture::new(HudRegion::default());
        let sink = Arc::new(RecordingSink::default());
        let mut controller = MonitorController::new();

        let (_tx, rx) = mpsc::unbounded_channel();
        controller
            .start(reader.clone(), rx, sink.clone(), MonitorConfig::default())
            .unwrap();
        assert!(controller.is_running());

        let (_tx2, rx2) = mpsc::unbounded_channel();
        assert!(controller
            .start(reader, rx2, sink.clone(), MonitorConfig::default())
            .is_err());

        capture.inspect("64", 500.0, 30.0);
        tokio::time::sleep(Duration::from_millis(1_050)).await;

        let last = controller.stop().await.unwrap().unwrap();
        assert!(!controller.is_running());
        assert_eq!(last.phase, MonitorPhase::Freezing);
        assert_eq!(last.timer, Some(64));
        assert!(last.freeze_ticks >= 9);
        assert!(sink.events().is_empty());

        assert!(controller.stop().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_config_does_not_start() {
        let (_capture, reader) = TimerCapture::new(HudRegion::default());
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut controller = MonitorController::new();
        let config = MonitorConfig {
            tick_interval_ms: 0,
            ..MonitorConfig::default()
        };
        assert!(controller
            .start(reader, rx, Arc::new(RecordingSink::default()), config)
            .is_err());
        assert!(!controller.is_running());
    }
}
