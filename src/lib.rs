pub mod capture;
pub mod cli;
pub mod feed;
pub mod monitor;
pub mod notify;
pub mod observer;
pub mod settings;
pub mod utils;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tokio::io::BufReader;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use capture::TimerCapture;
use cli::{Args, Command};
use feed::{feed_loop, FeedStats};
use monitor::MonitorController;
use notify::HttpNotifier;
use observer::MatchEndObserver;
use settings::{Settings, SettingsStore};

const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

pub fn run() -> Result<()> {
    let args = Args::parse();

    utils::logging::init(if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });

    info!("kowatch starting up...");

    let store = SettingsStore::new(args.settings.clone())?;
    let mut settings = store.settings();
    settings.apply_env();
    settings.apply_overrides(args.endpoint.clone(), args.token.clone());
    settings.validate().context("invalid settings")?;

    // Everything runs on one thread: the draw hook and the monitor tick never overlap.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;

    match args.command() {
        Command::InitSettings => {
            store.save()?;
            info!("Settings written to {}", args.settings.display());
            Ok(())
        }
        Command::TestSignal => runtime.block_on(async move {
            let notifier = HttpNotifier::from_settings(&settings)?;
            notifier.send_test().await
        }),
        Command::Watch { input } => {
            let result = runtime.block_on(watch(settings, input));
            shut_down(runtime);
            result
        }
    }
}

/// Stdin reads run on a blocking thread that cannot be cancelled; dropping
/// the runtime would wait on it until the next line arrives.
fn shut_down(runtime: Runtime) {
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
}

/// One watching session: capture and observer fed from the host, monitor
/// ticking on its own task, until the feed ends or Ctrl-C.
async fn watch(settings: Settings, input: Option<PathBuf>) -> Result<()> {
    let notifier = Arc::new(HttpNotifier::from_settings(&settings)?);
    if !notifier.is_configured() {
        warn!("No endpoint/token configured: knockouts will be logged but not signalled");
    }

    let (capture, timer) = TimerCapture::new(settings.hud.clone());
    let (observer, match_ends) = MatchEndObserver::new(settings.match_end_markers.clone());

    let mut controller = MonitorController::new();
    controller.start(timer, match_ends, notifier, settings.monitor.clone())?;

    // The host has already painted the frame; the hook only observes.
    let mut surface = capture.wrap(|_: &str, _: f64, _: f64| ());

    let cancel_token = CancellationToken::new();
    tokio::spawn({
        let cancel_token = cancel_token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, stopping");
                cancel_token.cancel();
            }
        }
    });

    let fed = match &input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open host events {}", path.display()));
            match file {
                Ok(file) => {
                    feed_loop(BufReader::new(file), &mut surface, &observer, cancel_token.clone())
                        .await
                }
                Err(err) => Err(err),
            }
        }
        None => {
            feed_loop(
                BufReader::new(tokio::io::stdin()),
                &mut surface,
                &observer,
                cancel_token.clone(),
            )
            .await
        }
    };

    // Stop the monitor even when the feed failed.
    let last = controller.stop().await?;
    let stats: FeedStats = fed?;

    if let Some(last) = last {
        info!(
            "Session over: {} K.O.(s) detected; {} draws, {} page updates, {} skipped lines",
            last.ko_count, stats.draws, stats.pages, stats.skipped
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn shutdown_does_not_wait_for_a_stuck_blocking_read() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            // Stands in for stdin waiting on a line that never comes.
            tokio::task::spawn_blocking(|| std::thread::sleep(std::time::Duration::from_secs(30)));
            tokio::task::yield_now().await;
        });

        let started = Instant::now();
        shut_down(runtime);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }
}
