//! Host event feed: one JSON object per line.
//!
//! ```text
//! {"kind":"draw","text":"42","x":512.0,"y":60.0}
//! {"kind":"page","text":"Player 1 wins!"}
//! {"kind":"wait","ms":100}
//! ```
//! Draw events go through the capturing surface, page events to the
//! match-end observer. `wait` paces recorded sessions replayed from a file.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use crate::capture::TextSurface;
use crate::observer::MatchEndObserver;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HostEvent {
    Draw { text: String, x: f64, y: f64 },
    Page { text: String },
    Wait { ms: u64 },
}

/// Parses one feed line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<HostEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .with_context(|| format!("unrecognised host event: {line}"))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub draws: u64,
    pub pages: u64,
    pub skipped: u64,
}

/// Routes host events until the input ends or the token is cancelled.
///
/// Only a failing read ends the feed early; undecodable or unknown lines are
/// logged and counted in `skipped`.
pub async fn feed_loop<R, S>(
    mut reader: R,
    surface: &mut S,
    observer: &MatchEndObserver,
    cancel_token: CancellationToken,
) -> Result<FeedStats>
where
    R: AsyncBufRead + Unpin,
    S: TextSurface,
{
    let mut stats = FeedStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = tokio::select! {
            _ = cancel_token.cancelled() => break,
            read = reader.read_until(b'\n', &mut buf) => read.context("failed to read host events")?,
        };
        if read == 0 {
            log_info!("host feed closed");
            break;
        }

        let Ok(line) = std::str::from_utf8(&buf) else {
            log_warn!("skipping host event line that is not valid UTF-8 ({} bytes)", buf.len());
            stats.skipped += 1;
            continue;
        };

        match parse_line(line) {
            Ok(Some(HostEvent::Draw { text, x, y })) => {
                surface.fill_text(&text, x, y);
                stats.draws += 1;
            }
            Ok(Some(HostEvent::Page { text })) => {
                observer.observe(&text);
                stats.pages += 1;
            }
            Ok(Some(HostEvent::Wait { ms })) => {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
                }
            }
            Ok(None) => {}
            Err(err) => {
                log_warn!("{err:#}");
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}
