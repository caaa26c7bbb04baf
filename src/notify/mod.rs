//! Outbound knockout signal to the LAN device.
//!
//! Every signal is a single GET to `{endpoint}/ko` carrying the shared token,
//! the knockout kind and the frozen timer value. Knockout signals are
//! fire-and-forget: delivery runs on its own task, the outcome is only
//! logged, and nothing is retried or queued.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use reqwest::{Client, Url};

use crate::monitor::KoEvent;
use crate::settings::Settings;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Kind sent by the manual connectivity check.
pub const TEST_KIND: &str = "test";
/// Timer value sent by the manual connectivity check.
pub const TEST_TIMER: u32 = 99;

/// Receives knockouts from the monitor. Must not block the tick.
pub trait KoSink: Send + Sync {
    fn notify(&self, event: &KoEvent);
}

/// Builds the signal URL: `{endpoint}/ko?token=..&type=..&timer=..&t=..`.
///
/// `t` is a millisecond cache-buster so intermediaries never serve a stale hit.
pub fn signal_url(endpoint: &str, token: &str, kind: &str, timer: u32, stamp_ms: i64) -> Result<Url> {
    let base = endpoint.trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/ko"))
        .with_context(|| format!("invalid signal endpoint {endpoint:?}"))?;
    if url.cannot_be_a_base() {
        bail!("signal endpoint {endpoint:?} is not an http(s) address");
    }

    url.query_pairs_mut()
        .append_pair("token", token)
        .append_pair("type", kind)
        .append_pair("timer", &timer.to_string())
        .append_pair("t", &stamp_ms.to_string());
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: Client,
    endpoint: Option<String>,
    token: Option<String>,
}

impl HttpNotifier {
    pub fn new(endpoint: Option<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        // The device sits on the LAN; system proxies would only get in the way.
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.endpoint.clone(),
            settings.token.clone(),
            Duration::from_millis(settings.request_timeout_ms),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.token.is_some()
    }

    fn target(&self, kind: &str, timer: u32, stamp_ms: i64) -> Option<Url> {
        let (Some(endpoint), Some(token)) = (self.endpoint.as_deref(), self.token.as_deref()) else {
            log_warn!("No endpoint/token configured; {} signal @ {}s not sent", kind, timer);
            return None;
        };

        match signal_url(endpoint, token, kind, timer, stamp_ms) {
            Ok(url) => Some(url),
            Err(err) => {
                log_warn!("{err:#}; {} signal @ {}s not sent", kind, timer);
                None
            }
        }
    }

    /// Sends the connectivity check and waits for the answer.
    pub async fn send_test(&self) -> Result<()> {
        let Some(url) = self.target(TEST_KIND, TEST_TIMER, Utc::now().timestamp_millis()) else {
            bail!("signal endpoint and token must both be configured");
        };
        deliver(&self.client, url).await?;
        log_info!("Sent to device: {} @ {}s", TEST_KIND, TEST_TIMER);
        Ok(())
    }
}

impl KoSink for HttpNotifier {
    fn notify(&self, event: &KoEvent) {
        let kind = event.kind;
        let timer = event.timer_value;
        let Some(url) = self.target(kind.as_str(), timer, event.timestamp.timestamp_millis()) else {
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log_warn!("No async runtime available; {} signal @ {}s dropped", kind, timer);
            return;
        };

        let client = self.client.clone();
        runtime.spawn(async move {
            match deliver(&client, url).await {
                Ok(()) => log_info!("Sent to device: {} @ {}s", kind, timer),
                Err(err) => log_warn!("Could not reach device (blocked/unreachable): {err:#}"),
            }
        });
    }
}

async fn deliver(client: &Client, url: Url) -> Result<()> {
    // Errors would otherwise echo the URL, token included.
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| err.without_url())
        .context("signal request failed")?;

    let status = response.status();
    if !status.is_success() {
        bail!("device answered {status}");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::KoSink;
    use crate::monitor::KoEvent;

    /// Collects knockouts instead of sending them.
    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<KoEvent>>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<KoEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl KoSink for RecordingSink {
        fn notify(&self, event: &KoEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
