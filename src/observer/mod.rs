//! Match-end detection from page text.
//!
//! The game announces the end of a match in regular page markup rather than
//! on the canvas. Spotting it lets the monitor restart its cooldown, so the
//! "Ready..." freeze that follows is not counted as another knockout.

use tokio::sync::mpsc;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

pub const DEFAULT_MARKERS: [&str; 2] = ["REMATCH", "wins!"];

/// A match-end banner seen on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEnd {
    pub marker: String,
}

pub struct MatchEndObserver {
    markers: Vec<String>,
    tx: mpsc::UnboundedSender<MatchEnd>,
}

impl MatchEndObserver {
    pub fn new(markers: Vec<String>) -> (Self, mpsc::UnboundedReceiver<MatchEnd>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { markers, tx }, rx)
    }

    /// Scans a page-text snapshot. Returns whether a match-end notice was sent.
    pub fn observe(&self, page_text: &str) -> bool {
        let Some(marker) = self
            .markers
            .iter()
            .find(|marker| !marker.is_empty() && page_text.contains(marker.as_str()))
        else {
            return false;
        };

        log_debug!("match-end marker {:?} found in page text", marker);
        self.tx
            .send(MatchEnd {
                marker: marker.clone(),
            })
            .is_ok()
    }
}

pub fn default_markers() -> Vec<String> {
    DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_either_marker() {
        let (observer, mut rx) = MatchEndObserver::new(default_markers());
        assert!(observer.observe("ROUND 3\nPlayer 2 wins!\nMenu"));
        assert!(observer.observe("REMATCH?  YES / NO"));
        assert_eq!(rx.try_recv().unwrap().marker, "wins!");
        assert_eq!(rx.try_recv().unwrap().marker, "REMATCH");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn ignores_unrelated_and_case_mismatched_text() {
        let (observer, mut rx) = MatchEndObserver::new(default_markers());
        assert!(!observer.observe("rematch"));
        assert!(!observer.observe("FIGHT!"));
        assert!(!observer.observe(""));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn empty_markers_never_match() {
        let (observer, _rx) = MatchEndObserver::new(vec![String::new()]);
        assert!(!observer.observe("anything"));
    }

    #[test]
    fn closed_monitor_is_reported() {
        let (observer, rx) = MatchEndObserver::new(default_markers());
        drop(rx);
        assert!(!observer.observe("Player 1 wins!"));
    }
}
