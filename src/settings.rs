use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::capture::HudRegion;
use crate::monitor::MonitorConfig;
use crate::observer::default_markers;

pub const ENDPOINT_ENV: &str = "KOWATCH_ENDPOINT";
pub const TOKEN_ENV: &str = "KOWATCH_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base address of the device, e.g. `http://192.168.1.20:8000`.
    pub endpoint: Option<String>,
    /// Shared secret the device checks on every signal.
    pub token: Option<String>,
    pub request_timeout_ms: u64,
    pub hud: HudRegion,
    pub monitor: MonitorConfig,
    pub match_end_markers: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            request_timeout_ms: 2_000,
            hud: HudRegion::default(),
            monitor: MonitorConfig::default(),
            match_end_markers: default_markers(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.hud.validate()?;
        self.monitor.validate()?;
        Ok(())
    }

    /// Environment wins over the file; empty values count as unset.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(TOKEN_ENV).ok(),
        );
    }

    pub fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|v| !v.trim().is_empty()) {
            self.endpoint = Some(endpoint.trim().to_string());
        }
        if let Some(token) = token.filter(|v| !v.is_empty()) {
            self.token = Some(token);
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: Settings,
}

impl SettingsStore {
    /// Loads `path`, falling back to defaults when it is missing or unreadable JSON.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring malformed settings in {} ({err}); using defaults",
                    path.display()
                );
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data,
        })
    }

    pub fn settings(&self) -> Settings {
        self.data.clone()
    }

    /// Writes the file-backed settings, filled out with defaults. Environment
    /// and command-line overrides are applied to copies and never land here.
    pub fn save(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("kowatch.json")).unwrap();
        let settings = store.settings();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.match_end_markers, vec!["REMATCH", "wins!"]);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_file_is_merged_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kowatch.json");
        fs::write(
            &path,
            r#"{
                "endpoint": "http://172.26.53.118:8000",
                "token": "change-me",
                "hud": { "max_y": 120.0 },
                "monitor": { "cooldown_ms": 6000 }
            }"#,
        )
        .unwrap();

        let settings = SettingsStore::new(path).unwrap().settings();
        assert_eq!(settings.endpoint.as_deref(), Some("http://172.26.53.118:8000"));
        assert_eq!(settings.hud.max_y, 120.0);
        assert_eq!(settings.hud.max_x, 800.0);
        assert_eq!(settings.monitor.cooldown_ms, 6000);
        assert_eq!(settings.monitor.freeze_threshold, 30);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kowatch.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.settings(), Settings::default());
    }

    #[test]
    fn save_writes_a_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kowatch.json");
        fs::write(&path, r#"{ "monitor": { "freeze_threshold": 25 } }"#).unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        store.save().unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["monitor"]["freeze_threshold"], 25);
        assert_eq!(written["monitor"]["cooldown_ms"], 8000);
        assert_eq!(written["hud"]["max_x"], 800.0);

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.settings(), store.settings());
    }

    #[test]
    fn save_never_persists_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kowatch.json");
        fs::write(&path, r#"{ "endpoint": "http://10.0.0.7:8000" }"#).unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        let mut effective = store.settings();
        effective.apply_overrides(Some("http://10.0.0.9:8000".into()), Some("s3cret".into()));
        assert_eq!(effective.token.as_deref(), Some("s3cret"));

        store.save().unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains("s3cret"));
        assert!(written.contains("http://10.0.0.7:8000"));
    }

    #[test]
    fn overrides_skip_blank_values() {
        let mut settings = Settings {
            endpoint: Some("http://a:1".into()),
            token: Some("t".into()),
            ..Settings::default()
        };
        settings.apply_overrides(Some("  ".into()), Some(String::new()));
        assert_eq!(settings.endpoint.as_deref(), Some("http://a:1"));
        assert_eq!(settings.token.as_deref(), Some("t"));

        settings.apply_overrides(Some(" http://b:2 ".into()), Some("u".into()));
        assert_eq!(settings.endpoint.as_deref(), Some("http://b:2"));
        assert_eq!(settings.token.as_deref(), Some("u"));
    }
}
