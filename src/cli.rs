use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "kowatch")]
#[command(about = "Detects knockouts from a fighting game's HUD timer and signals a LAN device")]
pub struct Args {
    /// Path to the JSON settings file
    #[arg(short, long, default_value = "kowatch.json")]
    pub settings: PathBuf,

    /// Device base address (overrides settings and KOWATCH_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Shared secret expected by the device (overrides settings and KOWATCH_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read host events and watch for knockouts (default)
    Watch {
        /// Read host events from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Send one `type=test` signal and report whether the device answered
    TestSignal,
    /// Write the settings file filled out with defaults (overrides are not saved)
    InitSettings,
}

impl Args {
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Watch { input: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_watching_stdin() {
        let args = Args::try_parse_from(["kowatch"]).unwrap();
        assert_eq!(args.settings, PathBuf::from("kowatch.json"));
        assert_eq!(args.command(), Command::Watch { input: None });
        assert!(!args.verbose);
    }

    #[test]
    fn parses_overrides_and_subcommands() {
        let args = Args::try_parse_from([
            "kowatch",
            "--endpoint",
            "http://10.0.0.2:8000",
            "--token",
            "abc",
            "-v",
            "watch",
            "--input",
            "session.jsonl",
        ])
        .unwrap();
        assert_eq!(args.endpoint.as_deref(), Some("http://10.0.0.2:8000"));
        assert!(args.verbose);
        assert_eq!(
            args.command(),
            Command::Watch {
                input: Some(PathBuf::from("session.jsonl"))
            }
        );

        let args = Args::try_parse_from(["kowatch", "test-signal"]).unwrap();
        assert_eq!(args.command(), Command::TestSignal);

        let args = Args::try_parse_from(["kowatch", "init-settings"]).unwrap();
        assert_eq!(args.command(), Command::InitSettings);
    }

    #[test]
    fn input_belongs_to_watch() {
        assert!(Args::try_parse_from(["kowatch", "--input", "session.jsonl"]).is_err());
        assert!(Args::try_parse_from(["kowatch", "watch", "-i", "session.jsonl"]).is_ok());
    }
}
