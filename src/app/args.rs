use std::path::PathBuf;
use std::time::Duration;
use clap::Parser;

use crate::config::types::ScanConfig;

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(about = "Repeatedly scans for nearby bluetooth peripherals and lists what it finds.", long_about = None)]
pub struct Args {
    /// Read the config from this file instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// How long each scan stays open, e.g. "5s" (overrides the config file)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub window: Option<Duration>,

    /// How often a new scan is attempted, e.g. "30s" (overrides the config file)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub period: Option<Duration>,

    /// Exit after the first scan session ends
    #[arg(long)]
    pub once: bool,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn apply_overrides(&self, config: &mut ScanConfig) {
        if let Some(window) = self.window {
            config.scan_window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        }
        if let Some(period) = self.period {
            config.scan_period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_override_config() {
        let args = Args::parse_from(["peripheral-scout", "--window", "8s", "--period", "1m", "--once"]);
        let mut config = ScanConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.scan_window_ms, 8000);
        assert_eq!(config.scan_period_ms, 60_000);
        assert!(args.once);
    }

    #[test]
    fn no_flags_keep_config() {
        let args = Args::parse_from(["peripheral-scout"]);
        let mut config = ScanConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config, ScanConfig::default());
    }
}
