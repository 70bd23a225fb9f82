//! CLI arguments and sweeper configuration defaults.

use chrono::TimeDelta;
use clap::Parser;
use shadow_rs::formatcp;
use std::io;
use std::time::Duration;

use crate::build;
use crate::sweep::SweepSettings;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

pub const DEFAULT_DATA_FILE: &str = ".sweep/users.json";
pub const DEFAULT_COLLECTION: &str = "artgen_users";
pub const DEFAULT_STALENESS_SECS: u64 = 60;
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_COMMIT_RETRIES: u32 = 0;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// CLI arguments and environment configuration for the sweeper.
#[derive(Parser, Debug)]
#[command(name = "presence-sweep", version = VERSION_INFO, about = "Marks stale users inactive")]
pub struct Args {
    #[arg(
        short = 'd',
        long,
        env = "SWEEP_DATA_FILE",
        default_value = DEFAULT_DATA_FILE,
        help = "JSON document store file"
    )]
    pub data_file: String,
    #[arg(
        short = 'c',
        long,
        env = "SWEEP_COLLECTION",
        default_value = DEFAULT_COLLECTION,
        help = "Collection holding user records"
    )]
    pub collection: String,
    #[arg(
        long,
        env = "SWEEP_STALENESS_SECS",
        default_value_t = DEFAULT_STALENESS_SECS,
        help = "Age in seconds after which a user is inactive"
    )]
    pub staleness_secs: u64,
    #[arg(
        long,
        env = "SWEEP_INTERVAL_SECS",
        default_value_t = DEFAULT_INTERVAL_SECS,
        help = "Seconds between sweeps"
    )]
    pub interval_secs: u64,
    #[arg(
        long,
        env = "SWEEP_COMMIT_RETRIES",
        default_value_t = DEFAULT_COMMIT_RETRIES,
        help = "Extra batch commit attempts after a transient failure"
    )]
    pub commit_retries: u32,
    #[arg(
        long,
        env = "SWEEP_RETRY_DELAY_MS",
        default_value_t = DEFAULT_RETRY_DELAY_MS,
        help = "Delay between commit attempts in milliseconds"
    )]
    pub retry_delay_ms: u64,
    #[arg(long, env = "SWEEP_ONCE", help = "Run a single sweep and exit")]
    pub once: bool,
}

impl Args {
    pub fn sweep_settings(&self) -> io::Result<SweepSettings> {
        if self.interval_secs == 0 {
            return Err(invalid_input("interval must be at least one second"));
        }
        let staleness = i64::try_from(self.staleness_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| invalid_input("staleness is out of range"))?;

        Ok(SweepSettings {
            collection: self.collection.clone(),
            staleness,
            interval: Duration::from_secs(self.interval_secs),
            commit_retries: self.commit_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        })
    }
}

fn invalid_input(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_flags_become_settings() {
        let args = Args::try_parse_from([
            "presence-sweep",
            "--collection",
            "players",
            "--staleness-secs",
            "300",
            "--interval-secs",
            "30",
            "--commit-retries",
            "2",
            "--retry-delay-ms",
            "250",
        ])
        .expect("parse args");

        let settings = args.sweep_settings().expect("settings");
        assert_eq!(settings.collection, "players");
        assert_eq!(settings.staleness, TimeDelta::minutes(5));
        assert_eq!(settings.interval, Duration::from_secs(30));
        assert_eq!(settings.commit_retries, 2);
        assert_eq!(settings.retry_delay, Duration::from_millis(250));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let args = Args::try_parse_from(["presence-sweep", "--interval-secs", "0"])
            .expect("parse args");
        let err = args.sweep_settings().expect_err("zero interval");
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn huge_staleness_is_rejected() {
        let staleness = u64::MAX.to_string();
        let args = Args::try_parse_from(["presence-sweep", "--staleness-secs", staleness.as_str()])
            .expect("parse args");
        assert!(args.sweep_settings().is_err());
    }
}
