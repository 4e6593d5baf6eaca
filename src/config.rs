//! Runtime configuration sourced from the environment.
//!
//! Credentials and the rules-feed location are required; everything else has a
//! default matching the production cadence (15-minute session refresh,
//! 3-minute feed refresh, 2-second pass delay).

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://env.airlineonline.aero/RockyAOLive";
const DEFAULT_POPUP_TITLE: &str = "AIRLINEOnline - RockyAOLive, AeroLuxe";
const DEFAULT_WAIT_SECS: u64 = 10;
const DEFAULT_SESSION_REFRESH_SECS: u64 = 15 * 60;
const DEFAULT_FEED_REFRESH_SECS: u64 = 3 * 60;
const DEFAULT_PASS_DELAY_SECS: u64 = 2;
const DEFAULT_MAX_WORKERS: usize = 10;

/// Where acquisition rules are read from.
#[derive(Debug, Clone)]
pub enum FeedSource {
    /// Published-CSV export URL, fetched fresh on every read.
    Url(String),
    /// Local CSV file, re-read on every access.
    File(PathBuf),
}

/// Full runtime configuration for either operating mode.
#[derive(Debug, Clone)]
pub struct Config {
    /// Login page of the remote application.
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Expected title of the application popup window.
    pub popup_title: String,
    /// Where the acquisition rules come from.
    pub feed: FeedSource,
    /// Durable counter file.
    pub counter_path: PathBuf,
    /// Bounded-wait default for every driver wait.
    pub wait_timeout: Duration,
    /// Monitor mode: re-authenticate this often to bound session age.
    pub session_refresh: Duration,
    /// Monitor mode: re-read the rules feed this often.
    pub feed_refresh: Duration,
    /// Monitor mode: sleep between round-robin passes.
    pub pass_delay: Duration,
    /// Saturation mode: concurrency ceiling for per-type workers.
    pub max_workers: usize,
}

impl Config {
    /// Build a config from `LEASEHAWK_*` environment variables.
    ///
    /// Required: `LEASEHAWK_USERNAME`, `LEASEHAWK_PASSWORD`, and one of
    /// `LEASEHAWK_RULES_URL` / `LEASEHAWK_RULES_FILE`.
    pub fn from_env() -> Result<Self> {
        let username = match read_env_string("LEASEHAWK_USERNAME") {
            Some(v) => v,
            None => bail!("LEASEHAWK_USERNAME is not set"),
        };
        let password = match read_env_string("LEASEHAWK_PASSWORD") {
            Some(v) => v,
            None => bail!("LEASEHAWK_PASSWORD is not set"),
        };
        let feed = match (
            read_env_string("LEASEHAWK_RULES_URL"),
            read_env_string("LEASEHAWK_RULES_FILE"),
        ) {
            (Some(url), _) => FeedSource::Url(url),
            (None, Some(path)) => FeedSource::File(PathBuf::from(path)),
            (None, None) => {
                bail!("set LEASEHAWK_RULES_URL or LEASEHAWK_RULES_FILE for the rules feed")
            }
        };

        Ok(Self {
            base_url: read_env_string("LEASEHAWK_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            username,
            password,
            popup_title: read_env_string("LEASEHAWK_POPUP_TITLE")
                .unwrap_or_else(|| DEFAULT_POPUP_TITLE.to_string()),
            feed,
            counter_path: counter_path(),
            wait_timeout: Duration::from_secs(read_env_u64(
                "LEASEHAWK_WAIT_SECS",
                DEFAULT_WAIT_SECS,
            )),
            session_refresh: Duration::from_secs(read_env_u64(
                "LEASEHAWK_SESSION_REFRESH_SECS",
                DEFAULT_SESSION_REFRESH_SECS,
            )),
            feed_refresh: Duration::from_secs(read_env_u64(
                "LEASEHAWK_FEED_REFRESH_SECS",
                DEFAULT_FEED_REFRESH_SECS,
            )),
            pass_delay: Duration::from_secs(read_env_u64(
                "LEASEHAWK_PASS_DELAY_SECS",
                DEFAULT_PASS_DELAY_SECS,
            )),
            max_workers: read_env_usize("LEASEHAWK_MAX_WORKERS", DEFAULT_MAX_WORKERS).max(1),
        })
    }
}

/// Default durable counter file: `~/.leasehawk/counters.json`.
pub fn counter_path() -> PathBuf {
    if let Some(p) = read_env_string("LEASEHAWK_COUNTER_FILE") {
        return PathBuf::from(p);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".leasehawk")
        .join("counters.json")
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    read_env_string(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn read_env_usize(name: &str, default: usize) -> usize {
    read_env_string(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_number_parsing_falls_back() {
        assert_eq!(read_env_u64("LEASEHAWK_TEST_UNSET_VAR", 42), 42);
    }
}
