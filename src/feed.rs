//! Acquisition-rule feed.
//!
//! Rules live in an operator-maintained spreadsheet published as CSV. The
//! feed is the source of truth: it is re-read in full on every access and
//! never cached across scheduling iterations. A local-file source covers
//! offline runs and tests.

use crate::config::FeedSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::warn;

const TYPE_COLUMN: &str = "Aircraft Type";
const QUOTA_COLUMN: &str = "Maximum Airframes";
const HOURS_COLUMN: &str = "Maximum Hours";

/// One acquisition rule: what to buy, how many, and how worn is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionRule {
    pub aircraft_type: String,
    /// Quota: maximum units of this type to acquire.
    pub max_airframes: u32,
    /// Eligibility cutoff: offers at or above this many hours are ignored.
    pub max_hours: u32,
}

/// A tabular rule source, fully re-read on each call.
#[async_trait]
pub trait RuleFeed: Send + Sync {
    async fn read_rules(&self) -> Result<Vec<AcquisitionRule>>;
}

/// Published-CSV export fetched over HTTP.
pub struct HttpCsvFeed {
    url: String,
    client: reqwest::Client,
}

impl HttpCsvFeed {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RuleFeed for HttpCsvFeed {
    async fn read_rules(&self) -> Result<Vec<AcquisitionRule>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("failed to fetch rules feed from {}", self.url))?
            .error_for_status()
            .with_context(|| format!("rules feed {} returned an error status", self.url))?;
        let body = response
            .text()
            .await
            .context("failed to read rules feed body")?;
        Ok(parse_rules_csv(&body))
    }
}

/// Local CSV file, re-read on every access.
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl RuleFeed for FileFeed {
    async fn read_rules(&self) -> Result<Vec<AcquisitionRule>> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read rules file {}", self.path.display()))?;
        Ok(parse_rules_csv(&body))
    }
}

/// Build the configured feed source.
pub fn feed_for(source: &FeedSource) -> Box<dyn RuleFeed> {
    match source {
        FeedSource::Url(url) => Box::new(HttpCsvFeed::new(url.clone())),
        FeedSource::File(path) => Box::new(FileFeed::new(path.clone())),
    }
}

/// Parse the feed's CSV body into rules.
///
/// Header-indexed, so extra columns and column reordering are harmless.
/// The feed's cells never contain commas, so no quoting dialect is handled.
/// Rows with missing or non-numeric values are skipped with a warning rather
/// than poisoning the whole feed.
fn parse_rules_csv(body: &str) -> Vec<AcquisitionRule> {
    let mut lines = body.lines().filter(|l| !l.trim().is_empty());
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<&str> = header_line.split(',').map(str::trim).collect();

    let type_idx = headers.iter().position(|h| *h == TYPE_COLUMN);
    let quota_idx = headers.iter().position(|h| *h == QUOTA_COLUMN);
    let hours_idx = headers.iter().position(|h| *h == HOURS_COLUMN);
    let (Some(type_idx), Some(quota_idx), Some(hours_idx)) = (type_idx, quota_idx, hours_idx)
    else {
        warn!(header = header_line, "rules feed is missing required columns");
        return Vec::new();
    };

    let mut rules = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        let aircraft_type = cells.get(type_idx).copied().unwrap_or("");
        let quota = cells.get(quota_idx).and_then(|v| v.parse::<u32>().ok());
        let hours = cells.get(hours_idx).and_then(|v| v.parse::<u32>().ok());
        match (aircraft_type.is_empty(), quota, hours) {
            (false, Some(max_airframes), Some(max_hours)) => rules.push(AcquisitionRule {
                aircraft_type: aircraft_type.to_string(),
                max_airframes,
                max_hours,
            }),
            _ => warn!(line = line_no + 2, "skipping malformed rules feed row"),
        }
    }
    rules
}
