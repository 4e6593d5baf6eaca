//! Shared builders for unit tests.

use crate::config::{Config, FeedSource};
use std::path::PathBuf;
use std::time::Duration;

pub fn test_config() -> Config {
    Config {
        base_url: "https://sim.example/Live".to_string(),
        username: "operator".to_string(),
        password: "hunter2".to_string(),
        popup_title: "AIRLINEOnline - RockyAOLive, AeroLuxe".to_string(),
        feed: FeedSource::File(PathBuf::from("/dev/null")),
        counter_path: PathBuf::from("/tmp/leasehawk-test-counters.json"),
        wait_timeout: Duration::from_secs(1),
        session_refresh: Duration::from_secs(60),
        feed_refresh: Duration::from_secs(30),
        pass_delay: Duration::from_millis(1),
        max_workers: 2,
    }
}

/// Results-page markup with one offer row per hours value, plus the
/// header row and the trailing pager row the extractor must drop.
pub fn results_page(hours: &[u32]) -> String {
    let mut html = String::from(
        "<html><body><table>\
         <tr><th>Aircraft</th><th>Hours flown</th></tr>",
    );
    for h in hours {
        html.push_str(&format!(
            "<tr><td><a href='#'>lease</a></td><td>{h}</td></tr>"
        ));
    }
    html.push_str("<tr><td><a href='#'>pager</a></td></tr></table></body></html>");
    html
}
