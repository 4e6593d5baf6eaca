//! Deterministic in-memory driver for tests.
//!
//! `ScriptedDriver` plays back canned result-page markup and records every
//! UI mutation into a shared journal, so tests can assert both what the
//! session read and what it touched. Waits can be scripted to time out.

use super::{DriverFactory, UiDriver};
use crate::error::DriverError;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Marker selector fragment identifying the pagination row container.
const NAV_ROW_MARKER: &str = "tr:last-child";

/// Scripted browsing context.
pub struct ScriptedDriver {
    result_pages: Vec<String>,
    current_page: usize,
    airframe_options: Vec<String>,
    popup_title: String,
    quote_text: String,
    failing_waits: HashSet<String>,
    windows: usize,
    journal: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self {
            result_pages: Vec::new(),
            current_page: 0,
            airframe_options: Vec::new(),
            popup_title: "AIRLINEOnline - RockyAOLive, AeroLuxe".to_string(),
            quote_text: String::new(),
            failing_waits: HashSet::new(),
            windows: 1,
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Result-page markup, one entry per pagination page.
    pub fn with_result_pages(mut self, pages: Vec<String>) -> Self {
        self.result_pages = pages;
        self
    }

    /// Labels offered by the airframe filter dropdown.
    pub fn with_airframe_options<S: Into<String>>(mut self, options: Vec<S>) -> Self {
        self.airframe_options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_popup_title(mut self, title: &str) -> Self {
        self.popup_title = title.to_string();
        self
    }

    /// Make every wait on this target time out.
    pub fn failing_wait(mut self, what: &str) -> Self {
        self.failing_waits.insert(what.to_string());
        self
    }

    /// Shared view of everything the driver was asked to do.
    pub fn journal(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.journal)
    }

    fn record(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }

    fn timeout(&self, what: &str) -> DriverError {
        DriverError::Timeout {
            what: what.to_string(),
            timeout: Duration::from_millis(0),
        }
    }
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UiDriver for ScriptedDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.record(format!("navigate:{url}"));
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        self.record(format!("click:{selector}"));
        if selector.contains("btnStartSimulation") {
            self.windows = 2;
        }
        if selector.contains("btnApplyFilter") {
            self.current_page = 0;
        }
        Ok(())
    }

    async fn click_link_text(&mut self, text: &str) -> Result<(), DriverError> {
        self.record(format!("link:{text}"));
        Ok(())
    }

    async fn click_nth_link(
        &mut self,
        container: &str,
        index: usize,
    ) -> Result<(), DriverError> {
        if container.contains(NAV_ROW_MARKER) {
            // The pager row only carries anchors when there is more than one
            // page; clicking must fail exactly where link_count reports zero.
            if self.result_pages.len() <= 1 || index >= self.result_pages.len() {
                return Err(DriverError::NotFound(format!("{container} a[{index}]")));
            }
            self.current_page = index;
            self.record(format!("goto-page:{index}"));
        } else {
            self.record(format!("purchase-link:{index}"));
        }
        Ok(())
    }

    async fn link_count(&mut self, container: &str) -> Result<usize, DriverError> {
        if container.contains(NAV_ROW_MARKER) && self.result_pages.len() > 1 {
            Ok(self.result_pages.len())
        } else {
            Ok(0)
        }
    }

    async fn type_into(&mut self, selector: &str, text: &str) -> Result<(), DriverError> {
        self.record(format!("type:{selector}={text}"));
        Ok(())
    }

    async fn option_labels(&mut self, _selector: &str) -> Result<Vec<String>, DriverError> {
        Ok(self.airframe_options.clone())
    }

    async fn select_option(
        &mut self,
        selector: &str,
        label: &str,
    ) -> Result<(), DriverError> {
        if !self.airframe_options.iter().any(|o| o == label) {
            return Err(DriverError::NotFound(format!("{selector} option {label}")));
        }
        self.record(format!("select:{label}"));
        Ok(())
    }

    async fn element_text(&mut self, _selector: &str) -> Result<String, DriverError> {
        Ok(self.quote_text.clone())
    }

    async fn page_html(&mut self) -> Result<String, DriverError> {
        Ok(self
            .result_pages
            .get(self.current_page)
            .cloned()
            .unwrap_or_default())
    }

    async fn wait_for_visible(&mut self, selector: &str) -> Result<(), DriverError> {
        if self.failing_waits.contains(selector) {
            return Err(self.timeout(selector));
        }
        Ok(())
    }

    async fn wait_for_window_count(&mut self, n: usize) -> Result<(), DriverError> {
        if self.windows == n {
            Ok(())
        } else {
            Err(self.timeout(&format!("window count {n}")))
        }
    }

    async fn wait_for_title(&mut self, title: &str) -> Result<(), DriverError> {
        if self.popup_title == title {
            Ok(())
        } else {
            Err(self.timeout(&format!("title \"{title}\"")))
        }
    }

    async fn switch_to_new_window(&mut self) -> Result<(), DriverError> {
        self.record("switch-window".to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.record("close".to_string());
        Ok(())
    }
}

/// Hands out pre-scripted drivers in order and counts constructions, so
/// restart tests can assert exactly how many sessions were built.
pub struct ScriptedFactory {
    drivers: Mutex<VecDeque<ScriptedDriver>>,
    built: AtomicUsize,
}

impl ScriptedFactory {
    pub fn new(drivers: Vec<ScriptedDriver>) -> Self {
        Self {
            drivers: Mutex::new(drivers.into()),
            built: AtomicUsize::new(0),
        }
    }

    /// How many drivers have been handed out.
    pub fn built_count(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DriverFactory for ScriptedFactory {
    async fn connect(&self) -> Result<Box<dyn UiDriver>> {
        let driver = self
            .drivers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("scripted factory exhausted"))?;
        self.built.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGER: &str = "table tr:last-child";

    #[tokio::test]
    async fn pager_clicks_agree_with_link_count() {
        let mut single = ScriptedDriver::new().with_result_pages(vec!["<table></table>".into()]);
        assert_eq!(single.link_count(PAGER).await.unwrap(), 0);
        assert!(matches!(
            single.click_nth_link(PAGER, 0).await,
            Err(DriverError::NotFound(_))
        ));

        let mut multi = ScriptedDriver::new().with_result_pages(vec![
            "<table></table>".into(),
            "<table></table>".into(),
        ]);
        assert_eq!(multi.link_count(PAGER).await.unwrap(), 2);
        multi.click_nth_link(PAGER, 1).await.unwrap();
        assert!(multi.click_nth_link(PAGER, 2).await.is_err());
    }
}
