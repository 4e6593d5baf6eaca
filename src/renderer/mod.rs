//! Browser-driving abstraction.
//!
//! `UiDriver` is the full interface contract the session layer is built on:
//! navigation, element interaction, page-markup reads, and bounded waits.
//! The production implementation is Chromium via chromiumoxide
//! ([`chromium::ChromiumDriver`]); [`scripted::ScriptedDriver`] is a
//! deterministic in-memory implementation for tests.

pub mod chromium;
pub mod scripted;

use crate::error::DriverError;
use anyhow::Result;
use async_trait::async_trait;

/// One browsing context against the remote UI.
///
/// Every wait is bounded by the driver's default wait duration; an elapsed
/// wait surfaces as [`DriverError::Timeout`]. Selector arguments are CSS.
#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Load a URL in the active window.
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Click the first element matching the selector.
    async fn click(&mut self, selector: &str) -> Result<(), DriverError>;

    /// Click the anchor whose visible text equals `text`.
    async fn click_link_text(&mut self, text: &str) -> Result<(), DriverError>;

    /// Click the `index`-th (0-based) anchor inside the matching container.
    async fn click_nth_link(&mut self, container: &str, index: usize)
        -> Result<(), DriverError>;

    /// Number of anchors inside the matching container, 0 if the container
    /// is absent.
    async fn link_count(&mut self, container: &str) -> Result<usize, DriverError>;

    /// Type text into the first element matching the selector.
    async fn type_into(&mut self, selector: &str, text: &str) -> Result<(), DriverError>;

    /// Visible labels of the options of a `<select>` control.
    async fn option_labels(&mut self, selector: &str) -> Result<Vec<String>, DriverError>;

    /// Select the option with the given visible label and fire a change event.
    async fn select_option(&mut self, selector: &str, label: &str)
        -> Result<(), DriverError>;

    /// Text content of the first element matching the selector.
    async fn element_text(&mut self, selector: &str) -> Result<String, DriverError>;

    /// Full markup of the current page.
    async fn page_html(&mut self) -> Result<String, DriverError>;

    /// Block until the selector matches a visible element.
    async fn wait_for_visible(&mut self, selector: &str) -> Result<(), DriverError>;

    /// Block until the browser has exactly `n` windows.
    async fn wait_for_window_count(&mut self, n: usize) -> Result<(), DriverError>;

    /// Block until the active window's title equals `title`.
    async fn wait_for_title(&mut self, title: &str) -> Result<(), DriverError>;

    /// Make the most recently opened window the active one.
    async fn switch_to_new_window(&mut self) -> Result<(), DriverError>;

    /// Tear down the browsing context.
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Builds fresh driver instances for the supervisor's discard-and-rebuild
/// path. One factory serves a whole process; each call owns a new browsing
/// context.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn UiDriver>>;
}
