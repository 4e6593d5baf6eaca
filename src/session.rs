//! One authenticated browsing context against the remote application.
//!
//! `RemoteSession` sequences the multi-step UI workflows: credentialed login,
//! the application popup, navigation to the used-lease results screen,
//! filtering, pagination, and the purchase flow. Every step is wait-gated on
//! the control that proves the transition completed.
//!
//! A session is never repaired: a fatal error (authentication or navigation)
//! moves it to `Crashed` and only the supervisor's discard-and-rebuild path
//! continues from there.

use crate::config::Config;
use crate::error::{DriverError, SessionError};
use crate::renderer::UiDriver;
use tracing::debug;

// Control selectors of the remote application.
const USERNAME_FIELD: &str = "#txtUsername";
const PASSWORD_FIELD: &str = "#txtPassword";
const LOGIN_BUTTON: &str = "[name='btnLogin']";
const START_BUTTON: &str = "[name='btnStartSimulation']";
const START_BUTTON_ID: &str = "#btnStartSimulation";
const AIRCRAFT_MENU_TEXT: &str = "Aircraft";
const LEASE_USED_BUTTON: &str = "#_ctl0_MainContent_btnLeaseUsedAircrafts";
const FILTER_DROPDOWN: &str = "#_ctl0_MainContent_ddlBudgetLease";
const APPLY_FILTER_BUTTON: &str = "#_ctl0_MainContent_btnApplyFilter";
const RESULTS_TABLE: &str = "#_ctl0_MainContent_dtgAvailableLease";
const PREPAY_CHECKBOX: &str = "#_ctl0_MainContent_chkPrepay";
const QUOTE_BUTTON: &str = "#_ctl0_MainContent_btnGetQuote";
const QUOTE_PANEL: &str = ".panel-content";
const ACCEPT_BUTTON: &str = "#_ctl0_MainContent_btnAccept";

/// Pagination links live in the last row of the results table.
const PAGER_LINKS_CONTAINER: &str = "table tr:last-child";
/// Offer links are counted across the whole results table, pager included;
/// data rows precede the pager row, so 1-based row numbers index them.
const TABLE_LINKS_CONTAINER: &str = "table";

/// Observable position of a session in its workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    PopupPending,
    InApplication,
    OnResultsScreen,
    Filtered,
    Paginated,
    InPurchaseFlow,
    /// Terminal. Not recoverable in place.
    Crashed,
}

/// One authenticated, stateful session. Owns its browsing context
/// exclusively; destroyed and replaced wholesale on crash.
pub struct RemoteSession {
    driver: Box<dyn UiDriver>,
    base_url: String,
    username: String,
    password: String,
    popup_title: String,
    state: SessionState,
}

impl RemoteSession {
    pub fn new(driver: Box<dyn UiDriver>, cfg: &Config) -> Self {
        Self {
            driver,
            base_url: cfg.base_url.clone(),
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            popup_title: cfg.popup_title.clone(),
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Log in and land on the results screen: the stateful step ordering
    /// every fresh session goes through.
    pub async fn login_workflow(&mut self) -> Result<(), SessionError> {
        self.authenticate().await?;
        self.enter_application().await?;
        self.goto_results_page().await
    }

    /// Submit credentials and block until the post-login control is visible.
    pub async fn authenticate(&mut self) -> Result<(), SessionError> {
        self.state = SessionState::Authenticating;
        let result: Result<(), DriverError> = async {
            self.driver.navigate(&self.base_url).await?;
            self.driver.type_into(USERNAME_FIELD, &self.username).await?;
            self.driver.type_into(PASSWORD_FIELD, &self.password).await?;
            self.driver.click(LOGIN_BUTTON).await?;
            self.driver.wait_for_visible(START_BUTTON_ID).await
        }
        .await;
        match result {
            Ok(()) => {
                self.state = SessionState::PopupPending;
                Ok(())
            }
            Err(e) => self.crash(SessionError::Authentication(e)),
        }
    }

    /// Trigger the application popup, switch to it, and block until its
    /// title confirms the application is loaded.
    pub async fn enter_application(&mut self) -> Result<(), SessionError> {
        let result: Result<(), DriverError> = async {
            self.driver.click(START_BUTTON).await?;
            self.driver.wait_for_window_count(2).await?;
            self.driver.switch_to_new_window().await?;
            self.driver.wait_for_title(&self.popup_title).await
        }
        .await;
        match result {
            Ok(()) => {
                self.state = SessionState::InApplication;
                Ok(())
            }
            Err(e) => self.crash(SessionError::Navigation(e)),
        }
    }

    /// Navigate the menus to the used-lease results screen.
    ///
    /// Idempotent from the results screen itself; re-navigating refreshes it
    /// and resets any filter, which is exactly what every scheduling pass
    /// wants before applying its own filter.
    pub async fn goto_results_page(&mut self) -> Result<(), SessionError> {
        let result: Result<(), DriverError> = async {
            self.driver.click_link_text(AIRCRAFT_MENU_TEXT).await?;
            self.driver.click(LEASE_USED_BUTTON).await?;
            self.driver.wait_for_visible(FILTER_DROPDOWN).await
        }
        .await;
        match result {
            Ok(()) => {
                self.state = SessionState::OnResultsScreen;
                Ok(())
            }
            Err(e) => self.crash(SessionError::Navigation(e)),
        }
    }

    /// Filter the results to one airframe type.
    ///
    /// Returns `false`, touching nothing, when the type is not among the
    /// currently offered option labels — that means no current supply, not
    /// an error.
    pub async fn select_filter(&mut self, airframe: &str) -> Result<bool, SessionError> {
        let labels = match self.driver.option_labels(FILTER_DROPDOWN).await {
            Ok(labels) => labels,
            Err(e) => return self.crash(SessionError::Navigation(e)),
        };
        if !labels.iter().any(|l| l == airframe) {
            debug!(airframe, "airframe type not currently offered");
            return Ok(false);
        }
        let result: Result<(), DriverError> = async {
            self.driver.select_option(FILTER_DROPDOWN, airframe).await?;
            self.driver.click(APPLY_FILTER_BUTTON).await?;
            self.driver.wait_for_visible(RESULTS_TABLE).await
        }
        .await;
        match result {
            Ok(()) => {
                self.state = SessionState::Filtered;
                Ok(true)
            }
            Err(e) => self.crash(SessionError::Navigation(e)),
        }
    }

    /// Raw markup of the currently rendered page.
    pub async fn read_current_page(&mut self) -> Result<String, SessionError> {
        match self.driver.page_html().await {
            Ok(html) => Ok(html),
            Err(e) => self.crash(SessionError::Navigation(e)),
        }
    }

    /// Number of result pages, derived from the pager links in the table's
    /// final row. No links means exactly one page.
    pub async fn page_count(&mut self) -> Result<usize, SessionError> {
        match self.driver.link_count(PAGER_LINKS_CONTAINER).await {
            Ok(0) => Ok(1),
            Ok(n) => Ok(n),
            Err(e) => self.crash(SessionError::Navigation(e)),
        }
    }

    /// Jump to the 0-based result page. The pager is re-derived fresh;
    /// the DOM is re-rendered after every navigation.
    pub async fn goto_page(&mut self, page: usize) -> Result<(), SessionError> {
        match self.goto_page_raw(page).await {
            Ok(()) => {
                self.state = SessionState::Paginated;
                Ok(())
            }
            Err(e) => self.crash(SessionError::Navigation(e)),
        }
    }

    async fn goto_page_raw(&mut self, page: usize) -> Result<(), DriverError> {
        // A single-page result renders a pager row with no links; there is
        // nowhere to jump and the current page is already the right one.
        if self.driver.link_count(PAGER_LINKS_CONTAINER).await? == 0 {
            return Ok(());
        }
        self.driver
            .click_nth_link(PAGER_LINKS_CONTAINER, page)
            .await?;
        self.driver.wait_for_visible(RESULTS_TABLE).await
    }

    /// Run the purchase flow for one offer row.
    ///
    /// `page` is the 0-based result page (`None` = the current page is
    /// already correct); `row_number` is 1-based at the UI boundary. The
    /// flow opens the quote, selects prepay, requests the quote, and waits
    /// for the acceptance control; the booking is committed by the quote
    /// step, so the accept button itself is never clicked. Finishes by
    /// returning to the results screen.
    ///
    /// Any stall is a [`SessionError::Purchase`]: the row is presumed taken
    /// by another buyer and the session presumed still usable.
    pub async fn purchase(
        &mut self,
        page: Option<usize>,
        row_number: usize,
    ) -> Result<(), SessionError> {
        self.state = SessionState::InPurchaseFlow;
        let result: Result<(), DriverError> = async {
            if let Some(p) = page {
                self.goto_page_raw(p).await?;
            }
            self.driver
                .click_nth_link(TABLE_LINKS_CONTAINER, row_number.saturating_sub(1))
                .await?;
            self.driver.wait_for_visible(QUOTE_BUTTON).await?;
            if let Ok(summary) = self.driver.element_text(QUOTE_PANEL).await {
                debug!(%summary, "quote summary");
            }
            self.driver.click(PREPAY_CHECKBOX).await?;
            self.driver.click(QUOTE_BUTTON).await?;
            self.driver.wait_for_visible(ACCEPT_BUTTON).await
        }
        .await;
        if let Err(e) = result {
            // Leave the crash decision to the caller: the session survives.
            self.state = SessionState::InApplication;
            return Err(SessionError::Purchase(e));
        }
        self.goto_results_page().await
    }

    /// Best-effort teardown of the browsing context.
    pub async fn close(&mut self) {
        if let Err(e) = self.driver.close().await {
            debug!("session teardown failed: {e}");
        }
    }

    fn crash<T>(&mut self, error: SessionError) -> Result<T, SessionError> {
        self.state = SessionState::Crashed;
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::scripted::ScriptedDriver;
    use crate::testkit::test_config;

    #[tokio::test]
    async fn login_workflow_sequences_the_steps() {
        let driver = ScriptedDriver::new();
        let journal = driver.journal();
        let mut session = RemoteSession::new(Box::new(driver), &test_config());

        session.login_workflow().await.unwrap();
        assert_eq!(session.state(), SessionState::OnResultsScreen);

        let log = journal.lock().unwrap();
        assert_eq!(log[0], "navigate:https://sim.example/Live");
        assert!(log.contains(&"click:[name='btnLogin']".to_string()));
        assert!(log.contains(&"switch-window".to_string()));
        assert!(log.contains(&"link:Aircraft".to_string()));
    }

    #[tokio::test]
    async fn failed_login_wait_is_fatal() {
        let driver = ScriptedDriver::new().failing_wait(START_BUTTON_ID);
        let mut session = RemoteSession::new(Box::new(driver), &test_config());

        let err = session.authenticate().await.unwrap_err();
        assert!(matches!(err, SessionError::Authentication(_)));
        assert!(err.is_session_fatal());
        assert_eq!(session.state(), SessionState::Crashed);
    }

    #[tokio::test]
    async fn unknown_airframe_returns_false_without_ui_mutation() {
        let driver = ScriptedDriver::new().with_airframe_options(vec!["Dash-8 Q400"]);
        let journal = driver.journal();
        let mut session = RemoteSession::new(Box::new(driver), &test_config());

        let found = session.select_filter("A380").await.unwrap();
        assert!(!found);
        assert!(journal.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn known_airframe_applies_the_filter() {
        let driver = ScriptedDriver::new().with_airframe_options(vec!["Dash-8 Q400"]);
        let journal = driver.journal();
        let mut session = RemoteSession::new(Box::new(driver), &test_config());

        assert!(session.select_filter("Dash-8 Q400").await.unwrap());
        assert_eq!(session.state(), SessionState::Filtered);
        let log = journal.lock().unwrap();
        assert_eq!(log[0], "select:Dash-8 Q400");
        assert!(log.contains(&format!("click:{APPLY_FILTER_BUTTON}")));
    }

    #[tokio::test]
    async fn stalled_purchase_is_not_fatal() {
        let driver = ScriptedDriver::new()
            .with_result_pages(vec!["<table></table>".to_string()])
            .failing_wait(QUOTE_BUTTON);
        let mut session = RemoteSession::new(Box::new(driver), &test_config());

        let err = session.purchase(None, 1).await.unwrap_err();
        assert!(matches!(err, SessionError::Purchase(_)));
        assert!(!err.is_session_fatal());
        assert_ne!(session.state(), SessionState::Crashed);
    }

    #[tokio::test]
    async fn purchase_clicks_the_requested_row_link() {
        let pages = vec!["<table></table>".to_string(), "<table></table>".to_string()];
        let driver = ScriptedDriver::new().with_result_pages(pages);
        let journal = driver.journal();
        let mut session = RemoteSession::new(Box::new(driver), &test_config());

        session.purchase(Some(1), 3).await.unwrap();
        let log = journal.lock().unwrap();
        assert!(log.contains(&"goto-page:1".to_string()));
        assert!(log.contains(&"purchase-link:2".to_string()));
        assert!(log.contains(&format!("click:{PREPAY_CHECKBOX}")));
        assert!(log.contains(&format!("click:{QUOTE_BUTTON}")));
        // The accept control is waited for but never clicked.
        assert!(!log.contains(&format!("click:{ACCEPT_BUTTON}")));
    }

    #[tokio::test]
    async fn purchase_on_a_single_page_skips_the_page_jump() {
        let driver =
            ScriptedDriver::new().with_result_pages(vec!["<table></table>".to_string()]);
        let journal = driver.journal();
        let mut session = RemoteSession::new(Box::new(driver), &test_config());

        session.purchase(Some(0), 2).await.unwrap();
        let log = journal.lock().unwrap();
        assert!(!log.iter().any(|e| e.starts_with("goto-page")));
        assert!(log.contains(&"purchase-link:1".to_string()));
    }

    #[tokio::test]
    async fn single_page_results_report_one_page() {
        let driver =
            ScriptedDriver::new().with_result_pages(vec!["<table></table>".to_string()]);
        let mut session = RemoteSession::new(Box::new(driver), &test_config());
        assert_eq!(session.page_count().await.unwrap(), 1);
    }
}
