//! Error kinds for driver primitives and session operations.
//!
//! `DriverError` covers the browser-driving layer; `SessionError` classifies
//! failures of the higher-level workflow steps. The supervisor uses
//! [`SessionError::is_session_fatal`] to decide between "skip and continue"
//! and "discard the session and build a fresh one".

use std::time::Duration;
use thiserror::Error;

/// Failure of a single browser-driving primitive.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A bounded wait elapsed without the condition becoming true.
    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    /// An element the operation needs is not on the current page.
    #[error("element not found: {0}")]
    NotFound(String),

    /// The browser or its connection failed.
    #[error("browser error: {0}")]
    Browser(String),
}

/// Failure of a session-level operation.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Login never completed: the post-login control never appeared.
    #[error("authentication never completed: {0}")]
    Authentication(#[source] DriverError),

    /// An expected screen transition never completed.
    #[error("navigation failed: {0}")]
    Navigation(#[source] DriverError),

    /// The results table could not be read into structured rows.
    #[error("malformed results table: {0}")]
    MalformedTable(String),

    /// The purchase workflow stalled. The row is presumed gone; the session
    /// itself is presumed still usable.
    #[error("purchase workflow stalled: {0}")]
    Purchase(#[source] DriverError),
}

impl SessionError {
    /// Whether this error invalidates the whole session.
    ///
    /// Fatal errors are handled by the supervisor's discard-and-rebuild path.
    /// Non-fatal errors (a skipped page, a stalled purchase) are handled in
    /// place by the caller.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Authentication(_) | SessionError::Navigation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_split() {
        let nav = SessionError::Navigation(DriverError::Timeout {
            what: "results table".into(),
            timeout: Duration::from_secs(10),
        });
        assert!(nav.is_session_fatal());

        let purchase = SessionError::Purchase(DriverError::NotFound("a".into()));
        assert!(!purchase.is_session_fatal());

        let table = SessionError::MalformedTable("bad hours cell".into());
        assert!(!table.is_session_fatal());
    }
}
