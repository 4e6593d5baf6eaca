//! Multi-page collection of one filtered result set.

use crate::error::SessionError;
use crate::extract::{extract_offer_table, OfferTable};
use crate::session::RemoteSession;
use tracing::warn;

/// Sweep every page of the current filtered view into one indexed table.
///
/// The session must already be filtered and positioned on the first page.
/// Rows are tagged with their 0-based page number in per-page order; the
/// table is immutable once collected and rebuilt on every scheduling pass.
/// A malformed page is skipped with a warning — the sweep, like the
/// session, survives it.
pub async fn collect_all_pages(
    session: &mut RemoteSession,
) -> Result<OfferTable, SessionError> {
    let mut collected = OfferTable::default();

    append_page(session, 0, &mut collected).await?;

    let pages = session.page_count().await?;
    for page in 1..pages {
        session.goto_page(page).await?;
        append_page(session, page, &mut collected).await?;
    }

    Ok(collected)
}

async fn append_page(
    session: &mut RemoteSession,
    page: usize,
    collected: &mut OfferTable,
) -> Result<(), SessionError> {
    let html = session.read_current_page().await?;
    match extract_offer_table(&html) {
        Ok(mut table) => {
            if collected.headers.is_empty() {
                collected.headers = std::mem::take(&mut table.headers);
            }
            for mut row in table.rows {
                row.page_number = page;
                collected.rows.push(row);
            }
            Ok(())
        }
        Err(e @ SessionError::MalformedTable(_)) => {
            warn!(page, "skipping malformed result page: {e}");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::scripted::ScriptedDriver;
    use crate::testkit::{results_page, test_config};

    #[tokio::test]
    async fn three_pages_collect_in_order_with_page_tags() {
        let pages = vec![
            results_page(&[10, 20, 30]),
            results_page(&[40, 50, 60]),
            results_page(&[70]),
        ];
        let driver = ScriptedDriver::new().with_result_pages(pages);
        let mut session = RemoteSession::new(Box::new(driver), &test_config());

        let table = collect_all_pages(&mut session).await.unwrap();
        assert_eq!(table.rows.len(), 7);
        let tags: Vec<usize> = table.rows.iter().map(|r| r.page_number).collect();
        assert_eq!(tags, vec![0, 0, 0, 1, 1, 1, 2]);
        let hours: Vec<u32> = table.rows.iter().map(|r| r.hours_flown).collect();
        assert_eq!(hours, vec![10, 20, 30, 40, 50, 60, 70]);
        // Per-page row indices restart on every page.
        assert_eq!(table.rows[3].row_index, 0);
        assert_eq!(table.rows[6].row_index, 0);
    }

    #[tokio::test]
    async fn single_page_needs_no_navigation() {
        let driver = ScriptedDriver::new().with_result_pages(vec![results_page(&[5])]);
        let journal = driver.journal();
        let mut session = RemoteSession::new(Box::new(driver), &test_config());

        let table = collect_all_pages(&mut session).await.unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!(!journal.lock().unwrap().iter().any(|e| e.starts_with("goto-page")));
    }

    #[tokio::test]
    async fn empty_view_collects_an_empty_table() {
        let driver = ScriptedDriver::new()
            .with_result_pages(vec!["<html><body></body></html>".to_string()]);
        let mut session = RemoteSession::new(Box::new(driver), &test_config());
        let table = collect_all_pages(&mut session).await.unwrap();
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn malformed_page_is_skipped_not_fatal() {
        let mut bad = results_page(&[10]);
        bad = bad.replace("<td>10</td>", "<td>ten</td>");
        let pages = vec![results_page(&[1, 2]), bad, results_page(&[3])];
        let driver = ScriptedDriver::new().with_result_pages(pages);
        let mut session = RemoteSession::new(Box::new(driver), &test_config());

        let table = collect_all_pages(&mut session).await.unwrap();
        let hours: Vec<u32> = table.rows.iter().map(|r| r.hours_flown).collect();
        assert_eq!(hours, vec![1, 2, 3]);
        let tags: Vec<usize> = table.rows.iter().map(|r| r.page_number).collect();
        assert_eq!(tags, vec![0, 0, 2]);
    }
}
