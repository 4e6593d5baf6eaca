//! Offer-table extraction from rendered results-page markup.
//!
//! The results screen renders one `<table>`: a header row, the offer rows,
//! and a final pagination/summary row that is never data and is dropped
//! unconditionally. `Hours flown` is the only column the bot interprets;
//! every other column passes through opaquely.

use crate::error::SessionError;
use scraper::{Html, Selector};

/// Header of the usage-wear column.
pub const HOURS_COLUMN: &str = "Hours flown";

/// One purchasable lease offer.
///
/// Identity is positional: `(page_number, row_index)` is only meaningful
/// while the remote filter/sort state is unchanged. Another buyer can shift
/// rows between read and purchase; the scheduler accepts that race and
/// retries on the next pass.
#[derive(Debug, Clone)]
pub struct OfferRow {
    /// 0-based page among the paginated result pages.
    pub page_number: usize,
    /// 0-based position within that page's table.
    pub row_index: usize,
    /// Usage wear in hours.
    pub hours_flown: u32,
    /// All cell values in column order, untouched.
    pub cells: Vec<String>,
}

/// An extracted offer table: one page, or the multi-page concatenation.
#[derive(Debug, Clone, Default)]
pub struct OfferTable {
    pub headers: Vec<String>,
    pub rows: Vec<OfferRow>,
}

impl OfferTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Extract the offer table from one rendered results page.
///
/// Returns an empty table when the page carries no table at all (no current
/// supply). A `Hours flown` cell that fails integer coercion is fatal for
/// the page ([`SessionError::MalformedTable`]); the caller skips the page.
pub fn extract_offer_table(html: &str) -> Result<OfferTable, SessionError> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").unwrap();
    let row_sel = Selector::parse("tr").unwrap();
    let cell_sel = Selector::parse("td, th").unwrap();

    let Some(table) = document.select(&table_sel).next() else {
        return Ok(OfferTable::default());
    };

    let all_rows: Vec<Vec<String>> = table
        .select(&row_sel)
        .map(|tr| {
            tr.select(&cell_sel)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect()
        })
        .collect();

    // Header row plus the trailing pager row bracket the data rows.
    if all_rows.len() < 2 {
        return Ok(OfferTable::default());
    }
    let headers = all_rows[0].clone();
    let data_rows = &all_rows[1..all_rows.len() - 1];

    let hours_idx = headers
        .iter()
        .position(|h| h == HOURS_COLUMN)
        .ok_or_else(|| {
            SessionError::MalformedTable(format!("no \"{HOURS_COLUMN}\" column in {headers:?}"))
        })?;

    let mut rows = Vec::with_capacity(data_rows.len());
    for (row_index, cells) in data_rows.iter().enumerate() {
        let raw = cells.get(hours_idx).map(String::as_str).unwrap_or("");
        let hours_flown = parse_hours(raw).ok_or_else(|| {
            SessionError::MalformedTable(format!(
                "row {row_index}: \"{raw}\" is not a valid {HOURS_COLUMN} value"
            ))
        })?;
        rows.push(OfferRow {
            page_number: 0,
            row_index,
            hours_flown,
            cells: cells.clone(),
        });
    }

    Ok(OfferTable { headers, rows })
}

/// Coerce an hours cell to an integer. Thousands separators are tolerated;
/// anything else is a malformed cell.
fn parse_hours(raw: &str) -> Option<u32> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results_page(hours: &[&str]) -> String {
        let mut html = String::from(
            "<html><body><table>\
             <tr><th>Aircraft</th><th>Hours flown</th><th>Price</th></tr>",
        );
        for (i, h) in hours.iter().enumerate() {
            html.push_str(&format!(
                "<tr><td><a href='#'>Lease {i}</a></td><td>{h}</td><td>100</td></tr>"
            ));
        }
        html.push_str("<tr><td colspan='3'><a href='#'>1</a> <a href='#'>2</a></td></tr>");
        html.push_str("</table></body></html>");
        html
    }

    #[test]
    fn drops_exactly_the_summary_row() {
        let table = extract_offer_table(&results_page(&["120", "45", "980"])).unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.headers, vec!["Aircraft", "Hours flown", "Price"]);
        let hours: Vec<u32> = table.rows.iter().map(|r| r.hours_flown).collect();
        assert_eq!(hours, vec![120, 45, 980]);
    }

    #[test]
    fn row_indices_are_per_page_and_zero_based() {
        let table = extract_offer_table(&results_page(&["1", "2"])).unwrap();
        assert_eq!(table.rows[0].row_index, 0);
        assert_eq!(table.rows[1].row_index, 1);
        assert_eq!(table.rows[0].page_number, 0);
    }

    #[test]
    fn descriptive_cells_pass_through() {
        let table = extract_offer_table(&results_page(&["7"])).unwrap();
        assert_eq!(table.rows[0].cells, vec!["Lease 0", "7", "100"]);
    }

    #[test]
    fn thousands_separators_are_tolerated() {
        let table = extract_offer_table(&results_page(&["1,234"])).unwrap();
        assert_eq!(table.rows[0].hours_flown, 1234);
    }

    #[test]
    fn non_numeric_hours_is_malformed() {
        let err = extract_offer_table(&results_page(&["120", "n/a"])).unwrap_err();
        assert!(matches!(err, SessionError::MalformedTable(_)));
        assert!(!err.is_session_fatal());
    }

    #[test]
    fn missing_hours_column_is_malformed() {
        let html = "<table><tr><th>Aircraft</th></tr>\
                    <tr><td>x</td></tr><tr><td>pager</td></tr></table>";
        let err = extract_offer_table(html).unwrap_err();
        assert!(matches!(err, SessionError::MalformedTable(_)));
    }

    #[test]
    fn pages_without_a_table_yield_nothing() {
        let table = extract_offer_table("<html><body><p>No leases.</p></body></html>").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn header_plus_pager_only_yields_nothing() {
        let html = "<table><tr><th>Aircraft</th><th>Hours flown</th></tr>\
                    <tr><td colspan='2'>1 2 3</td></tr></table>";
        let table = extract_offer_table(html).unwrap();
        assert!(table.is_empty());
    }
}
