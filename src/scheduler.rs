//! Acquisition scheduling for one rule against one collected table.

use crate::counters::CounterStore;
use crate::error::SessionError;
use crate::extract::{OfferRow, OfferTable};
use crate::feed::AcquisitionRule;
use crate::session::RemoteSession;
use anyhow::Result;
use tracing::{info, warn};

/// Rows eligible under the rule's hours cutoff, cheapest wear first.
///
/// The sort is stable: rows with equal hours keep their original
/// `(page_number, row_index)` order.
pub fn eligible_offers<'a>(table: &'a OfferTable, max_hours: u32) -> Vec<&'a OfferRow> {
    let mut rows: Vec<&OfferRow> = table
        .rows
        .iter()
        .filter(|r| r.hours_flown < max_hours)
        .collect();
    rows.sort_by_key(|r| r.hours_flown);
    rows
}

/// Drive purchases for one rule until its quota or the eligible supply is
/// exhausted. Returns the number of confirmed purchases.
///
/// The table is the one snapshot collected at the top of the pass and is
/// never re-read mid-loop, so later purchases act on data that may have
/// gone stale; identity is positional and another buyer can win the race.
/// A stalled purchase is therefore logged and skipped, and the next pass
/// picks up whatever is really left.
pub async fn run_rule(
    session: &mut RemoteSession,
    rule: &AcquisitionRule,
    table: &OfferTable,
    counters: &mut CounterStore,
) -> Result<u32> {
    let mut purchased = 0;
    for row in eligible_offers(table, rule.max_hours) {
        if counters.count(&rule.aircraft_type) >= rule.max_airframes {
            break;
        }
        match session.purchase(Some(row.page_number), row.row_index + 1).await {
            Ok(()) => {
                let total = counters.record_purchase(&rule.aircraft_type)?;
                purchased += 1;
                info!(
                    airframe = %rule.aircraft_type,
                    hours = row.hours_flown,
                    total,
                    "lease acquired"
                );
            }
            Err(e @ SessionError::Purchase(_)) => {
                warn!(
                    airframe = %rule.aircraft_type,
                    page = row.page_number,
                    row = row.row_index,
                    "purchase failed, trying next offer: {e}"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(purchased)
}
