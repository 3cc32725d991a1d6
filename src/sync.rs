//! On-demand sync: opportunistic insertion of today's freshly observed
//! quote into the current month.
//!
//! The live source is scraped by an external collaborator under a short
//! timeout; whatever it got (or failed to get) lands here as a
//! [`FreshRate`]. Sync is best-effort by contract: an invalid or duplicate
//! observation is simply not inserted, and the caller serves cached
//! calendar data either way. The caller also owns persisting the mutated
//! year document (read-modify-write, last-write-wins per spec'd
//! concurrency model).

use crate::calendar::CalendarStore;
use crate::schema::{FreshRate, RateRecord};
use log::{debug, info};

/// Insert `fresh` at the head of the month's records unless a record with
/// the same display date already exists or the rates are not both finite
/// positive numbers. Returns whether an insert happened, so the caller
/// knows to persist. Idempotent on repeated identical input.
pub fn sync_month(records: &mut Vec<RateRecord>, fresh: &FreshRate) -> bool {
    if !fresh.is_valid() {
        debug!(
            "Fresh rate for {} rejected (usd={}, eur={})",
            fresh.display_date, fresh.usd, fresh.euro
        );
        return false;
    }

    if records.iter().any(|r| r.fecha == fresh.display_date) {
        debug!("Value date {} already recorded; nothing to sync", fresh.display_date);
        return false;
    }

    records.insert(
        0,
        RateRecord {
            fecha: fresh.display_date.clone(),
            usd: fresh.usd,
            euro: fresh.euro,
            is_weekend: false,
        },
    );
    info!(
        "Synced fresh quote {}: usd={}, eur={}",
        fresh.display_date, fresh.usd, fresh.euro
    );
    true
}

impl CalendarStore {
    /// [`sync_month`] addressed by (year, month). Out-of-range months are
    /// rejected rather than creating a phantom bucket.
    pub fn sync_today(&mut self, year: i32, month: u32, fresh: &FreshRate) -> bool {
        if !(1..=12).contains(&month) {
            debug!("Sync rejected: month {} out of range", month);
            return false;
        }
        sync_month(self.month_records_mut(year, month), fresh)
    }
}
