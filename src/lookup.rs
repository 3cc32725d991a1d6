//! Historical rate lookup with bounded backward fallback.
//!
//! A requested date may fall on a day with no quote (weekend record pruned,
//! freshly synced month with gaps, or a date just outside the mined range).
//! Lookup steps backward one day at a time, re-resolving month and year at
//! boundaries, for at most [`MAX_LOOKBACK_DAYS`] attempts: long enough to
//! bridge a weekend plus an extended holiday, short enough never to value a
//! movement with a stale quote from weeks earlier.

use crate::calendar::CalendarStore;
use crate::dates::format_friendly;
use crate::schema::RateRecord;
use chrono::{Datelike, NaiveDate};
use log::debug;

pub const MAX_LOOKBACK_DAYS: u32 = 7;

/// A resolved lookup. `exact` is false when the record belongs to an
/// earlier day than the one requested.
#[derive(Debug, Clone, PartialEq)]
pub struct RateMatch {
    pub record: RateRecord,
    pub resolved: NaiveDate,
    pub exact: bool,
}

/// Resolve `requested` to a calendar record, walking backward up to
/// [`MAX_LOOKBACK_DAYS`] attempts. `None` after the window is exhausted.
pub fn find_rate(store: &CalendarStore, requested: NaiveDate) -> Option<RateMatch> {
    let mut cursor = requested;

    for _ in 0..MAX_LOOKBACK_DAYS {
        let display = format_friendly(cursor);
        let hit = store
            .month_records(cursor.year(), cursor.month())
            .iter()
            .find(|record| record.fecha == display);

        if let Some(record) = hit {
            if cursor != requested {
                debug!(
                    "No quote for {}; using {} instead",
                    format_friendly(requested),
                    display
                );
            }
            return Some(RateMatch {
                record: record.clone(),
                resolved: cursor,
                exact: cursor == requested,
            });
        }

        cursor = cursor.pred_opt()?;
    }

    None
}

/// The quote in effect "now": `today` resolved through the backward window,
/// falling back to the newest record anywhere in the store when even that
/// misses (e.g. the store has not been mined for over a week).
pub fn current_rate(store: &CalendarStore, today: NaiveDate) -> Option<RateMatch> {
    if let Some(found) = find_rate(store, today) {
        return Some(found);
    }

    let latest = store.latest_date()?;
    find_rate(store, latest).map(|found| RateMatch {
        exact: found.resolved == today,
        ..found
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::YearCalendar;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn store_with(records: &[(&str, u32, f64)]) -> CalendarStore {
        // (fecha, month, usd)
        let mut store = CalendarStore::new();
        let mut years: std::collections::BTreeMap<i32, YearCalendar> =
            std::collections::BTreeMap::new();
        for (fecha, month, usd) in records {
            let year: i32 = fecha[6..].parse().unwrap();
            years
                .entry(year)
                .or_default()
                .entry(*month)
                .or_default()
                .insert(
                    0,
                    RateRecord {
                        fecha: fecha.to_string(),
                        usd: *usd,
                        euro: *usd + 4.0,
                        is_weekend: false,
                    },
                );
        }
        for (year, calendar) in years {
            store.insert_year(year, calendar);
        }
        store
    }

    #[test]
    fn test_exact_match() {
        let store = store_with(&[("13/02/2026", 2, 58.4)]);
        let found = find_rate(&store, d(2026, 2, 13)).unwrap();
        assert!(found.exact);
        assert_eq!(found.record.usd, 58.4);
        assert_eq!(found.resolved, d(2026, 2, 13));
    }

    #[test]
    fn test_sunday_falls_back_to_friday() {
        // Friday 13/02 quoted, Sunday 15/02 requested
        let store = store_with(&[("13/02/2026", 2, 58.4)]);
        let found = find_rate(&store, d(2026, 2, 15)).unwrap();
        assert!(!found.exact);
        assert_eq!(found.resolved, d(2026, 2, 13));
        assert_eq!(found.record.fecha, "13/02/2026");
    }

    #[test]
    fn test_fallback_crosses_month_and_year() {
        let store = store_with(&[("30/12/2025", 12, 55.0)]);
        let found = find_rate(&store, d(2026, 1, 2)).unwrap();
        assert!(!found.exact);
        assert_eq!(found.resolved, d(2025, 12, 30));
    }

    #[test]
    fn test_gives_up_after_seven_attempts() {
        // 8 days earlier is one step past the window
        let store = store_with(&[("05/02/2026", 2, 58.0)]);
        assert!(find_rate(&store, d(2026, 2, 12)).is_none());
        // 6 days earlier is still inside it
        assert!(find_rate(&store, d(2026, 2, 11)).is_some());
    }

    #[test]
    fn test_empty_store() {
        let store = CalendarStore::new();
        assert!(find_rate(&store, d(2026, 2, 13)).is_none());
    }

    #[test]
    fn test_current_rate_falls_back_to_latest() {
        let store = store_with(&[("02/01/2026", 1, 56.0)]);
        // three weeks later: window misses, latest record is used
        let found = current_rate(&store, d(2026, 1, 23)).unwrap();
        assert!(!found.exact);
        assert_eq!(found.resolved, d(2026, 1, 2));
        assert_eq!(found.record.fecha, "02/01/2026");
    }
}
