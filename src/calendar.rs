//! The rate calendar store: per-year, per-month ordered daily records.
//!
//! Months are kept most-recent-day-first, matching the external year
//! document layout. The store is append-only from the caller's point of
//! view: records are written by the ingestor and by on-demand sync, never
//! deleted. Persistence of the year documents is owned externally; this
//! module only provides the codec.

use crate::dates::{format_friendly, parse_date_str};
use crate::error::{FlowError, Result};
use crate::schema::{RateRecord, YearCalendar};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct CalendarStore {
    years: BTreeMap<i32, YearCalendar>,
}

impl CalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn year(&self, year: i32) -> Option<&YearCalendar> {
        self.years.get(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = (i32, &YearCalendar)> {
        self.years.iter().map(|(y, cal)| (*y, cal))
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Records for one month, most-recent-day-first. Empty slice when the
    /// month has never been populated.
    pub fn month_records(&self, year: i32, month: u32) -> &[RateRecord] {
        self.years
            .get(&year)
            .and_then(|cal| cal.get(&month))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn month_records_mut(&mut self, year: i32, month: u32) -> &mut Vec<RateRecord> {
        self.years.entry(year).or_default().entry(month).or_default()
    }

    /// Append a record to its (year, month) bucket in arrival order.
    /// The ingestor builds chronologically and reverses per month at the
    /// end; sync prepends directly.
    pub(crate) fn push_record(&mut self, date: NaiveDate, record: RateRecord) {
        self.month_records_mut(date.year(), date.month()).push(record);
    }

    /// Replace a whole year from a deserialized year document.
    pub fn insert_year(&mut self, year: i32, calendar: YearCalendar) {
        self.years.insert(year, calendar);
    }

    /// Flip every month bucket in place. The ingestor appends
    /// chronologically and calls this once to restore the
    /// most-recent-day-first invariant.
    pub(crate) fn reverse_months(&mut self) {
        for calendar in self.years.values_mut() {
            for records in calendar.values_mut() {
                records.reverse();
            }
        }
    }

    /// Serialize one year in the external document shape
    /// `{ "2": [ {fecha, usd, euro, isWeekend}, ... ], ... }`.
    pub fn year_to_json(&self, year: i32) -> Result<String> {
        let calendar = self
            .years
            .get(&year)
            .ok_or_else(|| FlowError::CalendarDocument(format!("year {} not loaded", year)))?;
        Ok(serde_json::to_string_pretty(calendar)?)
    }

    /// Load one year from its external document.
    pub fn load_year_json(&mut self, year: i32, json: &str) -> Result<()> {
        let calendar: YearCalendar = serde_json::from_str(json)?;
        if let Some(month) = calendar.keys().find(|m| !(1..=12).contains(*m)) {
            return Err(FlowError::InvalidMonth(*month));
        }
        self.years.insert(year, calendar);
        Ok(())
    }

    /// Chronological view of a month for charting: days 1 through the last
    /// recorded day, gaps carrying the last valid rates. Never extends past
    /// the last recorded day and never fills backward before the first.
    pub fn fill_month(&self, year: i32, month: u32) -> Result<Vec<RateRecord>> {
        if !(1..=12).contains(&month) {
            return Err(FlowError::InvalidMonth(month));
        }

        let records = self.month_records(year, month);
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let mut dated: Vec<(NaiveDate, &RateRecord)> = records
            .iter()
            .filter_map(|r| r.date().map(|d| (d, r)))
            .collect();
        dated.sort_by_key(|(d, _)| *d);

        let Some(((first_day, first), (last_day, _))) =
            dated.first().copied().zip(dated.last().copied())
        else {
            return Ok(Vec::new());
        };

        let mut filled = Vec::new();
        let (mut usd, mut euro) = (first.usd, first.euro);

        for day in first_day.day()..=last_day.day() {
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                continue;
            };
            match dated.iter().find(|(d, _)| *d == date) {
                Some((_, record)) => {
                    usd = record.usd;
                    euro = record.euro;
                    filled.push((*record).clone());
                }
                None => filled.push(RateRecord {
                    fecha: format_friendly(date),
                    usd,
                    euro,
                    is_weekend: true,
                }),
            }
        }

        Ok(filled)
    }

    /// Latest recorded calendar date across the whole store, if any record
    /// carries a parseable date.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.years
            .values()
            .flat_map(|cal| cal.values())
            .flatten()
            .filter_map(|r| parse_date_str(&r.fecha))
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fecha: &str, usd: f64, weekend: bool) -> RateRecord {
        RateRecord {
            fecha: fecha.to_string(),
            usd,
            euro: usd + 4.0,
            is_weekend: weekend,
        }
    }

    #[test]
    fn test_month_records_missing_is_empty() {
        let store = CalendarStore::new();
        assert!(store.month_records(2026, 2).is_empty());
    }

    #[test]
    fn test_year_document_round_trip() {
        let mut store = CalendarStore::new();
        let mut feb = Vec::new();
        feb.push(record("03/02/2026", 58.6, false));
        feb.push(record("02/02/2026", 58.5, false));
        feb.push(record("01/02/2026", 58.5, true));
        let mut calendar = YearCalendar::new();
        calendar.insert(2, feb.clone());
        store.insert_year(2026, calendar);

        let json = store.year_to_json(2026).unwrap();
        assert!(json.contains("\"isWeekend\": true"));

        let mut reloaded = CalendarStore::new();
        reloaded.load_year_json(2026, &json).unwrap();
        assert_eq!(reloaded.month_records(2026, 2), feb.as_slice());
    }

    #[test]
    fn test_load_rejects_impossible_month() {
        let mut store = CalendarStore::new();
        let err = store
            .load_year_json(2026, r#"{"13": []}"#)
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidMonth(13)));
    }

    #[test]
    fn test_fill_month_carries_gaps_forward() {
        let mut store = CalendarStore::new();
        let mut calendar = YearCalendar::new();
        calendar.insert(
            3,
            vec![record("05/03/2026", 60.0, false), record("02/03/2026", 59.0, false)],
        );
        store.insert_year(2026, calendar);

        let filled = store.fill_month(2026, 3).unwrap();
        let fechas: Vec<&str> = filled.iter().map(|r| r.fecha.as_str()).collect();
        assert_eq!(
            fechas,
            ["02/03/2026", "03/03/2026", "04/03/2026", "05/03/2026"]
        );
        // gap days carry day 2's rate, flagged as carried
        assert_eq!(filled[1].usd, 59.0);
        assert!(filled[1].is_weekend);
        assert_eq!(filled[3].usd, 60.0);
        // nothing before the first or after the last observed day
        assert_eq!(filled.len(), 4);
    }

    #[test]
    fn test_fill_month_empty_month() {
        let store = CalendarStore::new();
        assert!(store.fill_month(2026, 1).unwrap().is_empty());
        assert!(store.fill_month(2026, 13).is_err());
    }

    #[test]
    fn test_latest_date() {
        let mut store = CalendarStore::new();
        let mut calendar = YearCalendar::new();
        calendar.insert(1, vec![record("31/01/2026", 57.0, false)]);
        calendar.insert(2, vec![record("02/02/2026", 58.0, false)]);
        store.insert_year(2026, calendar);
        assert_eq!(
            store.latest_date(),
            NaiveDate::from_ymd_opt(2026, 2, 2)
        );
    }
}
