//! Bulk rate miner: merges raw rate documents into a complete, gap-filled
//! calendar.
//!
//! Each document is a workbook whose sheets carry one official value date
//! and two reference rates at fixed cell positions. Observations are merged
//! last-write-wins into a flat date table, then the inclusive observed range
//! is walked day by day: observed days become trading records, gaps carry
//! the last known rates forward. The walk never fills backward and never
//! interpolates.

use crate::amounts::clean_amount;
use crate::calendar::CalendarStore;
use crate::dates::format_friendly;
use crate::error::{FlowError, Result};
use crate::schema::{CellValue, DocumentSchema, RateDocument, RateRecord, RateSheet};
use chrono::{Days, NaiveDate};
use log::{debug, info, warn};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Observation {
    usd: f64,
    euro: f64,
}

/// Merge all documents into a gap-filled calendar store.
///
/// Unreadable documents are skipped with a warning; the run fails only when
/// no document yields a single valid observation.
pub fn ingest(documents: &[RateDocument], schema: &DocumentSchema) -> Result<CalendarStore> {
    let mut observations: BTreeMap<NaiveDate, Observation> = BTreeMap::new();

    for document in documents {
        let mut found = 0usize;
        for sheet in &document.sheets {
            if let Some((date, obs)) = extract_observation(sheet, schema) {
                // later documents overwrite earlier ones for the same date
                observations.insert(date, obs);
                found += 1;
            }
        }
        if found == 0 {
            warn!(
                "Document '{}' yielded no observations; skipping",
                document.name
            );
        } else {
            debug!("Document '{}': {} observation(s)", document.name, found);
        }
    }

    if observations.is_empty() {
        return Err(FlowError::NoObservations);
    }

    info!(
        "Mined {} dated observations; building gap-filled calendar",
        observations.len()
    );

    Ok(fill_forward(&observations))
}

/// Pull `(value_date, rates)` out of one sheet, or `None` when the sheet
/// does not match the document schema. Non-fatal by design.
fn extract_observation(sheet: &RateSheet, schema: &DocumentSchema) -> Option<(NaiveDate, Observation)> {
    let label = match sheet.cell(&schema.value_date_cell) {
        Some(CellValue::Text(s)) => s,
        _ => return None,
    };
    if !label.contains(&schema.value_date_marker) {
        return None;
    }
    let date = scan_dmy(label)?;

    let usd = sheet.cell(&schema.usd_cell).map(clean_amount)?;
    let euro = sheet.cell(&schema.eur_cell).map(clean_amount)?;
    if usd <= 0.0 || euro <= 0.0 {
        debug!(
            "Sheet '{}': non-positive rates (usd={}, eur={}); ignored",
            sheet.name, usd, euro
        );
        return None;
    }

    Some((date, Observation { usd, euro }))
}

/// Find the first `DD/MM/YYYY` digit pattern inside a label string.
fn scan_dmy(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    if bytes.len() < 10 {
        return None;
    }
    for window in bytes.windows(10) {
        let digits_at =
            |range: std::ops::Range<usize>| window[range].iter().all(u8::is_ascii_digit);
        if !(digits_at(0..2) && window[2] == b'/' && digits_at(3..5) && window[5] == b'/' && digits_at(6..10)) {
            continue;
        }
        let field = |range: std::ops::Range<usize>| -> u32 {
            window[range].iter().fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
        };
        let (day, month, year) = (field(0..2), field(3..5), field(6..10) as i32);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }
    None
}

/// Walk the inclusive observed range chronologically, carrying the last
/// known rates through unobserved days, then order each month
/// most-recent-day-first.
fn fill_forward(observations: &BTreeMap<NaiveDate, Observation>) -> CalendarStore {
    // BTreeMap keys are sorted, so first/last give the range
    let first = *observations.keys().next().expect("checked non-empty");
    let last = *observations.keys().next_back().expect("checked non-empty");

    let mut store = CalendarStore::new();
    let mut running = observations[&first];

    let mut cursor = first;
    while cursor <= last {
        let record = match observations.get(&cursor) {
            Some(obs) => {
                running = *obs;
                RateRecord {
                    fecha: format_friendly(cursor),
                    usd: obs.usd,
                    euro: obs.euro,
                    is_weekend: false,
                }
            }
            None => RateRecord {
                fecha: format_friendly(cursor),
                usd: running.usd,
                euro: running.euro,
                is_weekend: true,
            },
        };
        store.push_record(cursor, record);

        cursor = match cursor.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
    }

    store.reverse_months();
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(label: &str, usd: CellValue, eur: CellValue) -> RateSheet {
        let mut cells = BTreeMap::new();
        cells.insert("D5".to_string(), CellValue::Text(label.to_string()));
        cells.insert("G15".to_string(), usd);
        cells.insert("G11".to_string(), eur);
        RateSheet {
            name: "hoja".to_string(),
            cells,
        }
    }

    fn document(name: &str, sheets: Vec<RateSheet>) -> RateDocument {
        RateDocument {
            name: name.to_string(),
            sheets,
        }
    }

    fn rate_sheet(fecha: &str, usd: f64, eur: f64) -> RateSheet {
        sheet(
            &format!("Fecha Valor: {}", fecha),
            CellValue::Number(usd),
            CellValue::Number(eur),
        )
    }

    #[test]
    fn test_scan_dmy() {
        assert_eq!(
            scan_dmy("Fecha Valor: 13/02/2026"),
            NaiveDate::from_ymd_opt(2026, 2, 13)
        );
        assert_eq!(scan_dmy("Fecha Valor: pendiente"), None);
        assert_eq!(scan_dmy("Fecha Valor: 99/99/2026"), None);
    }

    #[test]
    fn test_fill_forward_between_observations() {
        let docs = vec![document(
            "feb.xls",
            vec![rate_sheet("01/02/2026", 50.0, 54.0), rate_sheet("05/02/2026", 51.0, 55.0)],
        )];

        let store = ingest(&docs, &DocumentSchema::default()).unwrap();
        let feb = store.month_records(2026, 2);
        assert_eq!(feb.len(), 5);

        // most-recent-first ordering
        assert_eq!(feb[0].fecha, "05/02/2026");
        assert_eq!(feb[4].fecha, "01/02/2026");

        // days 2-4 carry day 1's rates, flagged as non-trading
        for record in &feb[1..4] {
            assert_eq!(record.usd, 50.0);
            assert_eq!(record.euro, 54.0);
            assert!(record.is_weekend);
        }
        assert!(!feb[0].is_weekend);
        assert!(!feb[4].is_weekend);
    }

    #[test]
    fn test_no_backward_fill_before_first_observation() {
        let docs = vec![document(
            "mar.xls",
            vec![rate_sheet("03/03/2026", 60.0, 64.0), rate_sheet("06/03/2026", 61.0, 65.0)],
        )];

        let store = ingest(&docs, &DocumentSchema::default()).unwrap();
        let mar = store.month_records(2026, 3);
        assert_eq!(mar.len(), 4);
        assert_eq!(mar.last().unwrap().fecha, "03/03/2026");
    }

    #[test]
    fn test_last_write_wins_per_date() {
        let docs = vec![
            document("old.xls", vec![rate_sheet("10/02/2026", 50.0, 54.0)]),
            document("new.xls", vec![rate_sheet("10/02/2026", 58.0, 62.0)]),
        ];

        let store = ingest(&docs, &DocumentSchema::default()).unwrap();
        let feb = store.month_records(2026, 2);
        assert_eq!(feb.len(), 1);
        assert_eq!(feb[0].usd, 58.0);
    }

    #[test]
    fn test_unreadable_sheets_skipped() {
        let docs = vec![document(
            "mixto.xls",
            vec![
                sheet("Informe semanal", CellValue::Number(1.0), CellValue::Number(1.0)),
                sheet(
                    "Fecha Valor: 12/02/2026",
                    CellValue::Text("".to_string()),
                    CellValue::Number(62.0),
                ),
                rate_sheet("13/02/2026", 58.4, 62.1),
            ],
        )];

        let store = ingest(&docs, &DocumentSchema::default()).unwrap();
        let feb = store.month_records(2026, 2);
        assert_eq!(feb.len(), 1);
        assert_eq!(feb[0].fecha, "13/02/2026");
    }

    #[test]
    fn test_zero_observations_is_an_error() {
        let docs = vec![document("vacio.xls", vec![])];
        let err = ingest(&docs, &DocumentSchema::default()).unwrap_err();
        assert!(matches!(err, FlowError::NoObservations));
    }

    #[test]
    fn test_range_spanning_month_boundary() {
        let docs = vec![document(
            "cierre.xls",
            vec![rate_sheet("30/01/2026", 55.0, 59.0), rate_sheet("02/02/2026", 56.0, 60.0)],
        )];

        let store = ingest(&docs, &DocumentSchema::default()).unwrap();
        assert_eq!(store.month_records(2026, 1).len(), 2); // 30, 31
        assert_eq!(store.month_records(2026, 2).len(), 2); // 1, 2
        let jan = store.month_records(2026, 1);
        assert_eq!(jan[0].fecha, "31/01/2026");
        assert!(jan[0].is_weekend);
    }
}
