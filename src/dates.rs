//! Heuristic date normalization.
//!
//! Uploaded ledgers and mined rate documents carry dates as spreadsheet
//! epoch serials, native dates or strings in half a dozen separators and
//! orderings. Everything here is total: bad input yields `None`, never a
//! panic or an error, and callers render `None` as `"---"`.

use crate::schema::CellValue;
use chrono::{DateTime, Datelike, Days, NaiveDate};

/// Day zero of the spreadsheet 1900 date system. Using Dec 30 (not 31)
/// absorbs the system's historical leap-year quirk.
const SPREADSHEET_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Explicit ordering hint for callers that know their source convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    DayFirst,
    MonthFirst,
}

/// Parse any cell into a calendar date. Total over all cell shapes.
pub fn parse_any_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Number(n) => from_serial(*n),
        CellValue::Text(s) => parse_date_str(s),
        CellValue::Empty => None,
    }
}

/// Spreadsheet serial to date. Serials below 1 or implausibly large are
/// rejected rather than mapped to far-out dates.
fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 200_000.0 {
        return None;
    }
    let (y, m, d) = SPREADSHEET_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial.trunc() as u64))
}

/// Heuristic string parse: normalize `-` and `.` separators to `/`, split
/// into three parts; a 4-digit leading part reads as `YEAR/MONTH/DAY`,
/// anything else as `DAY/MONTH/YEAR`, and 2-digit years get `20` prefixed.
pub fn parse_date_str(input: &str) -> Option<NaiveDate> {
    let clean = input.trim().replace(['-', '.'], "/");
    let parts: Vec<&str> = clean.split('/').map(str::trim).collect();

    if parts.len() == 3 {
        let built = if parts[0].len() == 4 {
            build_date(parts[0], parts[1], parts[2])
        } else {
            build_date(parts[2], parts[1], parts[0])
        };
        if built.is_some() {
            return built;
        }
    }

    parse_generic(input)
}

/// Same as [`parse_date_str`] but with the day/month ordering pinned by the
/// caller instead of inferred. Year-first input is honored either way.
pub fn parse_date_str_with_order(input: &str, order: DateOrder) -> Option<NaiveDate> {
    let clean = input.trim().replace(['-', '.'], "/");
    let parts: Vec<&str> = clean.split('/').map(str::trim).collect();

    if parts.len() == 3 {
        let built = if parts[0].len() == 4 {
            build_date(parts[0], parts[1], parts[2])
        } else {
            match order {
                DateOrder::DayFirst => build_date(parts[2], parts[1], parts[0]),
                DateOrder::MonthFirst => build_date(parts[2], parts[0], parts[1]),
            }
        };
        if built.is_some() {
            return built;
        }
    }

    parse_generic(input)
}

fn build_date(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let year = if year.len() == 2 {
        format!("20{}", year)
    } else {
        year.to_string()
    };

    let y: i32 = year.parse().ok()?;
    let m: u32 = month.parse().ok()?;
    let d: u32 = day.parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Last-resort parse over a short fixed format list.
fn parse_generic(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    for fmt in ["%Y-%m-%d", "%d %B %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(input, fmt) {
            return Some(d);
        }
    }
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Canonical display form, `DD/MM/YYYY`.
pub fn format_friendly(date: NaiveDate) -> String {
    format!("{:02}/{:02}/{}", date.day(), date.month(), date.year())
}

/// The month-first reading of the same display string: day and month
/// swapped. `None` when the swap is not a real date (day > 12).
pub fn swap_day_month(date: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year(), date.day(), date.month())
}

/// Parse a long-form Spanish value date as published by the live source,
/// e.g. `"Jueves, 12 Febrero 2026"`. Returns the calendar date.
pub fn parse_spanish_long_date(input: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    for window in tokens.windows(3) {
        let (day, name, year) = (window[0], window[1], window[2]);
        if day.len() > 2 || year.len() != 4 {
            continue;
        }
        let (Ok(d), Ok(y)) = (day.parse::<u32>(), year.parse::<i32>()) else {
            continue;
        };
        if let Some(m) = spanish_month(name) {
            return NaiveDate::from_ymd_opt(y, m, d);
        }
    }
    None
}

fn spanish_month(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "enero" => 1,
        "febrero" => 2,
        "marzo" => 3,
        "abril" => 4,
        "mayo" => 5,
        "junio" => 6,
        "julio" => 7,
        "agosto" => 8,
        "septiembre" => 9,
        "octubre" => 10,
        "noviembre" => 11,
        "diciembre" => 12,
        _ => return None,
    };
    Some(month)
}
