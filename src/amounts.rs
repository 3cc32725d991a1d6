//! Locale-free amount normalization.
//!
//! Ledger uploads mix `1.234,56` and `1,234.56` styles, sometimes with
//! currency symbols attached. The decimal separator is decided per value:
//! whichever of the last comma and last dot appears later wins, and the
//! other is stripped as a thousands separator.

use crate::schema::CellValue;

/// Normalize any cell to a signed decimal. Total: null, empty, dates and
/// unparseable text all map to 0.0.
pub fn clean_amount(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Number(_) => 0.0,
        CellValue::Text(s) => clean_amount_str(s),
        CellValue::Date(_) | CellValue::Empty => 0.0,
    }
}

/// String form of [`clean_amount`].
pub fn clean_amount_str(input: &str) -> f64 {
    let mut s: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let last_comma = s.rfind(',');
    let last_dot = s.rfind('.');

    match (last_comma, last_dot) {
        (Some(c), d) if d.map_or(true, |d| c > d) => {
            // comma-decimal: dots are thousands separators
            s = s.replace('.', "");
            // only the last comma is the decimal; earlier ones are thousands
            if let Some(decimal_at) = s.rfind(',') {
                let (int_part, frac) = s.split_at(decimal_at);
                s = format!("{}.{}", int_part.replace(',', ""), &frac[1..]);
            }
        }
        (Some(_), Some(_)) => {
            // dot-decimal: commas are thousands separators
            s = s.replace(',', "");
        }
        _ => {}
    }

    s.parse::<f64>().unwrap_or(0.0)
}
