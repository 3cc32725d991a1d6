//! The differential engine: reconciles an uploaded bank ledger against the
//! rate calendar.
//!
//! Movements are converted to foreign currency at each day's resolved rate
//! and accumulated into a theoretical balance; the ledger's stated closing
//! balance is valued at the closing rate into the realized balance. The
//! difference between the two is the cambiario differential this crate
//! exists to surface.
//!
//! The whole pass is pure: rerunning with a different currency over the
//! same parsed inputs yields a fresh deterministic report and never touches
//! the calendar store.

use crate::amounts::clean_amount;
use crate::calendar::CalendarStore;
use crate::dates::{format_friendly, parse_any_date, swap_day_month};
use crate::error::{FlowError, Result};
use crate::lookup::{find_rate, RateMatch};
use crate::schema::{
    CellValue, Currency, DifferentialReport, DifferentialResult, LedgerLayout, LedgerRow,
    MovementDetail,
};
use log::{debug, info};

/// Concept text marking the ledger's terminal stated-balance row.
pub const CLOSING_SENTINEL: &str = "SALDO FINAL";

/// Unresolvable dates render as this placeholder.
pub const DATE_PLACEHOLDER: &str = "---";

/// Map a raw cell grid into ledger rows. The column order is fixed
/// (`Fecha, Concepto, Debe, Haber`); `layout.header_rows` leading rows are
/// dropped, as are rows with an empty date cell or the repeated literal
/// header text.
pub fn parse_ledger(grid: &[Vec<CellValue>], layout: &LedgerLayout) -> Vec<LedgerRow> {
    grid.iter()
        .skip(layout.header_rows)
        .filter_map(|cells| {
            let fecha = cells.first().cloned().unwrap_or_default();
            if fecha.is_empty() {
                return None;
            }
            if matches!(&fecha, CellValue::Text(s) if s.trim() == "Fecha") {
                return None;
            }

            let concepto = match cells.get(1) {
                Some(CellValue::Text(s)) => s.clone(),
                Some(CellValue::Number(n)) => n.to_string(),
                _ => String::new(),
            };

            Some(LedgerRow {
                fecha,
                concepto,
                debe: cells.get(2).cloned().unwrap_or_default(),
                haber: cells.get(3).cloned().unwrap_or_default(),
            })
        })
        .collect()
}

/// Reconcile parsed ledger rows against the calendar for one currency.
pub fn reconcile(
    rows: &[LedgerRow],
    store: &CalendarStore,
    currency: Currency,
) -> Result<DifferentialReport> {
    if rows.len() < 2 {
        return Err(FlowError::NoLedgerData(format!(
            "{} row(s); need movements and a closing balance",
            rows.len()
        )));
    }

    let closing_index = rows
        .iter()
        .position(|row| row.concepto.to_uppercase().contains(CLOSING_SENTINEL));
    let (movements, closing) = match closing_index {
        Some(index) => (&rows[..index], &rows[index]),
        // no sentinel: the last row is taken as the closing balance
        None => (&rows[..rows.len() - 1], &rows[rows.len() - 1]),
    };

    if movements.is_empty() {
        return Err(FlowError::NoLedgerData(
            "closing balance without movements".to_string(),
        ));
    }

    let mut details = Vec::with_capacity(movements.len());
    let mut dated_rows = 0usize;
    let mut total_inflow = 0.0;
    let mut total_outflow = 0.0;

    for row in movements {
        let (display, matched) = resolve_row(store, &row.fecha);
        if display != DATE_PLACEHOLDER {
            dated_rows += 1;
        }

        let rate = matched.as_ref().map_or(0.0, |m| m.record.rate_for(currency));
        let inflow_bs = clean_amount(&row.haber);
        let outflow_bs = clean_amount(&row.debe);
        let net_bs = inflow_bs - outflow_bs;
        let net_fx = if rate > 0.0 { net_bs / rate } else { 0.0 };

        let detail = MovementDetail {
            fecha: display,
            tasa: rate,
            monto_bs: net_bs,
            monto_divisa: net_fx,
            ingreso_divisa: if inflow_bs > 0.0 { net_fx } else { 0.0 },
            egreso_divisa: if outflow_bs > 0.0 { net_fx.abs() } else { 0.0 },
        };
        total_inflow += detail.ingreso_divisa;
        total_outflow += detail.egreso_divisa;
        details.push(detail);
    }

    if dated_rows == 0 {
        return Err(FlowError::NoLedgerData(
            "no movement row has a parseable date".to_string(),
        ));
    }

    let theoretical_balance = total_inflow - total_outflow;

    let (closing_date, closing_match) = resolve_row(store, &closing.fecha);
    let closing_rate = closing_match
        .as_ref()
        .map_or(0.0, |m| m.record.rate_for(currency));
    let closing_balance_bs = clean_amount(&closing.haber);
    let realized_balance = if closing_rate > 0.0 {
        closing_balance_bs / closing_rate
    } else {
        0.0
    };

    let differential = realized_balance - theoretical_balance;
    let percent_variance = if theoretical_balance != 0.0 {
        differential / theoretical_balance.abs() * 100.0
    } else {
        0.0
    };

    info!(
        "Reconciled {} movement(s) in {}: theoretical {:.2}, realized {:.2}, differential {:.2} ({:.2}%)",
        details.len(),
        currency,
        theoretical_balance,
        realized_balance,
        differential,
        percent_variance
    );

    Ok(DifferentialReport {
        currency,
        movements: details,
        summary: DifferentialResult {
            theoretical_balance,
            realized_balance,
            differential,
            percent_variance,
            closing_rate,
            closing_date,
            closing_balance_bs,
            total_inflow,
            total_outflow,
        },
    })
}

/// Resolve a row's date cell to a display string and a calendar match.
///
/// Uploads are inconsistently authored, so the date is tried under both the
/// day-first reading and the month-first (day/month swapped) reading; the
/// first reading that lands on a quote wins. An unparseable date yields the
/// `"---"` placeholder and no match; a parseable date with no quote in the
/// lookup window keeps its own display string.
fn resolve_row(store: &CalendarStore, fecha: &CellValue) -> (String, Option<RateMatch>) {
    let Some(date) = parse_any_date(fecha) else {
        return (DATE_PLACEHOLDER.to_string(), None);
    };

    if let Some(found) = find_rate(store, date) {
        return (found.record.fecha.clone(), Some(found));
    }

    if let Some(swapped) = swap_day_month(date) {
        if let Some(found) = find_rate(store, swapped) {
            debug!(
                "Rate for {} found under month-first reading {}",
                format_friendly(date),
                found.record.fecha
            );
            return (found.record.fecha.clone(), Some(found));
        }
    }

    (format_friendly(date), None)
}
