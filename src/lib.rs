//! # Bolívar Flow
//!
//! Reconciliation and audit engine for a foreign-exchange rate monitor.
//! Authoritative daily exchange-rate observations are mined into a
//! gap-filled historical calendar, and uploaded bank ledgers are reconciled
//! against that calendar to compare the theoretical accumulated balance
//! with the realized market-valued balance — the cambiario differential.
//!
//! ## Core concepts
//!
//! - **Value date**: the date an official exchange rate takes effect.
//! - **Fill-forward**: unobserved days carry the last observed rates,
//!   flagged as non-trading; never backward, never interpolated.
//! - **Theoretical balance**: sum of the ledger's converted movements.
//! - **Realized balance**: the stated closing balance valued at the
//!   closing rate.
//! - **Differential**: realized minus theoretical; the audit signal.
//!
//! Transport, persistence and rendering live outside this crate: documents
//! arrive as pre-read cell grids, and year calendars leave as JSON
//! documents the caller stores.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bolivar_flow::*;
//!
//! let store = ingest(&documents, &DocumentSchema::default())?;
//! let report = analyze_ledger(&grid, &LedgerLayout::default(), &store, Currency::Usd)?;
//! println!("differential: {:.2}", report.summary.differential);
//! ```

pub mod amounts;
pub mod calendar;
pub mod dates;
pub mod error;
pub mod ingest;
pub mod lookup;
pub mod reconcile;
pub mod schema;
pub mod sync;

pub use amounts::{clean_amount, clean_amount_str};
pub use calendar::CalendarStore;
pub use dates::{
    format_friendly, parse_any_date, parse_date_str, parse_date_str_with_order,
    parse_spanish_long_date, swap_day_month, DateOrder,
};
pub use error::{FlowError, Result};
pub use ingest::ingest;
pub use lookup::{current_rate, find_rate, RateMatch, MAX_LOOKBACK_DAYS};
pub use reconcile::{parse_ledger, reconcile, CLOSING_SENTINEL, DATE_PLACEHOLDER};
pub use schema::*;
pub use sync::sync_month;

use log::debug;

/// One-call upload path: parse a raw ledger grid and reconcile it against
/// the calendar for the selected currency.
pub fn analyze_ledger(
    grid: &[Vec<CellValue>],
    layout: &LedgerLayout,
    store: &CalendarStore,
    currency: Currency,
) -> Result<DifferentialReport> {
    let rows = parse_ledger(grid, layout);
    debug!(
        "Parsed {} ledger row(s) from a grid of {} (header offset {})",
        rows.len(),
        grid.len(),
        layout.header_rows
    );
    reconcile(&rows, store, currency)
}
