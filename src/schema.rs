use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single spreadsheet cell as it arrives from an upstream document reader.
///
/// Upstream collaborators hand us untyped tabular data: dates may come as
/// spreadsheet epoch serials, native dates or free-form strings, and amounts
/// as numbers or locale-formatted text. Every normalizer in this crate
/// accepts a `CellValue` and is total over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Date(NaiveDate),
    #[default]
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// One day in the rate calendar, in the external year-document wire shape.
///
/// `fecha` is the display date `DD/MM/YYYY`; `is_weekend` marks carried
/// (fill-forward) values rather than fresh observations. The wire key
/// predates holiday handling: non-trading holidays are flagged through it
/// as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub fecha: String,
    pub usd: f64,
    pub euro: f64,
    #[serde(rename = "isWeekend")]
    pub is_weekend: bool,
}

impl RateRecord {
    /// Calendar date behind the display string, when it parses.
    pub fn date(&self) -> Option<NaiveDate> {
        crate::dates::parse_date_str(&self.fecha)
    }

    pub fn rate_for(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Usd => self.usd,
            Currency::Euro => self.euro,
        }
    }
}

/// Month (1-12) to records, most-recent-day-first within each month.
pub type YearCalendar = BTreeMap<u32, Vec<RateRecord>>;

/// One freshly observed quote from the live source, used by on-demand sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreshRate {
    /// Official value date as published, `DD/MM/YYYY`.
    pub display_date: String,
    pub usd: f64,
    pub euro: f64,
}

impl FreshRate {
    /// Both rates must be finite and strictly positive to be usable.
    pub fn is_valid(&self) -> bool {
        self.usd.is_finite() && self.usd > 0.0 && self.euro.is_finite() && self.euro > 0.0
    }
}

/// Currency selector for reconciliation. The calendar always carries both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Euro,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Usd => write!(f, "USD"),
            Currency::Euro => write!(f, "EUR"),
        }
    }
}

/// A sheet of a raw rate document: cell address (`"D5"`) to value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateSheet {
    pub name: String,
    pub cells: BTreeMap<String, CellValue>,
}

impl RateSheet {
    pub fn cell(&self, address: &str) -> Option<&CellValue> {
        self.cells.get(address)
    }
}

/// One externally retrieved rate document (e.g. a downloaded workbook).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateDocument {
    pub name: String,
    pub sheets: Vec<RateSheet>,
}

/// Named cell roles for rate documents.
///
/// The official workbooks put the value-date label and the two reference
/// rates at fixed coordinates. Keeping the coordinates as configuration
/// means a layout change in the source is a config edit, not a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSchema {
    /// Cell holding the value-date label.
    pub value_date_cell: String,
    /// Marker phrase that must appear in the label for the sheet to count.
    pub value_date_marker: String,
    pub usd_cell: String,
    pub eur_cell: String,
}

impl Default for DocumentSchema {
    fn default() -> Self {
        Self {
            value_date_cell: "D5".to_string(),
            value_date_marker: "Fecha Valor:".to_string(),
            usd_cell: "G15".to_string(),
            eur_cell: "G11".to_string(),
        }
    }
}

/// One ledger row as uploaded: date, concept and the two amount columns
/// (debit = outflow in Bs, credit = inflow in Bs), all still raw cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRow {
    pub fecha: CellValue,
    pub concepto: String,
    pub debe: CellValue,
    pub haber: CellValue,
}

/// Layout of the uploaded ledger sheet. Column order is fixed
/// (`Fecha, Concepto, Debe, Haber`); only the header offset varies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerLayout {
    /// Rows to skip before the data table starts.
    pub header_rows: usize,
}

impl Default for LedgerLayout {
    fn default() -> Self {
        Self { header_rows: 5 }
    }
}

/// One movement after reconciliation: the resolved rate and the converted
/// amounts, ready for rendering or export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementDetail {
    /// Display date of the rate actually applied, or the row's own date
    /// (`"---"` when unparseable) if no rate was found.
    pub fecha: String,
    /// Rate applied; 0.0 when no rate could be resolved.
    pub tasa: f64,
    /// Net movement in Bs (credit minus debit).
    pub monto_bs: f64,
    /// Net movement in the selected currency; 0.0 when the rate is missing.
    pub monto_divisa: f64,
    /// Foreign-currency inflow (credit rows only).
    pub ingreso_divisa: f64,
    /// Foreign-currency outflow, absolute (debit rows only).
    pub egreso_divisa: f64,
}

/// Aggregate outcome of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifferentialResult {
    /// Accumulated converted flows: total inflow minus total outflow.
    pub theoretical_balance: f64,
    /// Stated closing balance valued at the closing rate.
    pub realized_balance: f64,
    /// Realized minus theoretical; the audit signal.
    pub differential: f64,
    /// Differential over |theoretical|, in percent. 0 when theoretical is 0.
    pub percent_variance: f64,
    /// Rate used to value the closing balance; 0.0 if unresolved.
    pub closing_rate: f64,
    /// Display date of the closing rate (or of the closing row).
    pub closing_date: String,
    /// Stated closing balance in Bs.
    pub closing_balance_bs: f64,
    pub total_inflow: f64,
    pub total_outflow: f64,
}

/// Full reconciliation output: enriched movements plus the summary.
/// Ephemeral; recomputed whenever the currency selection changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferentialReport {
    pub currency: Currency,
    pub movements: Vec<MovementDetail>,
    pub summary: DifferentialResult,
}
