use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("No valid rate observations found in any source document")]
    NoObservations,

    #[error("Ledger contains no usable movement data: {0}")]
    NoLedgerData(String),

    #[error("Invalid month {0}: must be between 1 and 12")]
    InvalidMonth(u32),

    #[error("Calendar document error: {0}")]
    CalendarDocument(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
