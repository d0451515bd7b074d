use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    /// Raised only at write boundaries: persisting a cell under a non-canonical
    /// identifier would misstate every downstream rollup.
    #[error("Unresolved rubro identifier: '{0}' does not map to any canonical ID")]
    UnresolvedRubro(String),

    #[error("Month index {0} out of range: must be between 1 and 60")]
    MonthOutOfRange(i64),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForecastError>;
