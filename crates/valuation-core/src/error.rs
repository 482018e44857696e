use thiserror::Error;

/// Error taxonomy for the valuation core.
///
/// `Data`-class errors (missing fields, empty or misaligned series) are not
/// recoverable locally and carry enough context to explain the gap. `Division`
/// covers zero denominators and non-positive WACC-growth spreads; in grid
/// contexts callers degrade per-cell to NaN instead of propagating this.
#[derive(Error, Debug)]
pub enum ValuationError {
    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Empty series: {0}")]
    EmptySeries(String),

    #[error("Misaligned series: {0}")]
    MisalignedSeries(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Division undefined: {0}")]
    Division(String),
}
