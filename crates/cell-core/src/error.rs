//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant via `#[from]`.

use thiserror::Error;

/// Errors produced while constructing core value types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("polygon needs at least 3 vertices, got {0}")]
    DegeneratePolygon(usize),

    #[error("circle radius must be positive, got {0}")]
    InvalidRadius(f64),

    #[error("coordinate is not finite: ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },
}

/// Shorthand result type for `cell-core`.
pub type CoreResult<T> = Result<T, CoreError>;
