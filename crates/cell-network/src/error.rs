//! Network-model error type.  All variants except `UnknownUnit` are fatal
//! configuration errors raised while building a `NetworkContext`.

use cell_core::{CoreError, UnitId};
use cell_delay::DelayError;
use thiserror::Error;

use crate::Link;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("region \"{0}\" is configured more than once")]
    DuplicateRegion(String),

    #[error("unknown region \"{0}\"")]
    UnknownRegion(String),

    #[error("region \"{0}\" needs a coverage area")]
    MissingArea(String),

    #[error("region \"{0}\": circular coverage areas are not supported")]
    UnsupportedArea(String),

    #[error("region \"{region}\": invalid geometry: {source}")]
    Geometry {
        region: String,
        #[source]
        source: CoreError,
    },

    #[error("region \"{region}\": invalid delay: {source}")]
    Delay {
        region: String,
        #[source]
        source: DelayError,
    },

    #[error("region \"{region}\": {link} capacity must be positive")]
    ZeroCapacity { region: String, link: Link },

    #[error("region \"{region}\": multicast usableCapacity {value} is outside [0, 1]")]
    UsableCapacity { region: String, value: f64 },

    #[error("too many regions ({0})")]
    TooManyRegions(usize),

    #[error("bandwidth measurement interval must be positive, got {0}")]
    InvalidInterval(f64),

    #[error("unit {0} is not registered")]
    UnknownUnit(UnitId),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
