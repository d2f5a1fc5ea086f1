use cell_network::NetworkError;
use cell_schedule::ScheduleError;
use thiserror::Error;

use crate::{ObserverError, RtiError};

#[derive(Debug, Error)]
pub enum ChainError {
    /// A chain invariant was broken by the caller or a stage.
    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("time authority error: {0}")]
    Rti(#[from] RtiError),

    #[error("scheduler error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("transmission observer failed: {0}")]
    Observer(#[source] ObserverError),
}

pub type ChainResult<T> = Result<T, ChainError>;
