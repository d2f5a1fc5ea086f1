use cell_core::SimTime;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The event lies before the time of the last dispatch batch.
    #[error("event at {event} is before the current scheduling time {scheduled}")]
    InvalidTime { event: SimTime, scheduled: SimTime },

    #[error("event at {0} has no processors")]
    NoProcessors(SimTime),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
