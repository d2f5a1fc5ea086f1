use thiserror::Error;

/// Invalid delay-model parameters.  Always a configuration error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DelayError {
    #[error("minDelay {min} exceeds maxDelay {max}")]
    MinAboveMax { min: u64, max: u64 },

    #[error("expDelay {exp} is below minDelay {min}")]
    ExpectedBelowMin { min: u64, exp: u64 },
}

pub type DelayResult<T> = Result<T, DelayError>;
