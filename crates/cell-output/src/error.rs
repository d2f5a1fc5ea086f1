use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    /// Creating, appending to or compressing a measurement file failed.
    #[error("measurement file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not write measurement row: {0}")]
    Csv(#[from] csv::Error),

    /// Rejected filter or export settings, e.g. two filters mapping to one file.
    #[error("invalid measurement setup: {0}")]
    Config(String),
}

pub type OutputResult<T> = Result<T, OutputError>;
