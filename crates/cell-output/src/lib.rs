//! `cell-output` — bandwidth measurement export for the cellsim kernel.
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`measurement`] | `PerRegionBandwidthMeasurement` (a `TransmissionObserver`) |
//! | [`manager`]     | `BandwidthMeasurementManager`: one measurement per filter |
//! | [`sink`]        | `ExportSink`: plain or gzip file                          |
//! | [`error`]       | `OutputError`, `OutputResult<T>`                           |
//!
//! Files are named `<from>#<to>#<class>.csv` (`.csv.gz` when compressed),
//! with `ALL` standing in for wildcards.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cell_output::BandwidthMeasurementManager;
//!
//! let measurements = BandwidthMeasurementManager::new(Path::new("./output"), &network)?;
//! let mut chain = ChainManager::new(network, rti, SimRng::new(seed));
//! measurements.attach(&mut chain);
//! // ... drive the chain ...
//! chain.finish()?; // flushes every file, returns the first write error
//! ```

pub mod error;
pub mod manager;
pub mod measurement;
pub mod sink;

#[cfg(test)]
mod tests;

pub use error::{OutputError, OutputResult};
pub use manager::{BandwidthMeasurementManager, MEASUREMENT_DIR};
pub use measurement::{EXPORT_STEP, PerRegionBandwidthMeasurement};
pub use sink::ExportSink;
