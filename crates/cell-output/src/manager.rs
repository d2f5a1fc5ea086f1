//! `BandwidthMeasurementManager` — builds one measurement per configured
//! filter and attaches them to a chain.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use cell_chain::{ChainManager, RtiAmbassador};
use cell_network::{NetworkContext, RegionKind};
use tracing::info;

use crate::{OutputError, OutputResult, PerRegionBandwidthMeasurement};

/// Name of the directory the export files are written to.
pub const MEASUREMENT_DIR: &str = "bandwidthMeasurements";

pub struct BandwidthMeasurementManager {
    dir: PathBuf,
    measurements: Vec<PerRegionBandwidthMeasurement>,
}

impl BandwidthMeasurementManager {
    /// Open one export file per filter in `network`'s cell configuration,
    /// under `output_dir/bandwidthMeasurements`.
    ///
    /// The directory is only created when at least one filter exists.  Two
    /// filters that map to the same file name are a configuration error.
    pub fn new(output_dir: &Path, network: &NetworkContext) -> OutputResult<Self> {
        let dir = output_dir.join(MEASUREMENT_DIR);
        let cell = network.cell_config();
        if cell.bandwidth_measurements.is_empty() {
            return Ok(Self { dir, measurements: Vec::new() });
        }
        std::fs::create_dir_all(&dir)?;

        let columns: Vec<String> = network
            .regions()
            .iter()
            .filter(|r| r.kind != RegionKind::Server)
            .map(|r| r.name.clone())
            .collect();

        let mut stems = BTreeSet::new();
        let mut measurements = Vec::with_capacity(cell.bandwidth_measurements.len());
        for filter in &cell.bandwidth_measurements {
            let stem = filter.file_stem();
            if !stems.insert(stem.clone()) {
                return Err(OutputError::Config(format!(
                    "two bandwidth measurements write to \"{stem}\""
                )));
            }
            measurements.push(PerRegionBandwidthMeasurement::new(
                &dir,
                filter.clone(),
                columns.clone(),
                cell.measurement_interval_ns(),
                cell.bandwidth_measurement_compression,
                &cell.export,
            )?);
        }
        info!(dir = %dir.display(), count = measurements.len(), "bandwidth measurements created");
        Ok(Self { dir, measurements })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Hand every measurement to `chain` as a transmission observer.  They
    /// are finished by [`ChainManager::finish`].
    pub fn attach<R: RtiAmbassador>(self, chain: &mut ChainManager<R>) -> usize {
        let count = self.measurements.len();
        for measurement in self.measurements {
            chain.add_observer(Box::new(measurement));
        }
        count
    }
}
