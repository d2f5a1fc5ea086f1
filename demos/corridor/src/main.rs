//! corridor — a three-cell motorway corridor driven through the cellular
//! chain.
//!
//! Vehicles drive east through `cell-west`, `cell-mid` and `cell-east`,
//! broadcasting a CAM around themselves every `cam.intervalMs`.  A road side
//! unit and a backbone server add the one-off transmissions listed in the
//! scenario.  An in-process recording RTI stands in for the time authority.
//!
//! ```text
//! cargo run -p corridor --release -- [scenario.json]
//! RUST_LOG=cell_chain=debug cargo run -p corridor
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cell_chain::{
    ChainManager, Destination, Interaction, MessageTransmission, ModuleName, RtiAmbassador,
    RtiError, V2xMessage,
};
use cell_core::{Area, CartesianPoint, MessageId, SimRng, SimTime, UnitId};
use cell_network::{CellConfig, NetworkConfig, NetworkContext, UnitCapacity, UnitKind};
use cell_output::BandwidthMeasurementManager;

// ── Constants ─────────────────────────────────────────────────────────────────

const DEFAULT_SCENARIO: &str = include_str!("../scenario.json");

/// CAM ids start here so they never collide with scripted transmissions.
const CAM_ID_BASE: u64 = 1_000_000;

// ── Scenario ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    seed: u64,
    duration_ms: u64,
    step_ms: u64,
    output_dir: PathBuf,
    cam: CamSpec,
    network: NetworkConfig,
    #[serde(default)]
    cell: CellConfig,
    vehicles: Vec<VehicleSpec>,
    #[serde(default)]
    road_side_units: Vec<RsuSpec>,
    #[serde(default)]
    servers: Vec<ServerSpec>,
    #[serde(default)]
    transmissions: Vec<MessageTransmission>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CamSpec {
    interval_ms: u64,
    payload_bytes: u64,
    /// Radius of the geobroadcast around the sender, metres.
    radius: f64,
}

/// A vehicle driving east at constant speed.
#[derive(Deserialize)]
struct VehicleSpec {
    id: u32,
    x: f64,
    y: f64,
    /// m/s
    speed: f64,
    /// The vehicle's own modem limits, if any.
    #[serde(default)]
    modem: Option<UnitCapacity>,
}

impl VehicleSpec {
    fn position(&self, t: SimTime) -> CartesianPoint {
        CartesianPoint::new(self.x + self.speed * t.as_secs_f64(), self.y)
    }
}

#[derive(Deserialize)]
struct RsuSpec {
    id: u32,
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct ServerSpec {
    id: u32,
    region: String,
}

// ── Recording time authority ──────────────────────────────────────────────────

#[derive(Default)]
struct RecordingRti {
    advance_requests: u64,
    latest_request: SimTime,
    receptions: u64,
    nacks: u64,
    handovers: u64,
}

impl RtiAmbassador for RecordingRti {
    fn request_advance_time(&mut self, time: SimTime) -> Result<(), RtiError> {
        self.advance_requests += 1;
        self.latest_request = self.latest_request.max(time);
        Ok(())
    }

    fn trigger_interaction(&mut self, interaction: Interaction) -> Result<(), RtiError> {
        match interaction {
            Interaction::Reception(_) => self.receptions += 1,
            Interaction::Acknowledgement(ack) => {
                warn!(msg = %ack.message, reasons = ?ack.reasons, "negative acknowledgement");
                self.nacks += 1;
            }
            Interaction::Handover(_) => self.handovers += 1,
        }
        Ok(())
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn load_scenario(path: Option<&Path>) -> Result<Scenario> {
    match path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parsing {}", path.display()))
        }
        None => serde_json::from_str(DEFAULT_SCENARIO).context("parsing built-in scenario"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args().nth(1).map(PathBuf::from);
    let mut scenario = load_scenario(path.as_deref())?;
    if scenario.step_ms == 0 {
        bail!("stepMs must be positive");
    }

    println!("=== corridor: cellular V2X chain ===");
    println!(
        "Vehicles: {}  |  RSUs: {}  |  Duration: {} ms  |  Seed: {}",
        scenario.vehicles.len(),
        scenario.road_side_units.len(),
        scenario.duration_ms,
        scenario.seed
    );

    // 1. Network model and measurement files.
    let network = NetworkContext::new(&scenario.network, scenario.cell.clone())?;
    let measurements = BandwidthMeasurementManager::new(&scenario.output_dir, &network)?;
    let measurement_dir = measurements.dir().to_owned();
    let mut chain = ChainManager::new(network, RecordingRti::default(), SimRng::new(scenario.seed));
    let files = measurements.attach(&mut chain);

    // 2. Units.
    let start = SimTime::ZERO;
    for v in &scenario.vehicles {
        chain.register_unit(start, UnitId(v.id), UnitKind::Vehicle, Some(v.position(start)), v.speed, None)?;
        if let Some(modem) = v.modem {
            chain.set_unit_capacity(UnitId(v.id), modem)?;
        }
    }
    for r in &scenario.road_side_units {
        let at = Some(CartesianPoint::new(r.x, r.y));
        chain.register_unit(start, UnitId(r.id), UnitKind::RoadSideUnit, at, 0.0, None)?;
    }
    for s in &scenario.servers {
        chain.register_unit(start, UnitId(s.id), UnitKind::Server, None, 0.0, Some(s.region.as_str()))?;
    }

    // 3. Step loop.
    scenario.transmissions.sort_by_key(|t| t.time);
    let mut scripted = scenario.transmissions.into_iter().peekable();
    let step = SimTime::from_millis(scenario.step_ms).as_nanos();
    let cam_interval = SimTime::from_millis(scenario.cam.interval_ms).as_nanos();
    let end = SimTime::from_millis(scenario.duration_ms);
    let mut next_cam_id = CAM_ID_BASE;
    let mut started = 0u64;

    let mut now = start;
    while now <= end {
        // Deliver everything that was due before the units move.
        chain.advance_time(now)?;

        for v in &scenario.vehicles {
            chain.update_unit(now, UnitId(v.id), Some(v.position(now)), v.speed)?;
        }

        if cam_interval > 0 && now > start && now.as_nanos() % cam_interval == 0 {
            for v in &scenario.vehicles {
                let area = Area::Circle { center: v.position(now), radius: scenario.cam.radius };
                let message = V2xMessage::new(
                    MessageId(next_cam_id),
                    UnitId(v.id),
                    Destination::GeoBroadcast { area },
                    scenario.cam.payload_bytes,
                )
                .with_class("CAM");
                next_cam_id += 1;
                started += u64::from(chain.start_transport(MessageTransmission { time: now, message })?);
            }
        }

        let horizon = now.offset(step);
        while let Some(transmission) = scripted.next_if(|t| t.time < horizon) {
            // A scripted time inside this step is still in the future.
            let transmission = MessageTransmission { time: transmission.time.max(now), ..transmission };
            started += u64::from(chain.start_transport(transmission)?);
        }

        chain.advance_time(now)?;
        now = horizon;
    }

    // 4. Drain in-flight messages and close the measurements.
    while let Some(t) = chain.next_event_time() {
        chain.advance_time(t)?;
    }
    chain.finish()?;

    // 5. Summary.
    let rti = chain.rti();
    info!(started, receptions = rti.receptions, "run complete");
    println!();
    println!("Transports started:     {started}");
    println!("Receptions:             {}", rti.receptions);
    println!("Negative acks:          {}", rti.nacks);
    println!("Handovers:              {}", rti.handovers);
    println!("Advance requests:       {} (latest {})", rti.advance_requests, rti.latest_request);
    for stage in [ModuleName::Upstream, ModuleName::Geocaster, ModuleName::Downstream] {
        println!("{:<24}{}", format!("{stage}:"), chain.processed_messages(stage));
    }
    println!("Measurement files:      {files} in {}", measurement_dir.display());
    Ok(())
}
