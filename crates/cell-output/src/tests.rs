//! Unit tests for cell-output.

use std::fs;
use std::io::Read;
use std::path::Path;

use cell_chain::{BandwidthSample, StreamParticipant, TransmissionObserver};
use cell_core::{SimTime, TransmissionMode};
use cell_network::{ExportConfig, MeasurementFilter};
use flate2::read::GzDecoder;
use tempfile::TempDir;

use crate::PerRegionBandwidthMeasurement;

// ── Helpers ───────────────────────────────────────────────────────────────────

const SECOND: u64 = 1_000_000_000;

fn tmp() -> TempDir {
    tempfile::tempdir().expect("create temp dir")
}

fn columns() -> Vec<String> {
    ["fromRegion", "toRegion", "globalNetwork"].map(String::from).to_vec()
}

fn open_with(dir: &Path, interval_ns: u64, compressed: bool, export: &ExportConfig) -> PerRegionBandwidthMeasurement {
    let filter = MeasurementFilter::new("fromRegion", "toRegion", "*");
    PerRegionBandwidthMeasurement::new(dir, filter, columns(), interval_ns, compressed, export).unwrap()
}

fn open(dir: &Path, compressed: bool) -> PerRegionBandwidthMeasurement {
    open_with(dir, SECOND, compressed, &ExportConfig::default())
}

fn sample(start: SimTime, end: SimTime, bandwidth: u64, mode: TransmissionMode) -> BandwidthSample {
    BandwidthSample {
        sender: StreamParticipant { region: "fromRegion".into(), time: start },
        receiver: StreamParticipant { region: "toRegion".into(), time: end },
        bandwidth,
        mode,
        application_class: "CAM".into(),
    }
}

/// A packet of `bits` sent over `[start_ms, end_ms)`.
fn packet(m: &mut PerRegionBandwidthMeasurement, start_ms: u64, end_ms: u64, bits: u64) {
    let bps = bits * 1_000 / (end_ms - start_ms);
    stream(m, start_ms, end_ms, bps);
}

fn stream(m: &mut PerRegionBandwidthMeasurement, start_ms: u64, end_ms: u64, bps: u64) {
    let s = sample(SimTime::from_millis(start_ms), SimTime::from_millis(end_ms), bps, TransmissionMode::DownlinkUnicast);
    m.message_sent(&s);
}

/// `n` samples starting at whole seconds `t..t+n`, each lasting 5 s.
fn send_n(m: &mut PerRegionBandwidthMeasurement, t: u64, n: u64) {
    for i in t..t + n {
        let s = sample(
            SimTime::from_secs(i),
            SimTime::from_secs(i + 5),
            15_000_000,
            TransmissionMode::DownlinkUnicast,
        );
        m.message_sent(&s);
    }
}

fn to_region(m: &PerRegionBandwidthMeasurement, rows: usize) -> Vec<u64> {
    (0..rows).map(|r| m.value(r, "toRegion").unwrap()).collect()
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(str::to_owned).collect()
}

fn gunzip(path: &Path) -> String {
    let mut out = String::new();
    GzDecoder::new(fs::File::open(path).unwrap()).read_to_string(&mut out).unwrap();
    out
}

/// The sample sequence used by the export tests.
fn export_run(m: &mut PerRegionBandwidthMeasurement) {
    for (t, n) in [(90, 10), (250, 10), (596, 1), (1190, 10), (1500, 10), (1790, 10), (3600, 1)] {
        send_n(m, t, n);
    }
}

// ── Buckets ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod buckets {
    use super::*;

    #[test]
    fn short_packet_fills_one_bucket() {
        let dir = tmp();
        let mut m = open(dir.path(), false);
        packet(&mut m, 1_200, 1_800, 300);
        assert_eq!(to_region(&m, 3), vec![0, 500, 0]);
    }

    #[test]
    fn long_packet_fills_every_touched_bucket() {
        let dir = tmp();
        let mut m = open(dir.path(), false);
        packet(&mut m, 800, 2_400, 8_000);
        assert_eq!(to_region(&m, 4), vec![5_000, 5_000, 5_000, 0]);
    }

    #[test]
    fn overlapping_packets_add_up() {
        let dir = tmp();
        let mut m = open(dir.path(), false);
        packet(&mut m, 1_200, 1_800, 300);
        packet(&mut m, 1_800, 2_400, 600);
        packet(&mut m, 600, 1_200, 300);
        assert_eq!(to_region(&m, 4), vec![500, 2_000, 1_000, 0]);
    }

    #[test]
    fn long_stream() {
        let dir = tmp();
        let mut m = open(dir.path(), false);
        stream(&mut m, 1_200, 3_400, 8_000);
        assert_eq!(to_region(&m, 5), vec![0, 8_000, 8_000, 8_000, 0]);
    }

    #[test]
    fn overlapping_streams_add_up() {
        let dir = tmp();
        let mut m = open(dir.path(), false);
        stream(&mut m, 1_200, 1_800, 600);
        stream(&mut m, 800, 1_200, 1_000);
        stream(&mut m, 1_600, 3_200, 800);
        assert_eq!(to_region(&m, 5), vec![1_000, 2_400, 800, 800, 0]);
    }

    #[test]
    fn uplink_is_charged_to_the_sender_region() {
        let dir = tmp();
        let mut m = open(dir.path(), false);
        let s = sample(SimTime::from_millis(1_200), SimTime::from_millis(1_800), 700, TransmissionMode::UplinkUnicast);
        m.message_sent(&s);
        assert_eq!(m.value(1, "fromRegion"), Some(700));
        assert_eq!(m.value(1, "toRegion"), Some(0));
    }

    #[test]
    fn samples_at_time_zero_are_ignored() {
        let dir = tmp();
        let mut m = open(dir.path(), false);
        stream(&mut m, 0, 1_500, 900);
        assert!(m.is_empty());
    }

    #[test]
    fn other_regions_and_modes_are_filtered() {
        let dir = tmp();
        let filter = MeasurementFilter::new("fromRegion", "toRegion", "*").with_mode(TransmissionMode::DownlinkMulticast);
        let mut m = PerRegionBandwidthMeasurement::new(dir.path(), filter, columns(), SECOND, false, &ExportConfig::default())
            .unwrap();
        stream(&mut m, 1_000, 2_000, 100);
        let mut elsewhere = sample(SimTime::from_secs(1), SimTime::from_secs(2), 100, TransmissionMode::DownlinkMulticast);
        elsewhere.receiver.region = "globalNetwork".into();
        m.message_sent(&elsewhere);
        assert!(m.is_empty());

        let matching = sample(SimTime::from_secs(1), SimTime::from_secs(2), 100, TransmissionMode::DownlinkMulticast);
        m.message_sent(&matching);
        assert_eq!(m.value(1, "toRegion"), Some(100));
    }
}

// ── Export ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod export {
    use super::*;
    use crate::OutputError;

    #[test]
    fn file_named_after_the_filter() {
        let dir = tmp();
        let m = open(dir.path(), false);
        assert_eq!(m.path(), dir.path().join("fromRegion#toRegion#ALL.csv"));
        assert_eq!(lines(m.path()), vec!["time;fromRegion;toRegion;globalNetwork"]);
    }

    #[test]
    fn rows_are_exported_in_blocks() {
        let dir = tmp();
        let mut m = open(dir.path(), false);
        let path = m.path().to_owned();
        // A block goes out only once it lies a full block behind the latest
        // sample start.
        let expected = [1, 1, 1, 1, 1, 601, 3_001];
        for ((t, n), want) in [(90, 10), (250, 10), (596, 1), (1190, 10), (1500, 10), (1790, 10), (3600, 1)]
            .into_iter()
            .zip(expected)
        {
            send_n(&mut m, t, n);
            assert_eq!(lines(&path).len(), want, "after samples at {t}s");
        }
        m.finish();
        assert_eq!(lines(&path).len(), 3_606);
        assert!(m.take_error().is_none());
    }

    #[test]
    fn long_stream_does_not_finalise_rows_ahead_of_later_starts() {
        let dir = tmp();
        let mut m = open(dir.path(), false);
        stream(&mut m, 10_000, 2_000_000, 1_000);
        assert_eq!(m.exported_rows(), 0);
        stream(&mut m, 15_000, 15_500, 7);
        assert_eq!(m.value(15, "toRegion"), Some(1_007));
        m.finish();
        let lines = lines(m.path());
        assert_eq!(lines.len(), 2_001);
        assert_eq!(lines[16], "15;0;1007;0");
        assert_eq!(lines[1_000], "999;0;1000;0");
    }

    #[test]
    fn rows_far_behind_the_latest_start_are_exported() {
        let dir = tmp();
        let mut m = open(dir.path(), false);
        stream(&mut m, 10_000, 2_000_000, 1_000);
        stream(&mut m, 1_300_000, 1_900_000, 5);
        assert_eq!(m.exported_rows(), 600);
        assert_eq!(lines(m.path()).len(), 601);
    }

    #[test]
    fn exported_rows_hold_time_and_bandwidth() {
        let dir = tmp();
        let mut m = open(dir.path(), false);
        export_run(&mut m);
        m.finish();
        let lines = lines(m.path());
        assert_eq!(lines[1], "0;0;0;0");
        // Bucket 95 is covered by the samples sent at 91..=95 s.
        assert_eq!(lines[96], "95;0;75000000;0");
        assert_eq!(lines[3_605], "3604;0;15000000;0");
    }

    #[test]
    fn gzip_export_matches_plain_export() {
        let plain_dir = tmp();
        let gzip_dir = tmp();
        let mut plain = open(plain_dir.path(), false);
        let mut gzip = open(gzip_dir.path(), true);
        export_run(&mut plain);
        export_run(&mut gzip);
        plain.finish();
        gzip.finish();

        assert_eq!(gzip.path(), gzip_dir.path().join("fromRegion#toRegion#ALL.csv.gz"));
        assert_eq!(gunzip(gzip.path()), fs::read_to_string(plain.path()).unwrap());
    }

    #[test]
    fn custom_separators_and_fractional_interval() {
        let dir = tmp();
        let export = ExportConfig { field_separator: '|', decimal_separator: ',', append: false };
        let mut m = open_with(dir.path(), SECOND / 2, false, &export);
        stream(&mut m, 250, 750, 100);
        m.finish();
        assert_eq!(
            lines(m.path()),
            vec!["time|fromRegion|toRegion|globalNetwork", "0|0|100|0", "0,5|0|100|0"]
        );
    }

    #[test]
    fn append_keeps_earlier_rows_and_a_single_header() {
        let dir = tmp();
        let export = ExportConfig { append: true, ..ExportConfig::default() };
        for _ in 0..2 {
            let mut m = open_with(dir.path(), SECOND, false, &export);
            stream(&mut m, 1_000, 2_000, 10);
            m.finish();
        }
        let lines = lines(&dir.path().join("fromRegion#toRegion#ALL.csv"));
        assert_eq!(lines.len(), 5);
        assert_eq!(lines.iter().filter(|l| l.starts_with("time")).count(), 1);
    }

    #[test]
    fn truncate_replaces_earlier_runs() {
        let dir = tmp();
        for _ in 0..2 {
            let mut m = open(dir.path(), false);
            stream(&mut m, 1_000, 2_000, 10);
            m.finish();
        }
        assert_eq!(lines(&dir.path().join("fromRegion#toRegion#ALL.csv")).len(), 3);
    }

    #[test]
    fn non_ascii_separator_rejected() {
        let dir = tmp();
        let export = ExportConfig { field_separator: '§', ..ExportConfig::default() };
        let filter = MeasurementFilter::new("*", "*", "*");
        let err = PerRegionBandwidthMeasurement::new(dir.path(), filter, columns(), SECOND, false, &export);
        assert!(matches!(err, Err(OutputError::Config(_))));
    }

    #[test]
    fn finishing_twice_is_harmless() {
        let dir = tmp();
        let mut m = open(dir.path(), false);
        stream(&mut m, 1_000, 2_000, 10);
        m.finish();
        m.finish();
        assert_eq!(lines(m.path()).len(), 3);
        assert!(TransmissionObserver::take_error(&mut m).is_none());
    }
}

// ── Manager ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod manager {
    use super::*;
    use crate::{BandwidthMeasurementManager, MEASUREMENT_DIR, OutputError};
    use cell_chain::{
        ChainManager, Destination, Interaction, MessageTransmission, RtiAmbassador, RtiError, StreamParams,
        V2xMessage,
    };
    use cell_core::{Area, CartesianPoint, MessageId, SimRng, UnitId};
    use cell_delay::Delay;
    use cell_network::{
        Capacity, CellConfig, DownlinkConfig, MulticastConfig, NetworkConfig, NetworkContext,
        RegionConfig, UnicastConfig, UnitKind, UplinkConfig,
    };

    fn region(name: &str, x0: Option<f64>) -> RegionConfig {
        let delay = Delay::Constant { delay: 10_000_000 };
        RegionConfig {
            id: name.to_owned(),
            area: x0.map(|x| Area::Rectangle {
                a: CartesianPoint::new(x, 0.0),
                b: CartesianPoint::new(x + 1_000.0, 1_000.0),
            }),
            uplink: UplinkConfig { delay: delay.clone(), capacity: Capacity(1_000_000_000) },
            downlink: DownlinkConfig {
                capacity: Capacity(1_000_000_000),
                unicast: UnicastConfig { delay: delay.clone() },
                multicast: MulticastConfig { delay, usable_capacity: 0.5 },
            },
        }
    }

    fn network(filters: Vec<MeasurementFilter>) -> NetworkContext {
        let config = NetworkConfig {
            global_network: region("globalNetwork", None),
            servers: vec![region("backbone", None)],
            regions: vec![region("A", Some(0.0)), region("B", Some(1_000.0))],
        };
        let cell = CellConfig { bandwidth_measurements: filters, ..CellConfig::default() };
        NetworkContext::new(&config, cell).unwrap()
    }

    struct NullRti;

    impl RtiAmbassador for NullRti {
        fn request_advance_time(&mut self, _time: SimTime) -> Result<(), RtiError> {
            Ok(())
        }

        fn trigger_interaction(&mut self, _interaction: Interaction) -> Result<(), RtiError> {
            Ok(())
        }
    }

    #[test]
    fn no_filters_no_directory() {
        let dir = tmp();
        let m = BandwidthMeasurementManager::new(dir.path(), &network(vec![])).unwrap();
        assert!(m.is_empty());
        assert!(!dir.path().join(MEASUREMENT_DIR).exists());
    }

    #[test]
    fn one_file_per_filter() {
        let dir = tmp();
        let filters = vec![
            MeasurementFilter::new("A", "B", "*"),
            MeasurementFilter::new("*", "*", "*").with_mode(TransmissionMode::UplinkUnicast),
        ];
        let m = BandwidthMeasurementManager::new(dir.path(), &network(filters)).unwrap();
        assert_eq!(m.len(), 2);
        let out = dir.path().join(MEASUREMENT_DIR);
        assert!(out.join("A#B#ALL.csv").exists());
        assert!(out.join("ALL#ALL#ALL#Up.csv").exists());
        // Server regions get no column.
        assert_eq!(lines(&out.join("A#B#ALL.csv")), vec!["time;A;B;globalNetwork"]);
    }

    #[test]
    fn duplicate_file_names_rejected() {
        let dir = tmp();
        let filters = vec![MeasurementFilter::new("A", "B", "*"), MeasurementFilter::new("A", "B", "*")];
        let err = BandwidthMeasurementManager::new(dir.path(), &network(filters));
        assert!(matches!(err, Err(OutputError::Config(_))));
    }

    #[test]
    fn long_stream_keeps_its_downlink_leg() {
        let dir = tmp();
        let network = network(vec![MeasurementFilter::new("A", "*", "*")]);
        let measurements = BandwidthMeasurementManager::new(dir.path(), &network).unwrap();
        let mut chain = ChainManager::new(network, NullRti, SimRng::new(1));
        measurements.attach(&mut chain);

        let t0 = SimTime::from_secs(10);
        for (id, x) in [(1, 500.0), (2, 1_500.0)] {
            chain
                .register_unit(t0, UnitId(id), UnitKind::Vehicle, Some(CartesianPoint::new(x, 500.0)), 0.0, None)
                .unwrap();
        }
        let message = V2xMessage::new(MessageId(1), UnitId(1), Destination::Topocast { receiver: UnitId(2) }, 200)
            .with_stream(StreamParams { duration: 1_300 * SECOND, bandwidth: 1_000 });
        chain.start_transport(MessageTransmission { time: t0, message }).unwrap();
        while let Some(t) = chain.next_event_time() {
            chain.advance_time(t).unwrap();
        }
        chain.finish().unwrap();

        let lines = lines(&dir.path().join(MEASUREMENT_DIR).join("A#ALL#ALL.csv"));
        assert_eq!(lines[0], "time;A;B;globalNetwork");
        assert_eq!(lines[10], "9;0;0;0");
        assert_eq!(lines[11], "10;1000;1000;0");
        assert_eq!(lines[1_251], "1250;1000;1000;0");
    }

    #[test]
    fn broadcast_is_measured_once_per_region() {
        let dir = tmp();
        let network = network(vec![MeasurementFilter::new("A", "B", "*")]);
        let measurements = BandwidthMeasurementManager::new(dir.path(), &network).unwrap();
        let mut chain = ChainManager::new(network, NullRti, SimRng::new(1));
        assert_eq!(measurements.attach(&mut chain), 1);

        let t0 = SimTime::from_secs(1);
        for (id, x) in [(1, 500.0), (2, 1_500.0), (3, 1_700.0)] {
            chain
                .register_unit(t0, UnitId(id), UnitKind::Vehicle, Some(CartesianPoint::new(x, 500.0)), 0.0, None)
                .unwrap();
        }
        let message = V2xMessage::new(MessageId(1), UnitId(1), Destination::TopoBroadcast, 200);
        chain.start_transport(MessageTransmission { time: t0, message }).unwrap();
        while let Some(t) = chain.next_event_time() {
            chain.advance_time(t).unwrap();
        }
        chain.finish().unwrap();

        let lines = lines(&dir.path().join(MEASUREMENT_DIR).join("A#B#ALL.csv"));
        // Header plus buckets 0 and 1; only bucket 1 carries the multicast.
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "0;0;0;0");
        let row: Vec<&str> = lines[2].split(';').collect();
        assert_eq!(row[0], "1");
        assert_eq!(row[1], "0");
        assert_ne!(row[2], "0");
        assert_eq!(row[3], "0");
    }
}
