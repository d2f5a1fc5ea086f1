//! Unit tests for cell-chain.

use std::cell::RefCell;
use std::rc::Rc;

use cell_core::{Area, CartesianPoint, MessageId, SimRng, SimTime, TransmissionMode, UnitId};
use cell_core::units::GIGABIT;
use cell_delay::Delay;
use cell_network::{
    Capacity, CellConfig, DownlinkConfig, MulticastConfig, NetworkConfig, NetworkContext,
    RegionConfig, UnicastConfig, UnitCapacity, UnitKind, UplinkConfig,
};

use crate::{
    BandwidthSample, ChainManager, Destination, Interaction, MessageTransmission, ModuleName,
    ObserverError, RtiAmbassador, RtiError, TransmissionObserver, V2xMessage,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

const UP_MS: u64 = 10;
const UNICAST_MS: u64 = 20;
const MULTICAST_MS: u64 = 30;

fn ms(n: u64) -> SimTime {
    SimTime::from_millis(n)
}

fn pt(x: f64, y: f64) -> CartesianPoint {
    CartesianPoint::new(x, y)
}

fn constant(ms: u64) -> Delay {
    Delay::Constant { delay: ms * 1_000_000 }
}

fn region(name: &str, area: Option<Area>, up: Capacity, down: Capacity) -> RegionConfig {
    RegionConfig {
        id: name.to_owned(),
        area,
        uplink: UplinkConfig { delay: constant(UP_MS), capacity: up },
        downlink: DownlinkConfig {
            capacity: down,
            unicast: UnicastConfig { delay: constant(UNICAST_MS) },
            multicast: MulticastConfig { delay: constant(MULTICAST_MS), usable_capacity: 0.5 },
        },
    }
}

fn square(x0: f64) -> Option<Area> {
    Some(Area::Rectangle { a: pt(x0, 0.0), b: pt(x0 + 1_000.0, 1_000.0) })
}

/// Cells "A" (x 0..1000) and "B" (x 1000..2000), both 100 Gbit/s.
fn network_with_uplink(uplink_a: Capacity) -> NetworkContext {
    let fast = Capacity(100 * GIGABIT);
    let config = NetworkConfig {
        global_network: region("globalNetwork", None, Capacity::UNLIMITED, Capacity::UNLIMITED),
        servers: vec![],
        regions: vec![region("A", square(0.0), uplink_a, fast), region("B", square(1_000.0), fast, fast)],
    };
    NetworkContext::new(&config, CellConfig::default()).unwrap()
}

#[derive(Default)]
struct RecordingRti {
    advances: Vec<SimTime>,
    interactions: Vec<Interaction>,
    fail_advance: bool,
}

impl RtiAmbassador for RecordingRti {
    fn request_advance_time(&mut self, time: SimTime) -> Result<(), RtiError> {
        if self.fail_advance {
            return Err(RtiError::AdvanceRejected { time, reason: "connection lost".into() });
        }
        self.advances.push(time);
        Ok(())
    }

    fn trigger_interaction(&mut self, interaction: Interaction) -> Result<(), RtiError> {
        self.interactions.push(interaction);
        Ok(())
    }
}

impl RecordingRti {
    /// `(receiver, time)` of every reception, in send order.
    fn receptions(&self) -> Vec<(UnitId, SimTime)> {
        self.interactions
            .iter()
            .filter_map(|i| match i {
                Interaction::Reception(r) => Some((r.receiver, r.time)),
                _ => None,
            })
            .collect()
    }

    fn nacks(&self) -> Vec<crate::NackReason> {
        self.interactions
            .iter()
            .filter_map(|i| match i {
                Interaction::Acknowledgement(a) if !a.acknowledged => Some(a.reasons[0]),
                _ => None,
            })
            .collect()
    }
}

#[derive(Default, Clone)]
struct SharedSamples(Rc<RefCell<Vec<BandwidthSample>>>);

impl TransmissionObserver for SharedSamples {
    fn message_sent(&mut self, sample: &BandwidthSample) {
        self.0.borrow_mut().push(sample.clone());
    }
}

impl SharedSamples {
    fn of_mode(&self, mode: TransmissionMode) -> Vec<BandwidthSample> {
        self.0.borrow().iter().filter(|s| s.mode == mode).cloned().collect()
    }
}

type Manager = ChainManager<RecordingRti>;

/// Sender 1 in A, receivers 2 and 3 in B.
fn manager_with(uplink_a: Capacity) -> (Manager, SharedSamples) {
    let mut m = ChainManager::new(network_with_uplink(uplink_a), RecordingRti::default(), SimRng::new(7));
    let samples = SharedSamples::default();
    m.add_observer(Box::new(samples.clone()));
    for (id, x) in [(1, 500.0), (2, 1_500.0), (3, 1_600.0)] {
        m.register_unit(SimTime::ZERO, UnitId(id), UnitKind::Vehicle, Some(pt(x, 500.0)), 0.0, None)
            .unwrap();
    }
    (m, samples)
}

fn manager() -> (Manager, SharedSamples) {
    manager_with(Capacity(100 * GIGABIT))
}

fn send(m: &mut Manager, at: SimTime, message: V2xMessage) -> bool {
    m.start_transport(MessageTransmission { time: at, message }).unwrap()
}

/// Dispatch until nothing is pending.
fn run(m: &mut Manager) {
    while let Some(t) = m.next_event_time() {
        m.advance_time(t).unwrap();
    }
}

fn msg(id: u64, sender: u32, destination: Destination) -> V2xMessage {
    V2xMessage::new(MessageId(id), UnitId(sender), destination, 100)
}

fn area_b() -> Area {
    Area::Rectangle { a: pt(1_100.0, 100.0), b: pt(1_900.0, 900.0) }
}

// ── Orchestration ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod orchestration {
    use super::*;
    use crate::{ChainError, ChainMessage, ChainPayload, Origin, StreamResult};
    use cell_core::RegionId;

    fn stream_message(next: Option<ModuleName>, end: Option<SimTime>) -> ChainMessage {
        let message = Rc::new(msg(1, 1, Destination::TopoBroadcast));
        ChainMessage {
            emitting: ModuleName::Upstream,
            next,
            start_time: ms(1_000),
            end_time: end,
            payload: ChainPayload::Stream(StreamResult {
                origin: Origin { unit: UnitId(1), region: RegionId(0), time: ms(1_000) },
                bandwidth: 1,
                message,
            }),
        }
    }

    #[test]
    fn final_stage_schedules_nothing() {
        let (mut m, _) = manager();
        m.finish_stage(stream_message(None, Some(ms(1_010)))).unwrap();
        assert_eq!(m.pending_events(), 0);
        assert!(m.rti().advances.is_empty());
    }

    #[test]
    fn hand_off_schedules_one_event_at_end_time() {
        let (mut m, _) = manager();
        m.finish_stage(stream_message(Some(ModuleName::Geocaster), Some(ms(1_010)))).unwrap();
        assert_eq!(m.pending_events(), 1);
        assert_eq!(m.next_event_time(), Some(ms(1_010)));
        assert_eq!(m.rti().advances, vec![ms(1_010)]);
    }

    #[test]
    fn missing_end_time_is_a_precondition_error() {
        let (mut m, _) = manager();
        let err = m.finish_stage(stream_message(Some(ModuleName::Geocaster), None)).unwrap_err();
        assert!(matches!(err, ChainError::Precondition(_)));
        assert_eq!(m.pending_events(), 0);
    }

    #[test]
    fn advance_request_failure_propagates() {
        let (mut m, _) = manager();
        m.rti_mut().fail_advance = true;
        let err = m
            .start_transport(MessageTransmission { time: ms(1_000), message: msg(1, 1, Destination::TopoBroadcast) })
            .unwrap_err();
        assert!(matches!(err, ChainError::Rti(RtiError::AdvanceRejected { .. })));
    }

    #[test]
    fn event_before_dispatch_time_rejected() {
        let (mut m, _) = manager();
        m.advance_time(ms(2_000)).unwrap();
        let err = m
            .start_transport(MessageTransmission { time: ms(1_000), message: msg(1, 1, Destination::TopoBroadcast) })
            .unwrap_err();
        assert!(matches!(err, ChainError::Schedule(_)));
    }

    #[test]
    fn ad_hoc_messages_are_ignored() {
        let (mut m, _) = manager();
        assert!(!send(&mut m, ms(1_000), msg(1, 1, Destination::AdHoc)));
        assert_eq!(m.pending_events(), 0);
        assert!(m.rti().advances.is_empty());
    }

    #[test]
    fn every_stage_counts_its_messages() {
        let (mut m, _) = manager();
        send(&mut m, ms(1_000), msg(1, 1, Destination::TopoBroadcast));
        send(&mut m, ms(1_000), msg(2, 1, Destination::Topocast { receiver: UnitId(2) }));
        run(&mut m);
        assert_eq!(m.processed_messages(ModuleName::Upstream), 2);
        assert_eq!(m.processed_messages(ModuleName::Geocaster), 2);
        // The broadcast has one leg to B; A holds only the sender.
        assert_eq!(m.processed_messages(ModuleName::Downstream), 2);
    }

    #[test]
    fn stages_hand_off_at_their_end_times() {
        let (mut m, _) = manager();
        send(&mut m, ms(1_000), msg(1, 1, Destination::Topocast { receiver: UnitId(2) }));
        run(&mut m);
        // Upstream at t0, Geocaster and Downstream both at t0 + uplink delay.
        assert_eq!(m.rti().advances, vec![ms(1_000), ms(1_000 + UP_MS), ms(1_000 + UP_MS)]);
    }
}

// ── End to end ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod end_to_end {
    use super::*;

    #[test]
    fn topo_broadcast_reaches_both_receivers_once() {
        let (mut m, samples) = manager();
        let t0 = ms(1_000);
        send(&mut m, t0, msg(1, 1, Destination::TopoBroadcast));
        run(&mut m);

        let receptions = m.rti().receptions();
        assert_eq!(receptions.len(), 2);
        let arrival = t0 + (UP_MS + MULTICAST_MS) * 1_000_000;
        assert_eq!(receptions, vec![(UnitId(2), arrival), (UnitId(3), arrival)]);

        let multicast = samples.of_mode(TransmissionMode::DownlinkMulticast);
        assert_eq!(multicast.len(), 1);
        assert_eq!(multicast[0].sender.region, "A");
        assert_eq!(multicast[0].receiver.region, "B");
        assert_eq!(multicast[0].sender.time, t0);
        assert_eq!(multicast[0].receiver.time, arrival);
    }

    #[test]
    fn uplink_leg_is_sampled() {
        let (mut m, samples) = manager();
        send(&mut m, ms(1_000), msg(1, 1, Destination::TopoBroadcast));
        run(&mut m);
        let up = samples.of_mode(TransmissionMode::UplinkUnicast);
        assert_eq!(up.len(), 1);
        assert_eq!((up[0].sender.region.as_str(), up[0].receiver.region.as_str()), ("A", "A"));
        assert_eq!(up[0].receiver.time, ms(1_000 + UP_MS));
        assert_eq!(up[0].application_class, "default");
    }

    #[test]
    fn topocast_uses_unicast_delay() {
        let (mut m, samples) = manager();
        send(&mut m, ms(1_000), msg(1, 1, Destination::Topocast { receiver: UnitId(3) }));
        run(&mut m);
        assert_eq!(m.rti().receptions(), vec![(UnitId(3), ms(1_000 + UP_MS + UNICAST_MS))]);
        assert_eq!(samples.of_mode(TransmissionMode::DownlinkUnicast).len(), 1);
    }

    #[test]
    fn topocast_to_unknown_unit_delivers_nothing() {
        let (mut m, _) = manager();
        send(&mut m, ms(1_000), msg(1, 1, Destination::Topocast { receiver: UnitId(42) }));
        run(&mut m);
        assert!(m.rti().receptions().is_empty());
        assert_eq!(m.processed_messages(ModuleName::Downstream), 0);
    }

    #[test]
    fn geo_unicast_addresses_each_receiver() {
        let (mut m, samples) = manager();
        send(&mut m, ms(1_000), msg(1, 1, Destination::GeoUnicast { area: area_b() }));
        run(&mut m);
        let mut receivers: Vec<UnitId> = m.rti().receptions().iter().map(|r| r.0).collect();
        receivers.sort();
        assert_eq!(receivers, vec![UnitId(2), UnitId(3)]);
        assert_eq!(samples.of_mode(TransmissionMode::DownlinkUnicast).len(), 2);
        assert!(samples.of_mode(TransmissionMode::DownlinkMulticast).is_empty());
    }

    #[test]
    fn geo_broadcast_covers_every_intersecting_region() {
        let (mut m, samples) = manager();
        let both = Area::Rectangle { a: pt(100.0, 100.0), b: pt(1_900.0, 900.0) };
        send(&mut m, ms(1_000), msg(1, 1, Destination::GeoBroadcast { area: both }));
        run(&mut m);
        // The sender sits in A and is part of that region's broadcast.
        assert_eq!(m.rti().receptions().len(), 3);
        let regions: Vec<String> = samples
            .of_mode(TransmissionMode::DownlinkMulticast)
            .into_iter()
            .map(|s| s.receiver.region)
            .collect();
        assert_eq!(regions, vec!["A".to_owned(), "B".to_owned()]);
    }

    #[test]
    fn stream_sample_extends_past_arrival() {
        let (mut m, samples) = manager();
        let stream = crate::StreamParams { duration: 2_000_000_000, bandwidth: 1_000 };
        send(
            &mut m,
            ms(1_000),
            msg(1, 1, Destination::Topocast { receiver: UnitId(2) }).with_stream(stream),
        );
        run(&mut m);
        let down = samples.of_mode(TransmissionMode::DownlinkUnicast);
        assert_eq!(down.len(), 1);
        assert_eq!(down[0].bandwidth, 1_000);
        assert_eq!(down[0].receiver.time, ms(1_000 + UP_MS + UNICAST_MS + 2_000));
        // The reception itself is not delayed by the stream duration.
        assert_eq!(m.rti().receptions(), vec![(UnitId(2), ms(1_000 + UP_MS + UNICAST_MS))]);
    }

    #[test]
    fn scarce_uplink_stretches_the_delay() {
        // 204 payload bytes + 368 header bits = 2000 bits; at the 10 ms core
        // delay that needs 200 kbit/s, but only 100 kbit/s exist.
        let (mut m, samples) = manager_with(Capacity(100_000));
        let mut message = msg(1, 1, Destination::Topocast { receiver: UnitId(2) });
        message.payload_bytes = 204;
        send(&mut m, ms(1_000), message);
        run(&mut m);
        let up = samples.of_mode(TransmissionMode::UplinkUnicast);
        assert_eq!(up[0].bandwidth, 100_000);
        let stretched = up[0].receiver.time - up[0].sender.time;
        assert!(stretched.abs_diff(20_000_000) < 10, "uplink took {stretched} ns");
    }

    #[test]
    fn slow_sender_modem_stretches_the_uplink() {
        let (mut m, samples) = manager();
        let modem = UnitCapacity { max_uplink: Capacity(100_000), ..UnitCapacity::default() };
        m.set_unit_capacity(UnitId(1), modem).unwrap();
        let mut message = msg(1, 1, Destination::Topocast { receiver: UnitId(2) });
        message.payload_bytes = 204;
        send(&mut m, ms(1_000), message);
        run(&mut m);
        let up = samples.of_mode(TransmissionMode::UplinkUnicast);
        assert_eq!(up[0].bandwidth, 100_000);
        let stretched = up[0].receiver.time - up[0].sender.time;
        assert!(stretched.abs_diff(20_000_000) < 10, "uplink took {stretched} ns");
    }

    #[test]
    fn receiver_modem_limits_unicast_but_not_multicast() {
        let (mut m, _) = manager();
        // 2000 bits at 50 kbit/s take 40 ms instead of the 20 ms core delay.
        let modem = UnitCapacity { max_downlink: Capacity(50_000), ..UnitCapacity::default() };
        m.set_unit_capacity(UnitId(2), modem).unwrap();
        let mut unicast = msg(1, 1, Destination::Topocast { receiver: UnitId(2) });
        unicast.payload_bytes = 204;
        send(&mut m, ms(1_000), unicast);
        let mut broadcast = msg(2, 1, Destination::TopoBroadcast);
        broadcast.payload_bytes = 204;
        send(&mut m, ms(5_000), broadcast);
        run(&mut m);

        let receptions = m.rti().receptions();
        assert_eq!(receptions[0].0, UnitId(2));
        let unicast_arrival = receptions[0].1 - ms(1_000 + UP_MS);
        assert!(unicast_arrival.abs_diff(40_000_000) < 10, "downlink took {unicast_arrival} ns");
        let multicast = ms(5_000 + UP_MS + MULTICAST_MS);
        assert_eq!(&receptions[1..], &[(UnitId(2), multicast), (UnitId(3), multicast)]);
    }
}

// ── Failures and acknowledgements ─────────────────────────────────────────────

#[cfg(test)]
mod failures {
    use super::*;
    use crate::{ChainError, NackReason};
    use cell_core::{Protocol, RegionId};

    #[test]
    fn tcp_geocast_is_not_routable() {
        let (mut m, _) = manager();
        let message = msg(1, 1, Destination::GeoBroadcast { area: area_b() }).with_protocol(Protocol::Tcp);
        send(&mut m, ms(1_000), message);
        run(&mut m);
        assert!(m.rti().receptions().is_empty());
        assert_eq!(m.rti().nacks(), vec![NackReason::AddressRoutingError]);
    }

    #[test]
    fn unregistered_sender_is_dropped() {
        let (mut m, samples) = manager();
        send(&mut m, ms(1_000), msg(1, 9, Destination::TopoBroadcast));
        send(&mut m, ms(1_000), msg(2, 9, Destination::TopoBroadcast).with_protocol(Protocol::Tcp));
        run(&mut m);
        assert!(m.rti().receptions().is_empty());
        assert_eq!(m.rti().nacks(), vec![NackReason::NodeDeactivated]);
        assert_eq!(m.processed_messages(ModuleName::Upstream), 0);
        assert!(samples.0.borrow().is_empty());
    }

    #[test]
    fn receiver_leaving_mid_flight_gets_nothing() {
        let (mut m, _) = manager();
        let message = msg(1, 1, Destination::Topocast { receiver: UnitId(2) }).with_protocol(Protocol::Tcp);
        send(&mut m, ms(1_000), message);
        // Upstream only; the geocaster runs at t0 + uplink delay.
        m.advance_time(ms(1_000)).unwrap();
        assert!(m.remove_unit(UnitId(2)));
        // Resolved while the unit is gone: nothing to deliver.
        run(&mut m);
        assert!(m.rti().receptions().is_empty());
        assert!(m.rti().nacks().is_empty());
    }

    #[test]
    fn receiver_removed_after_resolution_is_nacked() {
        use crate::{ChainMessage, ChainPayload, DestinationResolution, Origin};

        let (mut m, _) = manager();
        let message = Rc::new(msg(1, 1, Destination::Topocast { receiver: UnitId(2) }).with_protocol(Protocol::Tcp));
        let origin = Origin { unit: UnitId(1), region: RegionId(0), time: ms(1_000) };
        m.remove_unit(UnitId(2));
        m.finish_stage(ChainMessage::new(
            ModuleName::Geocaster,
            Some(ModuleName::Downstream),
            ms(1_010),
            ms(1_010),
            ChainPayload::Destinations(DestinationResolution {
                origin,
                region: RegionId(1),
                receivers: vec![UnitId(2)],
                mode: TransmissionMode::DownlinkUnicast,
                message,
            }),
        ))
        .unwrap();
        run(&mut m);
        assert!(m.rti().receptions().is_empty());
        assert_eq!(m.rti().nacks(), vec![NackReason::NodeDeactivated]);
    }

    struct Failing(Option<ObserverError>);

    impl TransmissionObserver for Failing {
        fn take_error(&mut self) -> Option<ObserverError> {
            self.0.take()
        }
    }

    #[test]
    fn first_observer_error_surfaces_at_finish() {
        let (mut m, _) = manager();
        m.add_observer(Box::new(Failing(Some("disk full".into()))));
        m.add_observer(Box::new(Failing(Some("second".into()))));
        let err = m.finish().unwrap_err();
        match err {
            ChainError::Observer(source) => assert_eq!(source.to_string(), "disk full"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn clean_finish() {
        let (mut m, _) = manager();
        send(&mut m, ms(1_000), msg(1, 1, Destination::TopoBroadcast));
        run(&mut m);
        m.finish().unwrap();
    }
}

// ── Units and handovers ───────────────────────────────────────────────────────

#[cfg(test)]
mod handover {
    use super::*;

    fn handovers(m: &Manager) -> Vec<(UnitId, String, Option<String>)> {
        m.rti()
            .interactions
            .iter()
            .filter_map(|i| match i {
                Interaction::Handover(h) => {
                    Some((h.unit, h.current_region.clone(), h.previous_region.clone()))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn registration_announces_the_region() {
        let (m, _) = manager();
        let announced = handovers(&m);
        assert_eq!(announced.len(), 3);
        assert_eq!(announced[0], (UnitId(1), "A".to_owned(), None));
        assert_eq!(announced[1], (UnitId(2), "B".to_owned(), None));
    }

    #[test]
    fn crossing_a_border_sends_a_handover() {
        let (mut m, _) = manager();
        m.update_unit(ms(5), UnitId(2), Some(pt(1_200.0, 500.0)), 10.0).unwrap();
        assert_eq!(handovers(&m).len(), 3);
        m.update_unit(ms(6), UnitId(2), Some(pt(800.0, 500.0)), 10.0).unwrap();
        let all = handovers(&m);
        assert_eq!(all.len(), 4);
        assert_eq!(all[3], (UnitId(2), "A".to_owned(), Some("B".to_owned())));
    }

    #[test]
    fn leaving_every_cell_falls_back_to_the_global_network() {
        let (mut m, _) = manager();
        let region = m.update_unit(ms(5), UnitId(1), Some(pt(-50.0, -50.0)), 0.0).unwrap();
        assert_eq!(m.network().region(region).unwrap().name, "globalNetwork");
    }

    #[test]
    fn updating_an_unknown_unit_fails() {
        let (mut m, _) = manager();
        assert!(m.update_unit(ms(5), UnitId(77), None, 0.0).is_err());
    }
}
