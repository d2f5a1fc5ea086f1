//! Geocaster stage: resolves a message's destination into per-region
//! receiver sets.  Adds no delay.

use std::collections::BTreeMap;

use cell_core::{RegionId, TransmissionMode, UnitId};
use cell_network::NetworkContext;
use tracing::{debug, trace};

use crate::{
    CellModule, ChainError, ChainMessage, ChainPayload, ChainResult, Destination,
    DestinationResolution, Interaction, MessageAcknowledgement, ModuleName, NackReason,
    StageContext, StageInput, StageOutput, StreamResult,
};

#[derive(Debug, Default)]
pub struct GeocasterModule {
    processed: u64,
}

impl GeocasterModule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CellModule for GeocasterModule {
    fn name(&self) -> ModuleName {
        ModuleName::Geocaster
    }

    fn process(&mut self, input: &StageInput, ctx: &mut StageContext<'_>) -> ChainResult<StageOutput> {
        let stream = match input {
            StageInput::Chain(ChainMessage { payload: ChainPayload::Stream(s), .. }) => s,
            _ => {
                return Err(ChainError::Precondition(format!(
                    "{} expects an upstream stream result",
                    self.name()
                )));
            }
        };
        let mut out = StageOutput::default();
        let message = &stream.message;

        let routable = match message.destination {
            Destination::AdHoc => false,
            Destination::GeoUnicast { .. } | Destination::GeoBroadcast { .. } => !message.is_tcp(),
            Destination::Topocast { .. } | Destination::TopoBroadcast => true,
        };
        if !routable {
            debug!(message = %message.id, destination = ?message.destination, "destination not routable");
            if message.is_tcp() {
                out.interactions.push(Interaction::Acknowledgement(MessageAcknowledgement::nack(
                    ctx.now,
                    message,
                    NackReason::AddressRoutingError,
                )));
            }
            return Ok(out);
        }

        let (mode, groups) = resolve(&message.destination, message.sender, ctx);
        trace!(message = %message.id, regions = groups.len(), %mode, "destination resolved");

        for (region, receivers) in groups {
            out.forward.push(ChainMessage::new(
                ModuleName::Geocaster,
                Some(ModuleName::Downstream),
                ctx.now,
                ctx.now,
                ChainPayload::Destinations(resolution(stream, region, receivers, mode)),
            ));
        }
        self.processed += 1;
        Ok(out)
    }

    fn processed_messages(&self) -> u64 {
        self.processed
    }
}

fn resolution(
    stream: &StreamResult,
    region: RegionId,
    receivers: Vec<UnitId>,
    mode: TransmissionMode,
) -> DestinationResolution {
    DestinationResolution {
        origin: stream.origin,
        region,
        receivers,
        mode,
        message: stream.message.clone(),
    }
}

/// Receivers grouped by region.  Regions without receivers are left out.
fn resolve(
    destination: &Destination,
    sender: UnitId,
    ctx: &mut StageContext<'_>,
) -> (TransmissionMode, BTreeMap<RegionId, Vec<UnitId>>) {
    match destination {
        Destination::Topocast { receiver } => {
            let groups = ctx
                .network
                .unit(*receiver)
                .map(|state| BTreeMap::from([(state.region, vec![*receiver])]))
                .unwrap_or_default();
            (TransmissionMode::DownlinkUnicast, groups)
        }
        Destination::TopoBroadcast => {
            let units = ctx.network.units().iter().map(|(id, _)| id).filter(|&id| id != sender);
            (TransmissionMode::DownlinkMulticast, group_by_region(ctx.network, units))
        }
        Destination::GeoUnicast { area } => {
            let mut units = ctx.network.units_in_area(area);
            ctx.rng.shuffle(&mut units);
            (TransmissionMode::DownlinkUnicast, group_by_region(ctx.network, units))
        }
        Destination::GeoBroadcast { area } => {
            let groups = ctx
                .network
                .regions_intersecting(area)
                .into_iter()
                .map(|region| (region, ctx.network.units_in_region(region)))
                .filter(|(_, units)| !units.is_empty())
                .collect();
            (TransmissionMode::DownlinkMulticast, groups)
        }
        Destination::AdHoc => (TransmissionMode::DownlinkUnicast, BTreeMap::new()),
    }
}

/// Keeps the order of `units` within each region.
fn group_by_region(
    network: &NetworkContext,
    units: impl IntoIterator<Item = UnitId>,
) -> BTreeMap<RegionId, Vec<UnitId>> {
    let mut groups: BTreeMap<RegionId, Vec<UnitId>> = BTreeMap::new();
    for unit in units {
        if let Some(state) = network.unit(unit) {
            groups.entry(state.region).or_default().push(unit);
        }
    }
    groups
}
