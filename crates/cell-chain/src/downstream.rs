//! Downstream stage: base station → receivers.
//!
//! Unicast resolutions cost one transmission per receiver, each with its own
//! delay draw.  A multicast resolution is a single shared transmission that
//! every receiver of the region gets at the same time.

use cell_core::{RegionId, TransmissionMode, UnitId};
use cell_network::{Demand, NetworkContext, NetworkError, Region};
use tracing::{debug, trace};

use crate::{
    BandwidthSample, CellModule, ChainError, ChainMessage, ChainPayload, ChainResult, Delivery,
    DestinationResolution, Interaction, MessageAcknowledgement, MessageReception, ModuleName,
    NackReason, StageContext, StageInput, StageOutput, StreamParticipant,
};

#[derive(Debug, Default)]
pub struct DownstreamModule {
    processed: u64,
}

impl DownstreamModule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CellModule for DownstreamModule {
    fn name(&self) -> ModuleName {
        ModuleName::Downstream
    }

    fn process(&mut self, input: &StageInput, ctx: &mut StageContext<'_>) -> ChainResult<StageOutput> {
        let resolution = match input {
            StageInput::Chain(ChainMessage { payload: ChainPayload::Destinations(r), .. }) => r,
            _ => {
                return Err(ChainError::Precondition(format!(
                    "{} expects a destination resolution",
                    self.name()
                )));
            }
        };
        let mut out = StageOutput::default();

        let mut receivers = Vec::with_capacity(resolution.receivers.len());
        for &unit in &resolution.receivers {
            match ctx.network.unit(unit) {
                Some(state) => receivers.push((unit, state.speed)),
                None => {
                    debug!(%unit, message = %resolution.message.id, "receiver left the network");
                    if resolution.message.is_tcp() {
                        out.interactions.push(Interaction::Acknowledgement(
                            MessageAcknowledgement::nack(ctx.now, &resolution.message, NackReason::NodeDeactivated),
                        ));
                    }
                }
            }
        }
        if receivers.is_empty() {
            return Ok(out);
        }

        match resolution.mode {
            TransmissionMode::DownlinkMulticast => {
                let units: Vec<UnitId> = receivers.iter().map(|&(u, _)| u).collect();
                transmit(resolution, units, 0.0, ctx, &mut out)?;
            }
            _ => {
                for (unit, speed) in receivers {
                    transmit(resolution, vec![unit], speed, ctx, &mut out)?;
                }
            }
        }
        self.processed += 1;
        Ok(out)
    }

    fn processed_messages(&self) -> u64 {
        self.processed
    }
}

/// One downlink transmission from `resolution.region` to `receivers`.
fn transmit(
    resolution: &DestinationResolution,
    receivers: Vec<UnitId>,
    speed: f64,
    ctx: &mut StageContext<'_>,
    out: &mut StageOutput,
) -> ChainResult<()> {
    let message = &resolution.message;
    let mode = resolution.mode;

    let region = lookup_region(ctx.network, resolution.region)?;
    let core_delay = region.delay(mode).generate_delay(&mut *ctx.rng, speed);
    let region_name = region.name.clone();
    let origin_name = lookup_region(ctx.network, resolution.origin.region)?.name.clone();

    let size_bits = match receivers.as_slice() {
        [single] => ctx.network.message_length(message.payload_bytes, message.protocol, *single),
        _ => ctx
            .network
            .cell_config()
            .header_lengths
            .message_length(message.payload_bytes, message.protocol, false),
    };
    let demand = match message.stream {
        Some(stream) => Demand::Stream {
            bandwidth: stream.bandwidth,
            core_delay,
            duration: stream.duration,
        },
        None => Demand::Packet { size_bits, core_delay },
    };
    let admission = match receivers.as_slice() {
        [single] if mode == TransmissionMode::DownlinkUnicast => {
            ctx.network.admit_for(*single, resolution.region, mode, ctx.now, demand)?
        }
        _ => ctx.network.admit(resolution.region, mode, ctx.now, demand)?,
    };
    let end = ctx.now.offset(admission.delay);
    trace!(
        message = %message.id,
        region = %region_name,
        receivers = receivers.len(),
        %mode,
        delay = admission.delay,
        "downlink admitted"
    );

    out.interactions.extend(receivers.iter().map(|&receiver| {
        Interaction::Reception(MessageReception {
            time: end,
            receiver,
            sender: message.sender,
            message: message.id,
        })
    }));
    out.samples.push(BandwidthSample {
        sender: StreamParticipant { region: origin_name, time: resolution.origin.time },
        receiver: StreamParticipant {
            region: region_name,
            time: end.offset(message.stream.map_or(0, |s| s.duration)),
        },
        bandwidth: admission.bandwidth,
        mode,
        application_class: message.application_class.clone(),
    });
    out.forward.push(ChainMessage::new(
        ModuleName::Downstream,
        None,
        ctx.now,
        end,
        ChainPayload::Delivered(Delivery {
            region: resolution.region,
            receivers,
            bandwidth: admission.bandwidth,
            mode,
            message: message.clone(),
        }),
    ));
    Ok(())
}

fn lookup_region(network: &NetworkContext, id: RegionId) -> ChainResult<&Region> {
    network
        .region(id)
        .ok_or_else(|| NetworkError::UnknownRegion(id.to_string()).into())
}
