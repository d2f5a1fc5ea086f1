//! Upstream stage: sender → its region's base station.

use cell_core::TransmissionMode;
use cell_network::{Demand, NetworkError};
use tracing::{debug, warn};

use crate::{
    BandwidthSample, CellModule, ChainError, ChainMessage, ChainPayload, ChainResult,
    Interaction, MessageAcknowledgement, ModuleName, NackReason, Origin, StageContext,
    StageInput, StageOutput, StreamParticipant, StreamResult,
};

#[derive(Debug, Default)]
pub struct UpstreamModule {
    processed: u64,
}

impl UpstreamModule {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CellModule for UpstreamModule {
    fn name(&self) -> ModuleName {
        ModuleName::Upstream
    }

    fn process(&mut self, input: &StageInput, ctx: &mut StageContext<'_>) -> ChainResult<StageOutput> {
        let StageInput::Transmission(message) = input else {
            return Err(ChainError::Precondition(format!(
                "{} only accepts new transmissions",
                self.name()
            )));
        };
        let mut out = StageOutput::default();

        let Some(sender) = ctx.network.unit(message.sender) else {
            warn!(unit = %message.sender, message = %message.id, "sender is not registered, dropping");
            if message.is_tcp() {
                out.interactions.push(Interaction::Acknowledgement(MessageAcknowledgement::nack(
                    ctx.now,
                    message,
                    NackReason::NodeDeactivated,
                )));
            }
            return Ok(out);
        };
        let (region_id, speed) = (sender.region, sender.speed);

        let region = ctx
            .network
            .region(region_id)
            .ok_or_else(|| NetworkError::UnknownRegion(region_id.to_string()))?;
        let core_delay = region.uplink_delay.generate_delay(&mut *ctx.rng, speed);
        let region_name = region.name.clone();

        let size_bits = ctx.network.message_length(message.payload_bytes, message.protocol, message.sender);
        let demand = match message.stream {
            Some(stream) => Demand::Stream {
                bandwidth: stream.bandwidth,
                core_delay,
                duration: stream.duration,
            },
            None => Demand::Packet { size_bits, core_delay },
        };
        let mode = TransmissionMode::UplinkUnicast;
        let admission = ctx.network.admit_for(message.sender, region_id, mode, ctx.now, demand)?;
        let end = ctx.now.offset(admission.delay);
        debug!(
            message = %message.id,
            region = %region_name,
            delay = admission.delay,
            bps = admission.bandwidth,
            "uplink admitted"
        );

        let held_until = end.offset(message.stream.map_or(0, |s| s.duration));
        out.samples.push(BandwidthSample {
            sender: StreamParticipant { region: region_name.clone(), time: ctx.now },
            receiver: StreamParticipant { region: region_name, time: held_until },
            bandwidth: admission.bandwidth,
            mode,
            application_class: message.application_class.clone(),
        });

        let origin = Origin { unit: message.sender, region: region_id, time: ctx.now };
        out.forward.push(ChainMessage::new(
            ModuleName::Upstream,
            Some(ModuleName::Geocaster),
            ctx.now,
            end,
            ChainPayload::Stream(StreamResult {
                origin,
                bandwidth: admission.bandwidth,
                message: message.clone(),
            }),
        ));
        self.processed += 1;
        Ok(out)
    }

    fn processed_messages(&self) -> u64 {
        self.processed
    }
}
