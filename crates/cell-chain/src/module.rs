//! The stage trait and the context every stage runs against.

use cell_core::{SimRng, SimTime};
use cell_network::NetworkContext;

use crate::{BandwidthSample, ChainMessage, ChainResult, Interaction, ModuleName, StageInput};

/// Everything a stage may read or mutate while processing one input.
pub struct StageContext<'a> {
    pub now: SimTime,
    pub network: &'a mut NetworkContext,
    pub rng: &'a mut SimRng,
}

/// What a stage produced for one input.
///
/// The manager applies it in field order: interactions go out first, then
/// samples reach the observers, then forwarded messages are scheduled.
#[derive(Debug, Default)]
pub struct StageOutput {
    pub forward: Vec<ChainMessage>,
    pub interactions: Vec<Interaction>,
    pub samples: Vec<BandwidthSample>,
}

impl StageOutput {
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.interactions.is_empty() && self.samples.is_empty()
    }
}

/// One stage of the transport chain.
///
/// A stage must not schedule events itself; it returns its hand-offs in
/// [`StageOutput::forward`] with `end_time` set.
pub trait CellModule {
    fn name(&self) -> ModuleName;

    fn process(&mut self, input: &StageInput, ctx: &mut StageContext<'_>) -> ChainResult<StageOutput>;

    /// Inputs this stage accepted and processed.
    fn processed_messages(&self) -> u64;
}
