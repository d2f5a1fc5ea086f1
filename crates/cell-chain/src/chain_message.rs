//! Messages passed between chain stages.

use std::fmt;

use cell_core::{RegionId, SimTime, TransmissionMode, UnitId};

use crate::SharedMessage;

/// Chain stage names.  Ordered so the module registry iterates
/// Upstream, Geocaster, Downstream.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleName {
    Upstream,
    Geocaster,
    Downstream,
}

impl ModuleName {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleName::Upstream   => "UpstreamModule",
            ModuleName::Geocaster  => "Geocaster",
            ModuleName::Downstream => "DownstreamModule",
        }
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and when a message entered the network.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Origin {
    pub unit: UnitId,
    pub region: RegionId,
    pub time: SimTime,
}

/// Upstream result: the message reached the sender's base station.
#[derive(Clone, Debug)]
pub struct StreamResult {
    pub origin: Origin,
    pub bandwidth: u64,
    pub message: SharedMessage,
}

/// Geocaster result for one target region.
#[derive(Clone, Debug)]
pub struct DestinationResolution {
    pub origin: Origin,
    pub region: RegionId,
    /// Non-empty.  Order is the receiver notification order.
    pub receivers: Vec<UnitId>,
    /// `DownlinkUnicast` or `DownlinkMulticast`.
    pub mode: TransmissionMode,
    pub message: SharedMessage,
}

/// Downstream result: one delivered leg.
#[derive(Clone, Debug)]
pub struct Delivery {
    pub region: RegionId,
    pub receivers: Vec<UnitId>,
    pub bandwidth: u64,
    pub mode: TransmissionMode,
    pub message: SharedMessage,
}

#[derive(Clone, Debug)]
pub enum ChainPayload {
    Stream(StreamResult),
    Destinations(DestinationResolution),
    Delivered(Delivery),
}

impl ChainPayload {
    pub fn message(&self) -> &SharedMessage {
        match self {
            ChainPayload::Stream(s) => &s.message,
            ChainPayload::Destinations(d) => &d.message,
            ChainPayload::Delivered(d) => &d.message,
        }
    }
}

/// A stage's hand-off.  `next == None` ends the chain for this path.
#[derive(Clone, Debug)]
pub struct ChainMessage {
    pub emitting: ModuleName,
    pub next: Option<ModuleName>,
    pub start_time: SimTime,
    /// Must be set before the message reaches
    /// [`finish_stage`][crate::ChainManager::finish_stage].
    pub end_time: Option<SimTime>,
    pub payload: ChainPayload,
}

impl ChainMessage {
    pub fn new(
        emitting: ModuleName,
        next: Option<ModuleName>,
        start_time: SimTime,
        end_time: SimTime,
        payload: ChainPayload,
    ) -> Self {
        Self { emitting, next, start_time, end_time: Some(end_time), payload }
    }
}

/// Resource of a chain event.
#[derive(Clone, Debug)]
pub enum StageInput {
    /// A new message entering the first stage.
    Transmission(SharedMessage),
    /// A hand-off from the previous stage.
    Chain(ChainMessage),
}
