//! Interactions exchanged with the time authority, and the ambassador trait
//! the chain talks to it through.

use cell_core::{MessageId, SimTime, UnitId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::V2xMessage;

// ── Inbound ───────────────────────────────────────────────────────────────────

/// A unit asks the network to transport `message`, starting at `time`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageTransmission {
    pub time: SimTime,
    pub message: V2xMessage,
}

// ── Outbound ──────────────────────────────────────────────────────────────────

/// `receiver` got `message` from `sender` at `time`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageReception {
    pub time: SimTime,
    pub receiver: UnitId,
    pub sender: UnitId,
    pub message: MessageId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NackReason {
    /// The destination cannot be routed over this network.
    AddressRoutingError,
    /// The sending or receiving unit is not (or no longer) registered.
    NodeDeactivated,
}

/// Negative acknowledgement to a TCP sender.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageAcknowledgement {
    pub time: SimTime,
    pub message: MessageId,
    pub sender: UnitId,
    pub acknowledged: bool,
    pub reasons: Vec<NackReason>,
}

impl MessageAcknowledgement {
    pub fn nack(time: SimTime, message: &V2xMessage, reason: NackReason) -> Self {
        Self {
            time,
            message: message.id,
            sender: message.sender,
            acknowledged: false,
            reasons: vec![reason],
        }
    }
}

/// A unit moved from one region to another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandoverInfo {
    pub time: SimTime,
    pub unit: UnitId,
    pub current_region: String,
    pub previous_region: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interaction {
    Reception(MessageReception),
    Acknowledgement(MessageAcknowledgement),
    Handover(HandoverInfo),
}

impl Interaction {
    pub fn time(&self) -> SimTime {
        match self {
            Interaction::Reception(r) => r.time,
            Interaction::Acknowledgement(a) => a.time,
            Interaction::Handover(h) => h.time,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Interaction::Reception(_) => "MessageReception",
            Interaction::Acknowledgement(_) => "MessageAcknowledgement",
            Interaction::Handover(_) => "HandoverUpdate",
        }
    }
}

// ── Ambassador ────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RtiError {
    #[error("time advance to {time} rejected: {reason}")]
    AdvanceRejected { time: SimTime, reason: String },

    #[error("{kind} at {time} rejected: {reason}")]
    InteractionRejected { kind: &'static str, time: SimTime, reason: String },
}

/// The time authority as seen from this federate.  Both calls are
/// synchronous; an error aborts the operation that made the call.
pub trait RtiAmbassador {
    /// Ask to be granted time `time` eventually.
    fn request_advance_time(&mut self, time: SimTime) -> Result<(), RtiError>;

    /// Publish `interaction` to the other federates.
    fn trigger_interaction(&mut self, interaction: Interaction) -> Result<(), RtiError>;
}
