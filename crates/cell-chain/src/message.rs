//! V2X message model: what a unit hands to the cellular network.

use std::rc::Rc;

use cell_core::{Area, MessageId, Protocol, UnitId};
use serde::{Deserialize, Serialize};

/// How a message is addressed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Destination {
    /// One receiver, by unit id.
    Topocast { receiver: UnitId },
    /// Every registered unit except the sender, one multicast per region.
    TopoBroadcast,
    /// Every unit inside `area`, each addressed individually.
    GeoUnicast { area: Area },
    /// Every unit of every region overlapping `area`, one multicast per region.
    GeoBroadcast { area: Area },
    /// Direct radio; handled by another network simulator.
    AdHoc,
}

impl Destination {
    /// `true` for every destination the cellular chain transports.
    pub fn is_cellular(&self) -> bool {
        !matches!(self, Destination::AdHoc)
    }

    pub fn is_geocast(&self) -> bool {
        matches!(self, Destination::GeoUnicast { .. } | Destination::GeoBroadcast { .. })
    }
}

/// Continuous stream parameters.  A stream occupies `bandwidth` bps for
/// `duration` ns once its first packet arrives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamParams {
    pub duration: u64,
    pub bandwidth: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V2xMessage {
    pub id: MessageId,
    pub sender: UnitId,
    pub destination: Destination,
    #[serde(default)]
    pub protocol: Protocol,
    /// Payload size in bytes, without headers.
    pub payload_bytes: u64,
    /// Free-form label used by bandwidth measurement filters.
    #[serde(default = "default_class")]
    pub application_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamParams>,
}

fn default_class() -> String {
    "default".to_owned()
}

impl V2xMessage {
    /// A UDP packet message with the default application class.
    pub fn new(id: MessageId, sender: UnitId, destination: Destination, payload_bytes: u64) -> Self {
        Self {
            id,
            sender,
            destination,
            protocol: Protocol::Udp,
            payload_bytes,
            application_class: default_class(),
            stream: None,
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.application_class = class.into();
        self
    }

    pub fn with_stream(mut self, stream: StreamParams) -> Self {
        self.stream = Some(stream);
        self
    }

    #[inline]
    pub fn is_tcp(&self) -> bool {
        self.protocol == Protocol::Tcp
    }
}

/// Handle to a message travelling through the chain.  Every leg of a
/// broadcast shares the same message.
pub type SharedMessage = Rc<V2xMessage>;
