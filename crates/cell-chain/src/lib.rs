//! `cell-chain` — the Upstream → Geocaster → Downstream transport chain and
//! its orchestrator.
//!
//! # Crate layout
//!
//! | Module            | Contents                                                       |
//! |-------------------|----------------------------------------------------------------|
//! | [`message`]       | `V2xMessage`, `Destination`, `StreamParams`                    |
//! | [`interaction`]   | inbound/outbound interactions, `RtiAmbassador`, `RtiError`     |
//! | [`chain_message`] | `ChainMessage`, `ChainPayload`, `StageInput`, `ModuleName`     |
//! | [`observer`]      | `TransmissionObserver`, `BandwidthSample`                      |
//! | [`module`]        | `CellModule` trait, `StageContext`, `StageOutput`              |
//! | [`upstream`]      | `UpstreamModule`: sender → base station                       |
//! | [`geocaster`]     | `GeocasterModule`: destination → per-region receivers         |
//! | [`downstream`]    | `DownstreamModule`: base station → receivers                  |
//! | [`manager`]       | `ChainManager<R>`: stage registry, dispatch, RTI bridge       |
//! | [`error`]         | `ChainError`, `ChainResult<T>`                                 |
//!
//! # One message through the chain
//!
//! ```text
//! start_transport(msg, t0)
//!   → event(t0, Upstream)       uplink delay d1, sample sender→BS
//!   → event(t0+d1, Geocaster)   one ChainMessage per receiving region
//!   → event(t0+d1, Downstream)  downlink delay d2 per leg,
//!                               MessageReception at t0+d1+d2, sample origin→region
//! ```

pub mod chain_message;
pub mod downstream;
pub mod error;
pub mod geocaster;
pub mod interaction;
pub mod manager;
pub mod message;
pub mod module;
pub mod observer;
pub mod upstream;

#[cfg(test)]
mod tests;

pub use chain_message::{
    ChainMessage, ChainPayload, Delivery, DestinationResolution, ModuleName, Origin, StageInput,
    StreamResult,
};
pub use downstream::DownstreamModule;
pub use error::{ChainError, ChainResult};
pub use geocaster::GeocasterModule;
pub use interaction::{
    HandoverInfo, Interaction, MessageAcknowledgement, MessageReception, MessageTransmission,
    NackReason, RtiAmbassador, RtiError,
};
pub use manager::ChainManager;
pub use message::{Destination, SharedMessage, StreamParams, V2xMessage};
pub use module::{CellModule, StageContext, StageOutput};
pub use observer::{BandwidthSample, ObserverError, StreamParticipant, TransmissionObserver};
pub use upstream::UpstreamModule;
