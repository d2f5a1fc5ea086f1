//! Transmission observer trait and the bandwidth samples it receives.

use cell_core::{SimTime, TransmissionMode};

/// One end of a transmission leg.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamParticipant {
    /// Region name.
    pub region: String,
    pub time: SimTime,
}

/// One completed leg's contribution to a link's traffic.
///
/// `receiver.time > sender.time` for every sample the chain produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BandwidthSample {
    pub sender: StreamParticipant,
    pub receiver: StreamParticipant,
    /// Bits per second held over `[sender.time, receiver.time)`.
    pub bandwidth: u64,
    pub mode: TransmissionMode,
    pub application_class: String,
}

/// Callbacks invoked by the [`ChainManager`][crate::ChainManager] once per
/// completed transmission leg.
///
/// Methods cannot fail.  Implementations that do I/O keep their first error
/// and hand it out through [`take_error`](Self::take_error), which the
/// manager checks in [`finish`][crate::ChainManager::finish].
pub trait TransmissionObserver {
    fn message_sent(&mut self, _sample: &BandwidthSample) {}

    /// Called once at the end of the run.
    fn finish(&mut self) {}

    fn take_error(&mut self) -> Option<ObserverError> {
        None
    }
}

pub type ObserverError = Box<dyn std::error::Error + Send + Sync + 'static>;
