//! Transmission mode enum shared by the delay, capacity, and chain crates.

/// The link a transmission leg uses.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransmissionMode {
    /// Sender → base station.
    UplinkUnicast,
    /// Base station → one receiver.
    DownlinkUnicast,
    /// Base station → every receiver of a region in one shared transmission.
    DownlinkMulticast,
}

impl TransmissionMode {
    #[inline]
    pub fn is_uplink(self) -> bool {
        matches!(self, TransmissionMode::UplinkUnicast)
    }

    #[inline]
    pub fn is_downlink(self) -> bool {
        !self.is_uplink()
    }

    /// Human-readable label, useful for log fields and file names.
    pub fn as_str(self) -> &'static str {
        match self {
            TransmissionMode::UplinkUnicast     => "UplinkUnicast",
            TransmissionMode::DownlinkUnicast   => "DownlinkUnicast",
            TransmissionMode::DownlinkMulticast => "DownlinkMulticast",
        }
    }
}

impl std::fmt::Display for TransmissionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport protocol of a message.  Decides the transport header size and
/// whether failures are acknowledged back to the sender.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
}
