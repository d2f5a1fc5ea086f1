//! Serde model of the network configuration.
//!
//! ```json
//! {
//!   "globalNetwork": {
//!     "id": "globalNetwork",
//!     "uplink":   { "delay": { "type": "ConstantDelay", "delay": 50000000 }, "capacity": 28000000 },
//!     "downlink": {
//!       "capacity": 42200000,
//!       "unicast":   { "delay": { "type": "ConstantDelay", "delay": 50000000 } },
//!       "multicast": { "delay": { "type": "ConstantDelay", "delay": 50000000 }, "usableCapacity": 0.6 }
//!     }
//!   },
//!   "servers": [],
//!   "regions": []
//! }
//! ```
//!
//! Capacities are bits per second; `"unlimited"` disables capacity
//! accounting for that link.

use std::fmt;

use cell_core::Area;
use cell_delay::Delay;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name the global fallback network carries unless configured otherwise.
pub const GLOBAL_NETWORK_ID: &str = "globalNetwork";

// ── Capacity ──────────────────────────────────────────────────────────────────

/// Link capacity in bits per second.  [`Capacity::UNLIMITED`] opts the link
/// out of capacity accounting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Capacity(pub u64);

impl Capacity {
    pub const UNLIMITED: Capacity = Capacity(u64::MAX);

    #[inline]
    pub fn bps(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_unlimited(self) -> bool {
        self == Self::UNLIMITED
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unlimited() {
            f.write_str("unlimited")
        } else {
            write!(f, "{} bps", self.0)
        }
    }
}

impl Serialize for Capacity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_unlimited() {
            serializer.serialize_str("unlimited")
        } else {
            serializer.serialize_u64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Capacity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bits(u64),
            Keyword(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Bits(bps) => Ok(Capacity(bps)),
            Repr::Keyword(s) if s.eq_ignore_ascii_case("unlimited") => Ok(Capacity::UNLIMITED),
            Repr::Keyword(s) => Err(serde::de::Error::custom(format!(
                "expected a capacity in bps or \"unlimited\", got \"{s}\""
            ))),
        }
    }
}

// ── Region configuration ──────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UplinkConfig {
    pub delay: Delay,
    pub capacity: Capacity,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnicastConfig {
    pub delay: Delay,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticastConfig {
    pub delay: Delay,
    /// Share of the downlink capacity multicast may use, in `[0, 1]`.
    pub usable_capacity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownlinkConfig {
    pub capacity: Capacity,
    pub unicast: UnicastConfig,
    pub multicast: MulticastConfig,
}

/// One region: a mobile cell with a coverage area, a server backbone, or
/// the global fallback network (the latter two have no area).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionConfig {
    #[serde(default = "default_region_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Area>,
    pub uplink: UplinkConfig,
    pub downlink: DownlinkConfig,
}

fn default_region_id() -> String {
    GLOBAL_NETWORK_ID.to_owned()
}

/// The whole network: mobile regions, server backbones, and the fallback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub global_network: RegionConfig,
    #[serde(default)]
    pub servers: Vec<RegionConfig>,
    #[serde(default)]
    pub regions: Vec<RegionConfig>,
}
