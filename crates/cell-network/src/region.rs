//! Resolved, read-only region model.

use std::fmt;

use cell_core::{Area, Polygon, RegionId, TransmissionMode};
use cell_delay::Delay;

use crate::config::RegionConfig;
use crate::{Capacity, NetworkError, NetworkResult};

/// Direction a transmission consumes capacity in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Link {
    Uplink,
    Downlink,
}

impl Link {
    pub fn of(mode: TransmissionMode) -> Link {
        if mode.is_uplink() { Link::Uplink } else { Link::Downlink }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Link::Uplink => "uplink",
            Link::Downlink => "downlink",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegionKind {
    /// A cell with a coverage polygon.
    Mobile,
    /// Wired backbone of server units.
    Server,
    /// Fallback for positions outside every mobile region.
    Global,
}

#[derive(Clone, Debug)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub kind: RegionKind,
    /// Coverage area; `Some` exactly for mobile regions.
    pub area: Option<Polygon>,
    pub uplink_delay: Delay,
    pub unicast_delay: Delay,
    pub multicast_delay: Delay,
    pub uplink_capacity: Capacity,
    pub downlink_capacity: Capacity,
    /// Share of the downlink capacity usable for multicast.
    pub multicast_usable: f64,
}

impl Region {
    /// Validate `config` and resolve it into a region with id `id`.
    pub fn from_config(id: RegionId, kind: RegionKind, config: &RegionConfig) -> NetworkResult<Self> {
        let name = config.id.clone();
        let area = match (kind, &config.area) {
            (RegionKind::Mobile, None) => return Err(NetworkError::MissingArea(name)),
            (RegionKind::Mobile, Some(Area::Circle { .. })) => {
                return Err(NetworkError::UnsupportedArea(name));
            }
            (RegionKind::Mobile, Some(Area::Rectangle { a, b })) => Some(Polygon::rectangle(*a, *b)),
            (RegionKind::Mobile, Some(Area::Polygon(p))) => Some(p.clone()),
            // Server and global regions cover no particular place.
            (_, _) => None,
        };
        if let Some(polygon) = &area {
            polygon
                .validate()
                .map_err(|source| NetworkError::Geometry { region: name.clone(), source })?;
        }

        let delays = [
            &config.uplink.delay,
            &config.downlink.unicast.delay,
            &config.downlink.multicast.delay,
        ];
        for delay in delays {
            delay
                .validate()
                .map_err(|source| NetworkError::Delay { region: name.clone(), source })?;
        }

        if config.uplink.capacity.bps() == 0 {
            return Err(NetworkError::ZeroCapacity { region: name, link: Link::Uplink });
        }
        if config.downlink.capacity.bps() == 0 {
            return Err(NetworkError::ZeroCapacity { region: name, link: Link::Downlink });
        }
        let usable = config.downlink.multicast.usable_capacity;
        if !(0.0..=1.0).contains(&usable) {
            return Err(NetworkError::UsableCapacity { region: name, value: usable });
        }

        Ok(Self {
            id,
            name,
            kind,
            area,
            uplink_delay: config.uplink.delay.clone(),
            unicast_delay: config.downlink.unicast.delay.clone(),
            multicast_delay: config.downlink.multicast.delay.clone(),
            uplink_capacity: config.uplink.capacity,
            downlink_capacity: config.downlink.capacity,
            multicast_usable: usable,
        })
    }

    pub fn delay(&self, mode: TransmissionMode) -> &Delay {
        match mode {
            TransmissionMode::UplinkUnicast => &self.uplink_delay,
            TransmissionMode::DownlinkUnicast => &self.unicast_delay,
            TransmissionMode::DownlinkMulticast => &self.multicast_delay,
        }
    }

    /// Configured capacity of the link `mode` transmits on.
    pub fn link_capacity(&self, mode: TransmissionMode) -> Capacity {
        match Link::of(mode) {
            Link::Uplink => self.uplink_capacity,
            Link::Downlink => self.downlink_capacity,
        }
    }

    /// Upper bound a single transmission in `mode` may use.  Multicast is
    /// limited to its usable share of the downlink.
    pub fn max_bandwidth(&self, mode: TransmissionMode) -> Capacity {
        let link = self.link_capacity(mode);
        match mode {
            TransmissionMode::DownlinkMulticast if !link.is_unlimited() => {
                Capacity((self.multicast_usable * link.bps() as f64) as u64)
            }
            _ => link,
        }
    }

    pub fn covers(&self, area: &Area) -> bool {
        self.area.as_ref().is_some_and(|polygon| area.intersects_polygon(polygon))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
