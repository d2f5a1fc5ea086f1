//! Registered communication units and their last known state.

use std::collections::BTreeMap;

use cell_core::{CartesianPoint, RegionId, TransmissionMode, UnitId};
use serde::{Deserialize, Serialize};

use crate::Capacity;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnitKind {
    Vehicle,
    RoadSideUnit,
    TrafficLight,
    ChargingStation,
    /// Backbone server; attached to a server region, never to a cell.
    Server,
}

impl UnitKind {
    #[inline]
    pub fn is_server(self) -> bool {
        matches!(self, UnitKind::Server)
    }
}

/// A unit's own modem limits.  Unlimited unless configured.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitCapacity {
    #[serde(default = "unlimited")]
    pub max_uplink: Capacity,
    #[serde(default = "unlimited")]
    pub max_downlink: Capacity,
}

fn unlimited() -> Capacity {
    Capacity::UNLIMITED
}

impl Default for UnitCapacity {
    fn default() -> Self {
        UnitCapacity { max_uplink: Capacity::UNLIMITED, max_downlink: Capacity::UNLIMITED }
    }
}

impl UnitCapacity {
    /// The unit's limit for a transmission in `mode`.  Multicast is shared by
    /// every receiver in the region and is never limited per unit.
    pub fn limit(&self, mode: TransmissionMode) -> Option<Capacity> {
        let cap = match mode {
            TransmissionMode::UplinkUnicast => self.max_uplink,
            TransmissionMode::DownlinkUnicast => self.max_downlink,
            TransmissionMode::DownlinkMulticast => return None,
        };
        (!cap.is_unlimited()).then_some(cap)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnitState {
    pub kind: UnitKind,
    pub position: Option<CartesianPoint>,
    /// Speed in m/s.
    pub speed: f64,
    /// Region the unit currently belongs to.
    pub region: RegionId,
    pub capacity: UnitCapacity,
}

/// Ordered map of registered units.  Iteration is by ascending `UnitId`,
/// which keeps receiver resolution deterministic.
#[derive(Default)]
pub struct UnitRegistry {
    units: BTreeMap<UnitId, UnitState>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `id`.  Returns the previous state, if any.
    pub fn insert(&mut self, id: UnitId, state: UnitState) -> Option<UnitState> {
        self.units.insert(id, state)
    }

    pub fn remove(&mut self, id: UnitId) -> Option<UnitState> {
        self.units.remove(&id)
    }

    pub fn get(&self, id: UnitId) -> Option<&UnitState> {
        self.units.get(&id)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut UnitState> {
        self.units.get_mut(&id)
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &UnitState)> + '_ {
        self.units.iter().map(|(&id, state)| (id, state))
    }

    /// Units currently attached to `region`, ascending by id.
    pub fn in_region(&self, region: RegionId) -> Vec<UnitId> {
        self.iter().filter(|(_, s)| s.region == region).map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
