//! `NetworkContext` — the run's network model, built once from configuration
//! and handed to the chain orchestrator by value.

use std::collections::BTreeMap;

use cell_core::{Area, CartesianPoint, Protocol, RegionId, SimTime, TransmissionMode, UnitId};
use tracing::{debug, info};

use crate::config::NetworkConfig;
use crate::{
    Admission, CapacityLedger, CellConfig, Demand, NetworkError, NetworkResult, Region,
    RegionIndex, RegionKind, UnitCapacity, UnitKind, UnitLimit, UnitRegistry, UnitState,
};

pub struct NetworkContext {
    /// Indexed by `RegionId`.  The global network is last.
    regions: Vec<Region>,
    by_name: BTreeMap<String, RegionId>,
    index: RegionIndex,
    global: RegionId,
    cell: CellConfig,
    units: UnitRegistry,
    capacity: CapacityLedger,
}

impl NetworkContext {
    /// Validate both configurations and build the context.
    ///
    /// Fails on the first configuration problem; a context is never
    /// partially built.
    pub fn new(network: &NetworkConfig, cell: CellConfig) -> NetworkResult<Self> {
        cell.validate()?;

        let configs = network
            .regions
            .iter()
            .map(|c| (RegionKind::Mobile, c))
            .chain(network.servers.iter().map(|c| (RegionKind::Server, c)))
            .chain(std::iter::once((RegionKind::Global, &network.global_network)));

        let mut regions = Vec::new();
        let mut by_name = BTreeMap::new();
        for (i, (kind, config)) in configs.enumerate() {
            let id = RegionId::try_from(i)
                .ok()
                .filter(|id| id.is_valid())
                .ok_or(NetworkError::TooManyRegions(i + 1))?;
            let region = Region::from_config(id, kind, config)?;
            if by_name.insert(region.name.clone(), id).is_some() {
                return Err(NetworkError::DuplicateRegion(region.name));
            }
            regions.push(region);
        }
        let global = RegionId::try_from(regions.len() - 1)
            .map_err(|_| NetworkError::TooManyRegions(regions.len()))?;

        let index = RegionIndex::build(
            regions.iter().filter_map(|r| r.area.as_ref().map(|area| (r.id, area))),
        );
        info!(
            regions = network.regions.len(),
            servers = network.servers.len(),
            "network context built"
        );

        Ok(Self {
            regions,
            by_name,
            index,
            global,
            cell,
            units: UnitRegistry::new(),
            capacity: CapacityLedger::new(),
        })
    }

    // ── Regions ───────────────────────────────────────────────────────────

    pub fn cell_config(&self) -> &CellConfig {
        &self.cell
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.index())
    }

    pub fn region_by_name(&self, name: &str) -> Option<&Region> {
        self.by_name.get(name).and_then(|&id| self.region(id))
    }

    pub fn global_region(&self) -> &Region {
        &self.regions[self.global.index()]
    }

    /// Mobile region covering `position`, else the global network.
    pub fn region_for_position(&self, position: Option<CartesianPoint>) -> RegionId {
        position.and_then(|p| self.index.region_at(p)).unwrap_or(self.global)
    }

    /// Mobile regions overlapping `area`, ascending by id.
    pub fn regions_intersecting(&self, area: &Area) -> Vec<RegionId> {
        self.index.regions_intersecting(area)
    }

    // ── Units ─────────────────────────────────────────────────────────────

    /// Register (or re-register) a unit and resolve its region.
    ///
    /// Servers attach to the server region named `server`, or to the global
    /// network when `server` is `None`.  Every other unit is placed by
    /// position.
    pub fn register_unit(
        &mut self,
        id: UnitId,
        kind: UnitKind,
        position: Option<CartesianPoint>,
        speed: f64,
        server: Option<&str>,
    ) -> NetworkResult<RegionId> {
        let region = match (kind, server) {
            (UnitKind::Server, Some(name)) => self
                .region_by_name(name)
                .filter(|r| r.kind == RegionKind::Server)
                .map(|r| r.id)
                .ok_or_else(|| NetworkError::UnknownRegion(name.to_owned()))?,
            (UnitKind::Server, None) => self.global,
            _ => self.region_for_position(position),
        };
        debug!(unit = %id, ?kind, region = %self.regions[region.index()], "unit registered");
        let capacity = UnitCapacity::default();
        self.units.insert(id, UnitState { kind, position, speed, region, capacity });
        Ok(region)
    }

    /// Move a registered unit; returns its (possibly new) region.
    pub fn update_unit(
        &mut self,
        id: UnitId,
        position: Option<CartesianPoint>,
        speed: f64,
    ) -> NetworkResult<RegionId> {
        let region = self.region_for_position(position);
        let state = self.units.get_mut(id).ok_or(NetworkError::UnknownUnit(id))?;
        state.position = position;
        state.speed = speed;
        if !state.kind.is_server() && state.region != region {
            state.region = region;
            debug!(unit = %id, region = %self.regions[region.index()], "unit changed region");
        }
        Ok(state.region)
    }

    /// Give a registered unit its own uplink/downlink limits.
    pub fn set_unit_capacity(&mut self, id: UnitId, capacity: UnitCapacity) -> NetworkResult<()> {
        let state = self.units.get_mut(id).ok_or(NetworkError::UnknownUnit(id))?;
        debug!(unit = %id, up = %capacity.max_uplink, down = %capacity.max_downlink, "unit capacity set");
        state.capacity = capacity;
        Ok(())
    }

    pub fn remove_unit(&mut self, id: UnitId) -> Option<UnitState> {
        self.units.remove(id)
    }

    pub fn unit(&self, id: UnitId) -> Option<&UnitState> {
        self.units.get(id)
    }

    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    pub fn region_of_unit(&self, id: UnitId) -> Option<&Region> {
        self.unit(id).and_then(|s| self.region(s.region))
    }

    /// Positioned units inside `area`, ascending by id.
    pub fn units_in_area(&self, area: &Area) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|(_, s)| s.position.is_some_and(|p| area.contains(p)))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn units_in_region(&self, region: RegionId) -> Vec<UnitId> {
        self.units.in_region(region)
    }

    /// On-air size in bits of a message of `payload_bytes` sent or received
    /// by `unit`.  Unregistered units count as cellular.
    pub fn message_length(&self, payload_bytes: u64, protocol: Protocol, unit: UnitId) -> u64 {
        let server = self.unit(unit).is_some_and(|s| s.kind.is_server());
        self.cell.header_lengths.message_length(payload_bytes, protocol, server)
    }

    // ── Capacity ──────────────────────────────────────────────────────────

    /// Charge a transmission in `region` only; see [`CapacityLedger::admit`].
    pub fn admit(
        &mut self,
        region: RegionId,
        mode: TransmissionMode,
        now: SimTime,
        demand: Demand,
    ) -> NetworkResult<Admission> {
        let region = self
            .regions
            .get(region.index())
            .ok_or_else(|| NetworkError::UnknownRegion(region.to_string()))?;
        Ok(self.capacity.admit(region, mode, now, demand, None))
    }

    /// Charge a transmission of `unit` in `region`.  Unicast legs are also
    /// held against the unit's own limit; unregistered units have none.
    pub fn admit_for(
        &mut self,
        unit: UnitId,
        region: RegionId,
        mode: TransmissionMode,
        now: SimTime,
        demand: Demand,
    ) -> NetworkResult<Admission> {
        let limit = self
            .units
            .get(unit)
            .and_then(|s| s.capacity.limit(mode))
            .map(|capacity| UnitLimit { unit, capacity });
        let region = self
            .regions
            .get(region.index())
            .ok_or_else(|| NetworkError::UnknownRegion(region.to_string()))?;
        Ok(self.capacity.admit(region, mode, now, demand, limit))
    }

    pub fn capacity(&self) -> &CapacityLedger {
        &self.capacity
    }
}
