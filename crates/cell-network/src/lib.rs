//! `cell-network` — the static network model and the mutable state that
//! goes with it during a run.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`config`]   | `NetworkConfig`, `RegionConfig`, `Capacity` (serde)        |
//! | [`cell`]     | `CellConfig`, `HeaderLengths`, `MeasurementFilter`, `ExportConfig` |
//! | [`region`]   | `Region`, `RegionKind`, `Link`                             |
//! | [`index`]    | `RegionIndex` (R-tree over region bounding boxes)          |
//! | [`units`]    | `UnitRegistry`, `UnitState`, `UnitKind`, `UnitCapacity`    |
//! | [`capacity`] | `CapacityLedger`, `Demand`, `Admission`, `UnitLimit`       |
//! | [`context`]  | `NetworkContext`: everything above, built once per run    |
//! | [`error`]    | `NetworkError`, `NetworkResult<T>`                         |
//!
//! # Region ids
//!
//! Regions get dense [`RegionId`](cell_core::RegionId)s in configuration
//! order: mobile regions first, then server regions, and the global network
//! last.  Every lookup that can fail to find a mobile region falls back to
//! the global network.

pub mod capacity;
pub mod cell;
pub mod config;
pub mod context;
pub mod error;
pub mod index;
pub mod region;
pub mod units;


pub use capacity::{Admission, CapacityLedger, Demand, UnitLimit};
pub use cell::{CellConfig, ExportConfig, HeaderLengths, MeasurementFilter, WILDCARD};
pub use config::{
    Capacity, DownlinkConfig, MulticastConfig, NetworkConfig, RegionConfig, UnicastConfig,
    UplinkConfig,
};
pub use context::NetworkContext;
pub use error::{NetworkError, NetworkResult};
pub use index::RegionIndex;
pub use region::{Link, Region, RegionKind};
pub use units::{UnitCapacity, UnitKind, UnitRegistry, UnitState};
