//! `cell-core` — vocabulary shared by every `cellsim` crate.
//!
//! Identifiers, simulation time, the bit/byte arithmetic used by the delay
//! and capacity code, planar geometry for geocast areas and the seeded RNG.
//! Nothing here knows about regions, stages or output files.
//!
//! | Module            | Provides                                              |
//! |-------------------|-------------------------------------------------------|
//! | [`ids`]           | `UnitId`, `RegionId`, `MessageId`                     |
//! | [`time`]          | `SimTime`, nanosecond resolution                      |
//! | [`units`]         | size and bandwidth constants, transfer-time maths     |
//! | [`geo`]           | `CartesianPoint`, `Polygon`, `Area`                   |
//! | [`rng`]           | `SimRng`                                              |
//! | [`transmission`]  | `TransmissionMode`, `Protocol`                        |
//! | [`error`]         | `CoreError`, `CoreResult`                             |
//!
//! Enable the `serde` feature to (de)serialize ids, points, areas and the
//! transmission enums; `cell-network` needs it to read its configuration.

pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;
pub mod transmission;
pub mod units;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::{Area, CartesianPoint, Polygon};
pub use ids::{MessageId, RegionId, UnitId};
pub use rng::SimRng;
pub use time::SimTime;
pub use transmission::{Protocol, TransmissionMode};
