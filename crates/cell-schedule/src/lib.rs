//! `cell-schedule` — time-ordered event dispatch.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`event`]     | `Event<P, R>`, `EventKey`                                 |
//! | [`scheduler`] | `EventScheduler` (`BTreeMap<EventKey, Event>`), `EventProcessor` |
//! | [`error`]     | `ScheduleError`, `ScheduleResult<T>`                      |
//!
//! # Ordering
//!
//! Pending events are keyed by
//!
//! ```text
//! (time, nice, seq)
//! ```
//!
//! where `seq` is a per-scheduler insertion counter.  Equal-time events run
//! lower niceness first and otherwise in insertion order, so a run is
//! reproducible for a given seed regardless of incidental iteration order.
//! No hash-based collection is involved anywhere in dispatch.

pub mod error;
pub mod event;
pub mod scheduler;


pub use error::{ScheduleError, ScheduleResult};
pub use event::{Event, EventKey};
pub use scheduler::{EventProcessor, EventScheduler};
