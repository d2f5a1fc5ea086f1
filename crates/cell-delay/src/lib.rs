//! `cell-delay` — pluggable transmission delay models.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                  |
//! |------------|-----------------------------------------------------------|
//! | [`delay`]  | `Delay` enum and `generate_delay`                         |
//! | [`gamma`]  | inverse CDF of the Gamma(2, 2) distribution               |
//! | [`error`]  | `DelayError`, `DelayResult<T>`                            |
//!
//! Every model is a variant of one tagged enum carrying only its own
//! parameters, so adding a model is an exhaustiveness-checked change to a
//! single `match`.  All delays are integer nanoseconds.

pub mod delay;
pub mod error;
pub mod gamma;


pub use delay::{speed_penalty, Delay};
pub use error::{DelayError, DelayResult};
