//! Data-size units and bandwidth/delay conversion.
//!
//! All sizes are in bits and all bandwidths in bits per second.

use crate::time::SECOND;

pub const BIT: u64 = 1;
pub const BYTE: u64 = 8 * BIT;
pub const KILOBIT: u64 = 1_000 * BIT;
pub const MEGABIT: u64 = 1_000 * KILOBIT;
pub const GIGABIT: u64 = 1_000 * MEGABIT;

/// Bandwidth in bits/s needed to move `size_bits` within `delay_ns`.
///
/// Returns `None` when either argument is zero.
pub fn bandwidth_for(size_bits: u64, delay_ns: u64) -> Option<u64> {
    if size_bits == 0 || delay_ns == 0 {
        return None;
    }
    let delay_s = delay_ns as f64 / SECOND as f64;
    Some((size_bits as f64 / delay_s) as u64)
}

/// Nanoseconds needed to move `size_bits` at `bandwidth_bps`.
///
/// Returns `None` when either argument is zero.
pub fn delay_for(size_bits: u64, bandwidth_bps: u64) -> Option<u64> {
    if size_bits == 0 || bandwidth_bps == 0 {
        return None;
    }
    let delay_s = size_bits as f64 / bandwidth_bps as f64;
    Some((delay_s * SECOND as f64) as u64)
}
