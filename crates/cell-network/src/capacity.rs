//! `CapacityLedger` — bandwidth held by in-flight transmissions.
//!
//! # Model
//!
//! Each admitted transmission holds its bandwidth on one `(region, link)`
//! pair from its start until its end time (plus the stream duration for
//! streams).  Capacity is returned lazily: every query first releases the
//! holdings that ended at or before the query time.  Releases are keyed by
//! `(end time, sequence)`, so the ledger's state never depends on hash or
//! insertion-layout order.
//!
//! A unit may carry its own uplink/downlink limit.  Unicast transmissions
//! are then held against both the region and the unit, and only the smaller
//! of the two remainders is available.  Multicast is never limited per unit.
//!
//! Nothing is ever refused.  A transmission that needs more than what is left
//! slows down to the remaining bandwidth; when nothing is left it keeps its
//! core delay and the link is oversubscribed.  Links with unlimited capacity
//! are not tracked at all.

use std::collections::BTreeMap;

use cell_core::units::{bandwidth_for, delay_for};
use cell_core::{RegionId, SimTime, TransmissionMode, UnitId};
use tracing::{debug, trace};

use crate::{Capacity, Link, Region};

/// What a transmission asks the ledger for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Demand {
    /// A single packet of `size_bits` that would take `core_delay` ns on an
    /// idle link.
    Packet { size_bits: u64, core_delay: u64 },
    /// A stream of fixed `bandwidth` bps running `duration` ns after its
    /// first packet arrives.
    Stream { bandwidth: u64, core_delay: u64, duration: u64 },
}

/// Outcome of [`CapacityLedger::admit`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Admission {
    /// Bandwidth charged to the link, bps.
    pub bandwidth: u64,
    /// Transmission delay in ns; `>= core_delay`.
    pub delay: u64,
    /// `true` when the link had nothing left and was charged anyway.
    pub oversubscribed: bool,
}

/// A unit taking part in a transmission and its own limit on that link.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UnitLimit {
    pub unit: UnitId,
    pub capacity: Capacity,
}

#[derive(Copy, Clone, Debug)]
struct Holding {
    /// `None` when the region link is unlimited.
    region: Option<RegionId>,
    unit: Option<UnitId>,
    link: Link,
    bps: u64,
}

#[derive(Default)]
pub struct CapacityLedger {
    in_use: BTreeMap<(RegionId, Link), u64>,
    unit_in_use: BTreeMap<(UnitId, Link), u64>,
    releases: BTreeMap<(SimTime, u64), Holding>,
    next_seq: u64,
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return every holding that ended at or before `now`.
    pub fn release_until(&mut self, now: SimTime) {
        while let Some(entry) = self.releases.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let holding = entry.remove();
            if let Some(region) = holding.region {
                give_back(&mut self.in_use, (region, holding.link), holding.bps);
            }
            if let Some(unit) = holding.unit {
                give_back(&mut self.unit_in_use, (unit, holding.link), holding.bps);
            }
            trace!(
                region = ?holding.region,
                unit = ?holding.unit,
                link = %holding.link,
                bps = holding.bps,
                "capacity released"
            );
        }
    }

    /// Bandwidth currently held on `(region, link)`.
    pub fn in_use(&self, region: RegionId, link: Link) -> u64 {
        self.in_use.get(&(region, link)).copied().unwrap_or(0)
    }

    /// Bandwidth `unit` currently holds on its own `link`.
    pub fn unit_in_use(&self, unit: UnitId, link: Link) -> u64 {
        self.unit_in_use.get(&(unit, link)).copied().unwrap_or(0)
    }

    /// Bandwidth a new transmission in `mode` could use right now: what the
    /// region has left, further capped by what `unit` has left.
    pub fn available(&self, region: &Region, mode: TransmissionMode, unit: Option<UnitLimit>) -> u64 {
        let link_capacity = region.link_capacity(mode);
        let region_left = if link_capacity.is_unlimited() {
            u64::MAX
        } else {
            let left = link_capacity.bps().saturating_sub(self.in_use(region.id, Link::of(mode)));
            left.min(region.max_bandwidth(mode).bps())
        };
        match unit {
            Some(limit) if !limit.capacity.is_unlimited() => {
                let unit_left = limit.capacity.bps().saturating_sub(self.unit_in_use(limit.unit, Link::of(mode)));
                region_left.min(unit_left)
            }
            _ => region_left,
        }
    }

    /// Hold `bps` on the link of `mode` in `region`, and on `unit`'s own
    /// link, until `until`.
    pub fn reserve(
        &mut self,
        region: &Region,
        mode: TransmissionMode,
        bps: u64,
        until: SimTime,
        unit: Option<UnitLimit>,
    ) {
        let link = Link::of(mode);
        let region = (!region.link_capacity(mode).is_unlimited()).then_some(region.id);
        let unit = unit.filter(|l| !l.capacity.is_unlimited()).map(|l| l.unit);
        if bps == 0 || (region.is_none() && unit.is_none()) {
            return;
        }
        if let Some(region) = region {
            let used = self.in_use.entry((region, link)).or_insert(0);
            *used = used.saturating_add(bps);
        }
        if let Some(unit) = unit {
            let used = self.unit_in_use.entry((unit, link)).or_insert(0);
            *used = used.saturating_add(bps);
        }
        self.releases.insert((until, self.next_seq), Holding { region, unit, link, bps });
        self.next_seq += 1;
    }

    /// Charge a transmission starting at `now` and return its bandwidth and
    /// (possibly grown) delay.
    pub fn admit(
        &mut self,
        region: &Region,
        mode: TransmissionMode,
        now: SimTime,
        demand: Demand,
        unit: Option<UnitLimit>,
    ) -> Admission {
        self.release_until(now);
        let available = self.available(region, mode, unit);

        let admission = match demand {
            Demand::Stream { bandwidth, core_delay, .. } => Admission {
                bandwidth,
                delay: core_delay,
                oversubscribed: bandwidth > available,
            },
            Demand::Packet { size_bits, core_delay } => {
                let needed = bandwidth_for(size_bits, core_delay).unwrap_or(0);
                if needed <= available {
                    Admission { bandwidth: needed, delay: core_delay, oversubscribed: false }
                } else if available > 0 {
                    let delay = delay_for(size_bits, available).unwrap_or(core_delay).max(core_delay);
                    Admission { bandwidth: available, delay, oversubscribed: false }
                } else {
                    Admission { bandwidth: needed, delay: core_delay, oversubscribed: true }
                }
            }
        };

        if admission.oversubscribed {
            debug!(
                region = %region,
                %mode,
                bps = admission.bandwidth,
                available,
                "capacity exhausted, link oversubscribed"
            );
        }

        let hold = match demand {
            Demand::Stream { duration, .. } => admission.delay.saturating_add(duration),
            Demand::Packet { .. } => admission.delay,
        };
        self.reserve(region, mode, admission.bandwidth, now.offset(hold), unit);
        admission
    }

    /// Number of holdings not yet released.
    pub fn active(&self) -> usize {
        self.releases.len()
    }
}

fn give_back<K: Ord>(in_use: &mut BTreeMap<K, u64>, key: K, bps: u64) {
    if let Some(used) = in_use.get_mut(&key) {
        *used = used.saturating_sub(bps);
        if *used == 0 {
            in_use.remove(&key);
        }
    }
}
