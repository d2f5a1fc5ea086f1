//! A unit of timed work.

use cell_core::SimTime;

/// Total dispatch order of pending events.
///
/// Derived `Ord` compares fields in declaration order: time, then niceness,
/// then insertion sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    pub time: SimTime,
    pub nice: i64,
    pub seq: u64,
}

/// Work to run at `time` on each of `processors`, carrying `resource`.
///
/// `P` identifies a processor (a module name, an index, …) and `R` is the
/// payload.  An event is consumed by exactly one dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct Event<P, R> {
    pub time: SimTime,
    /// Lower runs first among events sharing a timestamp.
    pub nice: i64,
    pub processors: Vec<P>,
    pub resource: R,
}

impl<P, R> Event<P, R> {
    /// An event with default niceness targeting a single processor.
    pub fn new(time: SimTime, processor: P, resource: R) -> Self {
        Self { time, nice: 0, processors: vec![processor], resource }
    }

    pub fn with_processors(time: SimTime, processors: Vec<P>, resource: R) -> Self {
        Self { time, nice: 0, processors, resource }
    }

    pub fn with_nice(mut self, nice: i64) -> Self {
        self.nice = nice;
        self
    }
}
