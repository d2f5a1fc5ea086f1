//! `EventScheduler` — the pending-event set and its dispatch loop.
//!
//! # Dispatch model
//!
//! `schedule_events(now)` repeatedly removes the smallest pending key with
//! `time <= now` and hands the event to every one of its processors in
//! list order.  The event leaves the pending set *before* any processor
//! runs, so a failing processor never causes a retry.  Processors get the
//! scheduler back and may add follow-up work; anything they add at or
//! before `now` is dispatched in the same batch.
//!
//! Callers that cannot lend themselves out as an [`EventProcessor`] (the
//! chain orchestrator, which owns both the scheduler and the modules) drive
//! the same loop by hand with [`pop_due`](EventScheduler::pop_due).

use std::collections::BTreeMap;

use cell_core::SimTime;
use tracing::trace;

use crate::{Event, EventKey, ScheduleError, ScheduleResult};

/// Receives dispatched events.
pub trait EventProcessor<P, R> {
    type Error;

    /// Handle `event` on behalf of `target`, one of `event.processors`.
    fn process_event(
        &mut self,
        scheduler: &mut EventScheduler<P, R>,
        target: &P,
        event: &Event<P, R>,
    ) -> Result<(), Self::Error>;
}

pub struct EventScheduler<P, R> {
    pending: BTreeMap<EventKey, Event<P, R>>,
    next_seq: u64,
    /// Time of the most recent dispatch batch.  Nothing may be added before it.
    scheduled_time: SimTime,
    dispatched: u64,
}

impl<P, R> Default for EventScheduler<P, R> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
            next_seq: 0,
            scheduled_time: SimTime::ZERO,
            dispatched: 0,
        }
    }
}

impl<P, R> EventScheduler<P, R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `event`; returns its dispatch key.
    ///
    /// Fails with [`ScheduleError::InvalidTime`] when the event is strictly
    /// before the last dispatch time.  Events *at* that time are accepted and
    /// run in the current (or next) batch.
    pub fn add_event(&mut self, event: Event<P, R>) -> ScheduleResult<EventKey> {
        if event.time < self.scheduled_time {
            return Err(ScheduleError::InvalidTime {
                event: event.time,
                scheduled: self.scheduled_time,
            });
        }
        if event.processors.is_empty() {
            return Err(ScheduleError::NoProcessors(event.time));
        }
        let key = EventKey { time: event.time, nice: event.nice, seq: self.next_seq };
        self.next_seq += 1;
        trace!(t = %event.time, nice = event.nice, seq = key.seq, "event added");
        self.pending.insert(key, event);
        Ok(key)
    }

    /// Remove and return the next event due at or before `now`.
    ///
    /// The scheduling time follows the returned event, so its processors may
    /// still add work at that event's time.  Once nothing more is due the
    /// scheduling time moves to `now`, after which events earlier than `now`
    /// are rejected by [`add_event`](Self::add_event).
    pub fn pop_due(&mut self, now: SimTime) -> Option<Event<P, R>> {
        match self.pending.first_entry() {
            Some(entry) if entry.key().time <= now => {
                let time = entry.key().time;
                self.scheduled_time = self.scheduled_time.max(time);
                self.dispatched += 1;
                Some(entry.remove())
            }
            _ => {
                self.scheduled_time = self.scheduled_time.max(now);
                None
            }
        }
    }

    /// Dispatch every event due at or before `now`; returns how many ran.
    ///
    /// The first processor error aborts the batch and is returned.  Events
    /// already dispatched stay dispatched; the failing event is gone.
    pub fn schedule_events<X>(&mut self, now: SimTime, processor: &mut X) -> Result<usize, X::Error>
    where
        X: EventProcessor<P, R>,
    {
        let mut count = 0;
        while let Some(event) = self.pop_due(now) {
            count += 1;
            for target in &event.processors {
                processor.process_event(self, target, &event)?;
            }
        }
        Ok(count)
    }

    /// Time of the earliest pending event.
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.pending.keys().next().map(|k| k.time)
    }

    pub fn scheduled_time(&self) -> SimTime {
        self.scheduled_time
    }

    /// Number of events dispatched over the scheduler's lifetime.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
