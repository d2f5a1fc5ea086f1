//! `ChainManager` — owns the stage registry, drives the event scheduler and
//! talks to the time authority.

use std::collections::BTreeMap;
use std::rc::Rc;

use cell_core::{CartesianPoint, RegionId, SimRng, SimTime, UnitId};
use cell_network::{NetworkContext, UnitCapacity, UnitKind};
use cell_schedule::{Event, EventKey, EventScheduler};
use tracing::{debug, info, trace};

use crate::{
    BandwidthSample, CellModule, ChainError, ChainMessage, ChainResult, DownstreamModule,
    GeocasterModule, HandoverInfo, Interaction, MessageTransmission, ModuleName, RtiAmbassador,
    StageContext, StageInput, StageOutput, TransmissionObserver, UpstreamModule,
};

/// The chain orchestrator.
///
/// `ChainManager<R>` is generic over the time-authority ambassador so tests
/// and the demo can plug in an in-process recorder.  Everything runs on the
/// caller's thread:
///
/// 1. [`start_transport`](Self::start_transport) schedules the Upstream stage
///    for a new message.
/// 2. [`advance_time`](Self::advance_time) dispatches due events in
///    `(time, nice, seq)` order.  Each stage returns a [`StageOutput`] which
///    is applied in order: interactions are sent, observers see the samples,
///    and hand-offs go through [`finish_stage`](Self::finish_stage).
/// 3. [`finish`](Self::finish) logs statistics and closes the observers.
pub struct ChainManager<R: RtiAmbassador> {
    scheduler: EventScheduler<ModuleName, StageInput>,
    modules: BTreeMap<ModuleName, Box<dyn CellModule>>,
    network: NetworkContext,
    rng: SimRng,
    rti: R,
    observers: Vec<Box<dyn TransmissionObserver>>,
    /// Messages handed to [`start_transport`](Self::start_transport) that
    /// were not for this network.
    ignored: u64,
}

impl<R: RtiAmbassador> ChainManager<R> {
    /// Build the manager and register the three chain stages.
    pub fn new(network: NetworkContext, rti: R, rng: SimRng) -> Self {
        let mut modules: BTreeMap<ModuleName, Box<dyn CellModule>> = BTreeMap::new();
        for module in [
            Box::new(UpstreamModule::new()) as Box<dyn CellModule>,
            Box::new(GeocasterModule::new()),
            Box::new(DownstreamModule::new()),
        ] {
            info!(module = %module.name(), "chain module registered");
            modules.insert(module.name(), module);
        }
        Self {
            scheduler: EventScheduler::new(),
            modules,
            network,
            rng,
            rti,
            observers: Vec::new(),
            ignored: 0,
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn TransmissionObserver>) {
        self.observers.push(observer);
    }

    // ── Units ─────────────────────────────────────────────────────────────

    /// Register a unit at `now`.  Announces the unit's region with a
    /// handover interaction that has no previous region.
    pub fn register_unit(
        &mut self,
        now: SimTime,
        unit: UnitId,
        kind: UnitKind,
        position: Option<CartesianPoint>,
        speed: f64,
        server: Option<&str>,
    ) -> ChainResult<RegionId> {
        let region = self.network.register_unit(unit, kind, position, speed, server)?;
        self.send_handover(now, unit, region, None)?;
        Ok(region)
    }

    /// Move a unit.  Sends a handover interaction when its region changes.
    pub fn update_unit(
        &mut self,
        now: SimTime,
        unit: UnitId,
        position: Option<CartesianPoint>,
        speed: f64,
    ) -> ChainResult<RegionId> {
        let previous = self.network.unit(unit).map(|s| s.region);
        let region = self.network.update_unit(unit, position, speed)?;
        if let Some(previous) = previous.filter(|&p| p != region) {
            self.send_handover(now, unit, region, Some(previous))?;
        }
        Ok(region)
    }

    /// Cap a registered unit's own uplink/downlink bitrate.
    pub fn set_unit_capacity(&mut self, unit: UnitId, capacity: UnitCapacity) -> ChainResult<()> {
        Ok(self.network.set_unit_capacity(unit, capacity)?)
    }

    /// Forget a unit.  Messages already in flight to it are dropped when they
    /// reach the Downstream stage.
    pub fn remove_unit(&mut self, unit: UnitId) -> bool {
        self.network.remove_unit(unit).is_some()
    }

    fn send_handover(
        &mut self,
        now: SimTime,
        unit: UnitId,
        region: RegionId,
        previous: Option<RegionId>,
    ) -> ChainResult<()> {
        let name = |id: RegionId| self.network.region(id).map(|r| r.name.clone());
        let info = HandoverInfo {
            time: now,
            unit,
            current_region: name(region).unwrap_or_default(),
            previous_region: previous.and_then(name),
        };
        debug!(%unit, region = %info.current_region, previous = ?info.previous_region, "handover");
        self.send_interaction(Interaction::Handover(info))
    }

    // ── Transport ─────────────────────────────────────────────────────────

    /// Start transporting a message.  Returns `false` when the destination
    /// is not served by the cellular network; nothing is scheduled then.
    pub fn start_transport(&mut self, transmission: MessageTransmission) -> ChainResult<bool> {
        let MessageTransmission { time, message } = transmission;
        if !message.destination.is_cellular() {
            debug!(msg = %message.id, "not a cellular destination, ignored");
            self.ignored += 1;
            return Ok(false);
        }
        trace!(msg = %message.id, t = %time, "transport started");
        let input = StageInput::Transmission(Rc::new(message));
        self.add_event(Event::new(time, ModuleName::Upstream, input))?;
        Ok(true)
    }

    /// Hand `message` to its next stage at its end time.
    ///
    /// Fails with [`ChainError::Precondition`] when the end time is unset or
    /// the next stage is not registered.  A message without a next stage
    /// ends its path and schedules nothing.
    pub fn finish_stage(&mut self, message: ChainMessage) -> ChainResult<()> {
        let end = message.end_time.ok_or_else(|| {
            ChainError::Precondition(format!(
                "chain message from {} has no end time",
                message.emitting
            ))
        })?;
        let Some(next) = message.next else {
            trace!(from = %message.emitting, t = %end, "path complete");
            return Ok(());
        };
        if !self.modules.contains_key(&next) {
            return Err(ChainError::Precondition(format!("next stage {next} is not registered")));
        }
        debug!(from = %message.emitting, to = %next, t = %end, "hand-off");
        self.add_event(Event::new(end, next, StageInput::Chain(message)))?;
        Ok(())
    }

    /// Schedule `event` and ask the time authority to be granted its time.
    pub fn add_event(&mut self, event: Event<ModuleName, StageInput>) -> ChainResult<EventKey> {
        let time = event.time;
        let key = self.scheduler.add_event(event)?;
        trace!(t = %time, "requesting time advance");
        self.rti.request_advance_time(time)?;
        Ok(key)
    }

    /// Dispatch every event due at or before `now`; returns how many ran.
    ///
    /// The first error aborts the batch.  Events dispatched before it stay
    /// dispatched.
    pub fn advance_time(&mut self, now: SimTime) -> ChainResult<usize> {
        let mut count = 0;
        while let Some(event) = self.scheduler.pop_due(now) {
            count += 1;
            for &target in &event.processors {
                self.process_event(target, event.time, &event.resource)?;
            }
        }
        Ok(count)
    }

    fn process_event(&mut self, target: ModuleName, time: SimTime, input: &StageInput) -> ChainResult<()> {
        let module = self
            .modules
            .get_mut(&target)
            .ok_or_else(|| ChainError::Precondition(format!("stage {target} is not registered")))?;
        let mut ctx = StageContext { now: time, network: &mut self.network, rng: &mut self.rng };
        let output = module.process(input, &mut ctx)?;
        self.apply(output)
    }

    fn apply(&mut self, output: StageOutput) -> ChainResult<()> {
        let StageOutput { forward, interactions, samples } = output;
        for interaction in interactions {
            self.send_interaction(interaction)?;
        }
        for sample in &samples {
            self.notify_observers(sample);
        }
        for message in forward {
            self.finish_stage(message)?;
        }
        Ok(())
    }

    pub fn send_interaction(&mut self, interaction: Interaction) -> ChainResult<()> {
        trace!(kind = interaction.kind(), t = %interaction.time(), "interaction");
        self.rti.trigger_interaction(interaction)?;
        Ok(())
    }

    /// Pass one completed leg to every observer, in registration order.
    pub fn notify_observers(&mut self, sample: &BandwidthSample) {
        for observer in &mut self.observers {
            observer.message_sent(sample);
        }
    }

    /// Log per-stage statistics and finish every observer.
    ///
    /// Returns the first error any observer stored during the run.
    pub fn finish(&mut self) -> ChainResult<()> {
        for (name, module) in &self.modules {
            info!(module = %name, processed = module.processed_messages(), "chain statistics");
        }
        info!(
            ignored = self.ignored,
            dispatched = self.scheduler.dispatched(),
            pending = self.scheduler.len(),
            "chain finished"
        );
        let mut first = None;
        for observer in &mut self.observers {
            observer.finish();
            if let Some(err) = observer.take_error() {
                first.get_or_insert(err);
            }
        }
        match first {
            Some(err) => Err(ChainError::Observer(err)),
            None => Ok(()),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn processed_messages(&self, name: ModuleName) -> u64 {
        self.modules.get(&name).map_or(0, |m| m.processed_messages())
    }

    pub fn next_event_time(&self) -> Option<SimTime> {
        self.scheduler.next_event_time()
    }

    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    pub fn network(&self) -> &NetworkContext {
        &self.network
    }

    pub fn rti(&self) -> &R {
        &self.rti
    }

    pub fn rti_mut(&mut self) -> &mut R {
        &mut self.rti
    }
}
