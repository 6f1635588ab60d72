//! Worker - executes operations in instruction-budgeted ticks.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::trace::millis;
use crate::{
    Clock, Deque, Host, Operation, OperationStatus, SubOperations, TraceEvent, TraceSink,
    UpdateFrequency, WorkerConfig,
};

/// Builds a fresh instance each time a recurring registration fires.
pub type OperationFactory = Box<dyn FnMut() -> Box<dyn Operation>>;

struct RecurringRegistration {
    construct: OperationFactory,
    interval: Duration,
    next_occurrence: Duration,
}

/// What a single [`Worker::run`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// `execute` calls made
    pub steps: u64,
    /// Operations that reported `Completed` and were disposed
    pub completed: u64,
    /// Recurring instances appended to the queue
    pub materialized: u64,
    /// Work was left over when the budget ran out
    pub budget_exhausted: bool,
}

impl TickReport {
    pub fn summary(&self) -> String {
        format!(
            "Tick: {}, Steps: {}, Completed: {}, Materialized: {}, Exhausted: {}",
            self.tick, self.steps, self.completed, self.materialized, self.budget_exhausted
        )
    }
}

/// Cooperative scheduler.
///
/// Top-level operations run FIFO, only the head advancing. Sub-operations
/// scheduled by a step go on a LIFO stack that takes strict priority over the
/// queue, so they finish depth-first before their parent's next step.
pub struct Worker<C, H>
where
    C: Clock,
    H: Host,
{
    config: WorkerConfig,
    clock: C,
    host: H,
    queue: Deque<Box<dyn Operation>>,
    stack: Deque<Box<dyn Operation>>,
    spawned: Vec<Box<dyn Operation>>,
    recurring: Vec<RecurringRegistration>,
    trace: Option<Box<dyn TraceSink>>,
    tick: u64,
}

impl<C, H> Worker<C, H>
where
    C: Clock,
    H: Host,
{
    pub fn new(config: WorkerConfig, clock: C, host: H) -> Self {
        Self {
            config,
            clock,
            host,
            queue: Deque::new(),
            stack: Deque::new(),
            spawned: Vec::new(),
            recurring: Vec::new(),
            trace: None,
            tick: 0,
        }
    }

    /// Fire `construct` every `interval`, starting one interval from now.
    ///
    /// Due times saturate at `Duration::MAX`, so an interval too large to
    /// represent simply never comes due.
    pub fn register_recurring<F>(&mut self, interval: Duration, construct: F)
    where
        F: FnMut() -> Box<dyn Operation> + 'static,
    {
        let next_occurrence = self.clock.now().saturating_add(interval);
        self.recurring.push(RecurringRegistration {
            construct: Box::new(construct),
            interval,
            next_occurrence,
        });
        debug!(
            interval_ms = millis(interval),
            registrations = self.recurring.len(),
            "Registered recurring operation"
        );
    }

    /// Drop every recurring registration. Already queued instances still run.
    pub fn clear_recurring(&mut self) {
        info!(cleared = self.recurring.len(), "Cleared recurring operations");
        self.recurring.clear();
    }

    /// Append `operation` to the top-level queue. Nothing runs until [`Self::run`].
    pub fn schedule(&mut self, operation: Box<dyn Operation>) {
        self.queue.add_to_back(operation);
    }

    /// One host tick.
    ///
    /// When idle, due recurring operations are materialized and the cadence is
    /// derived from the nearest due time. Queued work then executes step by
    /// step until the host's instruction count reaches the budget; the check
    /// happens between steps, never inside one.
    pub fn run(&mut self) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        if self.is_idle() {
            if self.recurring.is_empty() {
                self.host.set_update_frequency(UpdateFrequency::NONE);
                return report;
            }

            report.materialized = self.materialize_due();
            let cadence = self.cadence_for_next_due();
            self.request(cadence);

            if report.materialized == 0 {
                return report;
            }
        }

        let budget = self.config.instruction_budget;
        loop {
            if self.host.instruction_count() >= budget {
                report.budget_exhausted = !self.is_idle();
                break;
            }
            let Some(status) = self.step() else {
                break;
            };
            report.steps += 1;
            if status.is_completed() {
                report.completed += 1;
            }
        }

        self.request(UpdateFrequency::ONCE);

        debug!(
            tick = report.tick,
            steps = report.steps,
            completed = report.completed,
            pending = self.queue.len(),
            depth = self.stack.len(),
            "Worker tick"
        );
        if let Some(sink) = self.trace.as_mut() {
            sink.emit(TraceEvent::TickEnd {
                tick: report.tick,
                steps: report.steps,
                outstanding: (self.queue.len() + self.stack.len()) as u64,
            });
        }

        report
    }

    /// Top-level operations waiting or in progress.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn sub_operation_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn recurring_count(&self) -> usize {
        self.recurring.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.stack.is_empty()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace = Some(sink);
    }

    /// Execute one step of the highest-priority operation.
    fn step(&mut self) -> Option<OperationStatus> {
        let from_stack = !self.stack.is_empty();
        let status = {
            let operation = if from_stack {
                self.stack.back_mut()
            } else {
                self.queue.front_mut()
            }?;
            let mut sub = SubOperations::new(&mut self.spawned);
            operation.execute(&mut sub)
        };

        trace!(tick = self.tick, from_stack, ?status, "Executed operation step");

        if status.is_completed() {
            let finished = if from_stack {
                self.stack.remove_from_back()
            } else {
                self.queue.remove_from_front()
            };
            if let Ok(operation) = finished {
                operation.dispose();
            }
            if let Some(sink) = self.trace.as_mut() {
                sink.emit(TraceEvent::Completed {
                    tick: self.tick,
                    sub_operation: from_stack,
                });
            }
        }

        // Last scheduled ends up on top and runs first.
        for operation in self.spawned.drain(..) {
            self.stack.add_to_back(operation);
        }

        Some(status)
    }

    fn materialize_due(&mut self) -> u64 {
        let now = self.clock.now();
        let mut materialized = 0;

        for (index, registration) in self.recurring.iter_mut().enumerate() {
            if registration.next_occurrence > now {
                continue;
            }
            self.queue.add_to_back((registration.construct)());
            registration.next_occurrence = registration
                .next_occurrence
                .saturating_add(registration.interval);
            materialized += 1;

            if let Some(sink) = self.trace.as_mut() {
                sink.emit(TraceEvent::Materialized {
                    tick: self.tick,
                    registration: index,
                    interval_ms: millis(registration.interval),
                });
            }
        }

        if materialized > 0 {
            debug!(tick = self.tick, materialized, "Materialized recurring operations");
        }
        materialized
    }

    fn cadence_for_next_due(&self) -> UpdateFrequency {
        let now = self.clock.now();
        let nearest = self
            .recurring
            .iter()
            .map(|registration| registration.next_occurrence.saturating_sub(now))
            .min();

        match nearest {
            None => UpdateFrequency::NONE,
            Some(due) if due < self.config.once_threshold() => UpdateFrequency::ONCE,
            Some(due) if due < self.config.update10_threshold() => UpdateFrequency::UPDATE10,
            Some(_) => UpdateFrequency::UPDATE100,
        }
    }

    /// `NONE` replaces the host's cadence; anything else is added to it.
    fn request(&mut self, frequency: UpdateFrequency) {
        if frequency.is_none() {
            self.host.set_update_frequency(UpdateFrequency::NONE);
        } else {
            let current = self.host.update_frequency();
            self.host.set_update_frequency(current | frequency);
        }
    }
}

impl<C, H> fmt::Debug for Worker<C, H>
where
    C: Clock,
    H: Host,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("tick", &self.tick)
            .field("pending", &self.queue.len())
            .field("sub_operations", &self.stack.len())
            .field("recurring", &self.recurring.len())
            .field("config", &self.config)
            .finish()
    }
}
