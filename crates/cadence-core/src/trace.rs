//! Structured worker events, delivered to an optional [`TraceSink`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::Deque;

/// Something the worker did during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// A recurring registration produced a fresh instance.
    Materialized {
        tick: u64,
        registration: usize,
        interval_ms: u64,
    },
    /// An operation reported `Completed` and was disposed.
    Completed { tick: u64, sub_operation: bool },
    /// End of a `run` call. `outstanding` counts queued plus stacked operations.
    TickEnd {
        tick: u64,
        steps: u64,
        outstanding: u64,
    },
}

impl TraceEvent {
    pub fn tick(&self) -> u64 {
        match *self {
            TraceEvent::Materialized { tick, .. }
            | TraceEvent::Completed { tick, .. }
            | TraceEvent::TickEnd { tick, .. } => tick,
        }
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TraceEvent::Materialized {
                tick,
                registration,
                interval_ms,
            } => write!(
                f,
                "[{tick}] materialized registration {registration} (every {interval_ms}ms)"
            ),
            TraceEvent::Completed {
                tick,
                sub_operation,
            } => {
                let origin = if sub_operation { "sub-operation" } else { "top-level" };
                write!(f, "[{tick}] completed {origin}")
            }
            TraceEvent::TickEnd {
                tick,
                steps,
                outstanding,
            } => write!(f, "[{tick}] {steps} steps, {outstanding} outstanding"),
        }
    }
}

/// Whole milliseconds, saturating for intervals beyond `u64::MAX` ms.
pub(crate) fn millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

/// Collects every event.
#[derive(Debug, Default)]
pub struct VecTraceSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for VecTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

/// Keeps only the most recent `capacity` events, dropping the oldest.
#[derive(Debug)]
pub struct RingTraceSink {
    events: Deque<TraceEvent>,
    limit: usize,
    dropped: u64,
}

impl RingTraceSink {
    pub fn new(capacity: usize) -> Self {
        let limit = capacity.max(1);
        Self {
            events: Deque::with_capacity(limit),
            limit,
            dropped: 0,
        }
    }

    pub fn events(&self) -> &Deque<TraceEvent> {
        &self.events
    }

    /// Events evicted to make room for newer ones.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl TraceSink for RingTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        if self.events.len() == self.limit && self.events.remove_from_front().is_ok() {
            self.dropped += 1;
        }
        self.events.add_to_back(event);
    }
}

/// Lets the owner keep reading a sink it has handed to a worker.
impl<S: TraceSink> TraceSink for Rc<RefCell<S>> {
    fn emit(&mut self, event: TraceEvent) {
        self.borrow_mut().emit(event);
    }
}
