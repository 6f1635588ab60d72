//! Demo workload - pooled sweep and probe operations plus a periodic audit.
//!
//! A sweep walks a set of slots one per step, handing each to a probe
//! sub-operation that checksums the slot a word at a time.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use cadence_core::{
    Clock, InstructionMeter, ObjectPool, Operation, OperationStatus, Phase, Recycler,
    ResultSlot, SimulatedHost, SubOperations, Worker,
};

pub const SWEEP_INTERVAL: Duration = Duration::from_millis(100);
pub const AUDIT_INTERVAL: Duration = Duration::from_millis(1000);

const SLOTS_PER_SWEEP: usize = 6;
const WORDS_PER_SLOT: u64 = 4;

const PROBE_STEP_COST: u64 = 120;
const SWEEP_STEP_COST: u64 = 40;
const AUDIT_STEP_COST: u64 = 25;

/// Counters shared by every demo operation.
#[derive(Debug, Default)]
pub struct DemoStats {
    pub sweeps: Cell<u64>,
    pub probes: Cell<u64>,
    pub audits: Cell<u64>,
    pub checksum: Cell<u64>,
}

impl DemoStats {
    fn bump(cell: &Cell<u64>) {
        cell.set(cell.get() + 1);
    }
}

pub struct ProbeOperation {
    slot: u64,
    word: u64,
    acc: u64,
    out: ResultSlot<u64>,
    meter: InstructionMeter,
    stats: Rc<DemoStats>,
    recycler: Recycler<ProbeOperation>,
}

impl ProbeOperation {
    fn new(meter: InstructionMeter, stats: Rc<DemoStats>, recycler: Recycler<Self>) -> Self {
        Self {
            slot: 0,
            word: 0,
            acc: 0,
            out: ResultSlot::new(),
            meter,
            stats,
            recycler,
        }
    }

    fn start(&mut self, slot: u64, out: ResultSlot<u64>) {
        self.slot = slot;
        self.out = out;
    }

    fn reset(&mut self) {
        self.slot = 0;
        self.word = 0;
        self.acc = 0;
    }
}

impl Operation for ProbeOperation {
    fn execute(&mut self, _sub: &mut SubOperations<'_>) -> OperationStatus {
        self.meter.charge(PROBE_STEP_COST);
        if self.word < WORDS_PER_SLOT {
            let word = self.slot.wrapping_mul(0x9E37_79B9).rotate_left(self.word as u32);
            self.acc = self.acc.wrapping_add(word);
            self.word += 1;
            return OperationStatus::NotCompleted;
        }

        self.out.publish(self.acc);
        DemoStats::bump(&self.stats.probes);
        OperationStatus::Completed
    }

    fn dispose(mut self: Box<Self>) {
        self.reset();
        let recycler = self.recycler.clone();
        recycler.release(self);
    }
}

pub struct SweepOperation {
    phase: Phase,
    index: usize,
    total: u64,
    probe_result: ResultSlot<u64>,
    probes: Rc<ObjectPool<ProbeOperation>>,
    meter: InstructionMeter,
    stats: Rc<DemoStats>,
    recycler: Recycler<SweepOperation>,
}

impl SweepOperation {
    fn new(
        probes: Rc<ObjectPool<ProbeOperation>>,
        meter: InstructionMeter,
        stats: Rc<DemoStats>,
        recycler: Recycler<Self>,
    ) -> Self {
        Self {
            phase: Phase::Initializing,
            index: 0,
            total: 0,
            probe_result: ResultSlot::new(),
            probes,
            meter,
            stats,
            recycler,
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Initializing;
        self.index = 0;
        self.total = 0;
        self.probe_result.clear();
    }

    fn collect_probe(&mut self) {
        if let Some(sum) = self.probe_result.take() {
            self.total = self.total.wrapping_add(sum);
        }
    }
}

impl Operation for SweepOperation {
    fn execute(&mut self, sub: &mut SubOperations<'_>) -> OperationStatus {
        self.meter.charge(SWEEP_STEP_COST);
        match self.phase {
            Phase::Initializing => {
                self.index = 0;
                self.total = 0;
                self.phase = self.phase.next();
            }
            Phase::Starting => {
                tracing::trace!(slots = SLOTS_PER_SWEEP, "Sweep starting");
                self.phase = self.phase.next();
            }
            Phase::Working => {
                self.collect_probe();
                if self.index == SLOTS_PER_SWEEP {
                    self.phase = self.phase.next();
                    return OperationStatus::NotCompleted;
                }

                let mut probe = self.probes.get();
                probe.start(self.index as u64, self.probe_result.clone());
                sub.schedule(probe);
                self.index += 1;
            }
            Phase::Completing => {
                DemoStats::bump(&self.stats.sweeps);
                self.stats
                    .checksum
                    .set(self.stats.checksum.get() ^ self.total);
                tracing::debug!(total = self.total, "Sweep complete");
                return OperationStatus::Completed;
            }
        }
        OperationStatus::NotCompleted
    }

    fn dispose(mut self: Box<Self>) {
        self.reset();
        let recycler = self.recycler.clone();
        recycler.release(self);
    }
}

/// Reports the running counters, one line per step.
pub struct AuditOperation {
    reported: bool,
    meter: InstructionMeter,
    stats: Rc<DemoStats>,
}

impl Operation for AuditOperation {
    fn execute(&mut self, _sub: &mut SubOperations<'_>) -> OperationStatus {
        self.meter.charge(AUDIT_STEP_COST);
        if !self.reported {
            tracing::info!(
                sweeps = self.stats.sweeps.get(),
                probes = self.stats.probes.get(),
                checksum = self.stats.checksum.get(),
                "Audit"
            );
            self.reported = true;
            return OperationStatus::NotCompleted;
        }
        DemoStats::bump(&self.stats.audits);
        OperationStatus::Completed
    }
}

/// Register the demo workload on `worker`.
pub fn install<C: Clock>(worker: &mut Worker<C, SimulatedHost>, stats: &Rc<DemoStats>) {
    let meter = worker.host().meter().clone();

    let probes = {
        let meter = meter.clone();
        let stats = stats.clone();
        Rc::new(ObjectPool::new(move |recycler: Recycler<ProbeOperation>| {
            ProbeOperation::new(meter.clone(), stats.clone(), recycler)
        }))
    };

    let sweeps = {
        let meter = meter.clone();
        let stats = stats.clone();
        ObjectPool::new(move |recycler: Recycler<SweepOperation>| {
            SweepOperation::new(probes.clone(), meter.clone(), stats.clone(), recycler)
        })
    };
    worker.register_recurring(SWEEP_INTERVAL, move || -> Box<dyn Operation> {
        sweeps.get()
    });

    let stats = stats.clone();
    worker.register_recurring(AUDIT_INTERVAL, move || -> Box<dyn Operation> {
        Box::new(AuditOperation {
            reported: false,
            meter: meter.clone(),
            stats: stats.clone(),
        })
    });
}
