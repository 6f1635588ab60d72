use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use cadence_core::{
    FnOperation, Host, InstructionMeter, ManualClock, Operation, OperationStatus,
    ResultOperation, ResultSlot, SimulatedHost, SubOperations, TraceEvent, UpdateFrequency,
    VecTraceSink, Worker, WorkerConfig,
};

type Log = Rc<RefCell<Vec<String>>>;

/// Runs `steps` steps, charging one instruction each; schedules `children` on
/// its first step.
struct Scripted {
    name: &'static str,
    steps: u32,
    done: u32,
    children: Vec<Box<dyn Operation>>,
    meter: InstructionMeter,
    log: Log,
}

impl Scripted {
    fn new(name: &'static str, steps: u32, meter: &InstructionMeter, log: &Log) -> Self {
        Self {
            name,
            steps,
            done: 0,
            children: Vec::new(),
            meter: meter.clone(),
            log: log.clone(),
        }
    }

    fn with_children(mut self, children: Vec<Box<dyn Operation>>) -> Self {
        self.children = children;
        self
    }

    fn boxed(self) -> Box<dyn Operation> {
        Box::new(self)
    }
}

impl Operation for Scripted {
    fn execute(&mut self, sub: &mut SubOperations<'_>) -> OperationStatus {
        self.done += 1;
        self.meter.charge(1);
        self.log
            .borrow_mut()
            .push(format!("{}:{}", self.name, self.done));
        if self.done == 1 {
            for child in self.children.drain(..) {
                sub.schedule(child);
            }
        }
        OperationStatus::from(self.done >= self.steps)
    }

    fn dispose(self: Box<Self>) {
        self.log
            .borrow_mut()
            .push(format!("{}:disposed", self.name));
    }
}

fn worker_with_budget(
    budget: u64,
) -> (Worker<ManualClock, SimulatedHost>, InstructionMeter, Log) {
    let host = SimulatedHost::new();
    let meter = host.meter().clone();
    let worker = Worker::new(
        WorkerConfig::default().with_budget(budget),
        ManualClock::new(),
        host,
    );
    (worker, meter, Log::default())
}

fn tick(worker: &mut Worker<ManualClock, SimulatedHost>) -> cadence_core::TickReport {
    worker.host_mut().begin_tick();
    worker.run()
}

fn steps_only(log: &Log) -> Vec<String> {
    log.borrow()
        .iter()
        .filter(|entry| !entry.ends_with(":disposed"))
        .cloned()
        .collect()
}

#[test]
fn schedule_does_not_execute_synchronously() {
    let (mut worker, meter, log) = worker_with_budget(100);
    worker.schedule(Scripted::new("a", 1, &meter, &log).boxed());

    assert!(log.borrow().is_empty());
    assert_eq!(worker.pending(), 1);

    tick(&mut worker);
    assert_eq!(*log.borrow(), vec!["a:1", "a:disposed"]);
    assert!(worker.is_idle());
}

#[test]
fn budget_splits_work_across_ticks_in_fifo_order() {
    let (mut worker, meter, log) = worker_with_budget(4);
    let names = ["a", "b", "c", "d", "e"];
    for name in names {
        worker.schedule(Scripted::new(name, 3, &meter, &log).boxed());
    }

    let mut calls = 0;
    let mut total_steps = 0;
    let mut pending_after = Vec::new();
    while !worker.is_idle() {
        let report = tick(&mut worker);
        calls += 1;
        total_steps += report.steps;
        pending_after.push(worker.pending());
        assert!(report.steps <= 4);
    }

    assert_eq!(total_steps, 15);
    assert_eq!(calls, 4);
    assert_eq!(pending_after, vec![4, 3, 1, 0]);

    let expected: Vec<String> = names
        .iter()
        .flat_map(|name| (1..=3).map(move |step| format!("{name}:{step}")))
        .collect();
    assert_eq!(steps_only(&log), expected);
}

#[test]
fn exhausted_budget_is_reported_and_requests_another_tick() {
    let (mut worker, meter, log) = worker_with_budget(2);
    worker.schedule(Scripted::new("a", 5, &meter, &log).boxed());

    let report = tick(&mut worker);
    assert_eq!(report.steps, 2);
    assert!(report.budget_exhausted);
    assert!(worker
        .host()
        .update_frequency()
        .contains(UpdateFrequency::ONCE));
}

#[test]
fn sub_operations_run_depth_first_lifo_before_parent_resumes() {
    let (mut worker, meter, log) = worker_with_budget(1_000);

    let d = Scripted::new("d", 2, &meter, &log).boxed();
    let c = Scripted::new("c", 1, &meter, &log)
        .with_children(vec![d])
        .boxed();
    let b = Scripted::new("b", 2, &meter, &log).boxed();
    let a = Scripted::new("a", 2, &meter, &log)
        .with_children(vec![b, c])
        .boxed();
    worker.schedule(a);
    worker.schedule(Scripted::new("e", 1, &meter, &log).boxed());

    let report = tick(&mut worker);

    assert_eq!(
        *log.borrow(),
        vec![
            "a:1",
            "c:1",
            "c:disposed",
            "d:1",
            "d:2",
            "d:disposed",
            "b:1",
            "b:2",
            "b:disposed",
            "a:2",
            "a:disposed",
            "e:1",
            "e:disposed",
        ]
    );
    assert_eq!(report.completed, 5);
    assert!(worker.is_idle());
}

#[test]
fn sub_operation_stack_survives_across_ticks() {
    let (mut worker, meter, log) = worker_with_budget(2);

    let child = Scripted::new("child", 3, &meter, &log).boxed();
    worker.schedule(
        Scripted::new("parent", 2, &meter, &log)
            .with_children(vec![child])
            .boxed(),
    );
    worker.schedule(Scripted::new("next", 1, &meter, &log).boxed());

    tick(&mut worker);
    assert_eq!(steps_only(&log), vec!["parent:1", "child:1"]);
    assert_eq!(worker.sub_operation_depth(), 1);

    tick(&mut worker);
    assert_eq!(
        steps_only(&log),
        vec!["parent:1", "child:1", "child:2", "child:3"]
    );
    assert_eq!(worker.sub_operation_depth(), 0);

    tick(&mut worker);
    assert_eq!(
        steps_only(&log),
        vec!["parent:1", "child:1", "child:2", "child:3", "parent:2", "next:1"]
    );
}

#[test]
fn every_operation_is_disposed_exactly_once() {
    let (mut worker, meter, log) = worker_with_budget(3);

    let leaves: Vec<Box<dyn Operation>> = vec![
        Scripted::new("x", 2, &meter, &log).boxed(),
        Scripted::new("y", 1, &meter, &log).boxed(),
    ];
    worker.schedule(
        Scripted::new("root", 3, &meter, &log)
            .with_children(leaves)
            .boxed(),
    );
    worker.schedule(Scripted::new("tail", 2, &meter, &log).boxed());

    while !worker.is_idle() {
        tick(&mut worker);
    }

    let log = log.borrow();
    for name in ["root", "x", "y", "tail"] {
        let disposed = format!("{name}:disposed");
        assert_eq!(log.iter().filter(|e| **e == disposed).count(), 1, "{name}");

        let position = log.iter().position(|e| *e == disposed).unwrap();
        let last_step = log
            .iter()
            .rposition(|e| e.starts_with(&format!("{name}:")) && *e != disposed)
            .unwrap();
        assert_eq!(position, last_step + 1, "{name} disposed right after completing");
    }
}

/// Sums one element per step and publishes the total.
struct Sum {
    values: Vec<u64>,
    index: usize,
    total: u64,
    finished: bool,
    out: ResultSlot<u64>,
}

impl Operation for Sum {
    fn execute(&mut self, _sub: &mut SubOperations<'_>) -> OperationStatus {
        if let Some(value) = self.values.get(self.index) {
            self.total += value;
            self.index += 1;
            return OperationStatus::NotCompleted;
        }
        self.finished = true;
        self.out.publish(self.total);
        OperationStatus::Completed
    }
}

impl ResultOperation for Sum {
    type Output = u64;

    fn result(&self) -> Option<&u64> {
        self.finished.then_some(&self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuditState {
    Spawn,
    Collect,
}

struct Audit {
    state: AuditState,
    slot: ResultSlot<u64>,
    seen: Rc<RefCell<Option<u64>>>,
}

impl Operation for Audit {
    fn execute(&mut self, sub: &mut SubOperations<'_>) -> OperationStatus {
        match self.state {
            AuditState::Spawn => {
                sub.schedule(Box::new(Sum {
                    values: vec![3, 4, 5],
                    index: 0,
                    total: 0,
                    finished: false,
                    out: self.slot.clone(),
                }));
                self.state = AuditState::Collect;
                OperationStatus::NotCompleted
            }
            AuditState::Collect => {
                *self.seen.borrow_mut() = self.slot.take();
                OperationStatus::Completed
            }
        }
    }
}

#[test]
fn parent_reads_sub_operation_result_after_it_completes() {
    let (mut worker, _meter, _log) = worker_with_budget(1_000);
    let seen = Rc::new(RefCell::new(None));
    worker.schedule(Box::new(Audit {
        state: AuditState::Spawn,
        slot: ResultSlot::new(),
        seen: seen.clone(),
    }));

    let report = worker.run();
    assert_eq!(report.steps, 1 + 4 + 1);
    assert_eq!(*seen.borrow(), Some(12));
}

#[test]
fn result_is_only_available_once_completed() {
    let slot = ResultSlot::new();
    let mut sum = Sum {
        values: vec![1, 2],
        index: 0,
        total: 0,
        finished: false,
        out: slot.clone(),
    };
    let mut spawned = Vec::new();
    let mut sub = SubOperations::new(&mut spawned);

    assert_eq!(sum.execute(&mut sub), OperationStatus::NotCompleted);
    assert_eq!(sum.result(), None);
    assert_eq!(sum.execute(&mut sub), OperationStatus::NotCompleted);
    assert_eq!(sum.execute(&mut sub), OperationStatus::Completed);
    assert_eq!(sum.result(), Some(&3));
    assert_eq!(slot.get(), Some(3));
}

#[test]
fn idle_worker_without_registrations_requests_none() {
    let (mut worker, meter, log) = worker_with_budget(100);
    worker.schedule(Scripted::new("a", 1, &meter, &log).boxed());

    tick(&mut worker);
    assert!(worker
        .host()
        .update_frequency()
        .contains(UpdateFrequency::ONCE));

    let report = tick(&mut worker);
    assert_eq!(report.steps, 0);
    assert_eq!(worker.host().update_frequency(), UpdateFrequency::NONE);
}

#[test]
fn trace_sink_sees_completions_and_ticks() {
    let (mut worker, meter, log) = worker_with_budget(100);
    let sink = Rc::new(RefCell::new(VecTraceSink::default()));
    worker.set_trace_sink(Box::new(sink.clone()));

    worker.schedule(Scripted::new("a", 2, &meter, &log).boxed());
    tick(&mut worker);

    let sink = sink.borrow();
    assert_eq!(
        sink.events,
        vec![
            TraceEvent::Completed {
                tick: 1,
                sub_operation: false,
            },
            TraceEvent::TickEnd {
                tick: 1,
                steps: 2,
                outstanding: 0,
            },
        ]
    );
}

#[test]
fn closures_can_be_scheduled_as_operations() {
    let (mut worker, _meter, _log) = worker_with_budget(100);
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    worker.schedule(FnOperation::boxed(move |_sub: &mut SubOperations<'_>| {
        *counter.borrow_mut() += 1;
        OperationStatus::from(*counter.borrow() == 3)
    }));

    worker.run();
    assert_eq!(*calls.borrow(), 3);
}

#[test]
fn stacked_children_of_a_finished_parent_keep_the_worker_busy() {
    let (mut worker, meter, log) = worker_with_budget(1);
    let recurring_log = log.clone();
    worker.register_recurring(Duration::from_millis(100), move || -> Box<dyn Operation> {
        let log = recurring_log.clone();
        FnOperation::boxed(move |_sub: &mut SubOperations<'_>| {
            log.borrow_mut().push("recurring".to_string());
            OperationStatus::Completed
        })
    });

    let children = vec![
        Scripted::new("b", 1, &meter, &log).boxed(),
        Scripted::new("c", 1, &meter, &log).boxed(),
    ];
    worker.schedule(
        Scripted::new("a", 1, &meter, &log)
            .with_children(children)
            .boxed(),
    );

    let report = tick(&mut worker);
    assert!(report.budget_exhausted);
    assert_eq!(worker.pending(), 0);
    assert_eq!(worker.sub_operation_depth(), 2);
    assert!(!worker.is_idle());

    worker.clock().advance(Duration::from_millis(100));

    let report = tick(&mut worker);
    assert_eq!((report.materialized, report.steps), (0, 1));
    assert_eq!(worker.sub_operation_depth(), 1);

    let report = tick(&mut worker);
    assert_eq!((report.materialized, report.steps), (0, 1));
    assert!(worker.is_idle());

    let report = tick(&mut worker);
    assert_eq!(report.materialized, 1);

    assert_eq!(
        *log.borrow(),
        vec![
            "a:1",
            "a:disposed",
            "c:1",
            "c:disposed",
            "b:1",
            "b:disposed",
            "recurring"
        ]
    );
}
