use cadence_core::{
    InstructionMeter, ManualClock, ObjectPool, Operation, OperationStatus, Recycler,
    SimulatedHost, SubOperations, Worker, WorkerConfig,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

struct Step {
    remaining: u32,
    meter: InstructionMeter,
    recycler: Recycler<Step>,
}

impl Operation for Step {
    fn execute(&mut self, _sub: &mut SubOperations<'_>) -> OperationStatus {
        self.meter.charge(1);
        self.remaining -= 1;
        OperationStatus::from(self.remaining == 0)
    }

    fn dispose(self: Box<Self>) {
        let recycler = self.recycler.clone();
        recycler.release(self);
    }
}

fn bench_worker_tick(c: &mut Criterion) {
    let host = SimulatedHost::new();
    let meter = host.meter().clone();
    let mut worker = Worker::new(
        WorkerConfig::default().with_budget(256),
        ManualClock::new(),
        host,
    );

    let pool_meter = meter.clone();
    let pool = ObjectPool::new(move |recycler: Recycler<Step>| Step {
        remaining: 0,
        meter: pool_meter.clone(),
        recycler,
    });

    c.bench_function("cadence-core/tick(ops=32,steps=8,budget=256)", |b| {
        b.iter(|| {
            for _ in 0..32 {
                let mut op = pool.get();
                op.remaining = 8;
                worker.schedule(op);
            }
            worker.host_mut().begin_tick();
            let report = worker.run();
            black_box(report.steps);
        })
    });
}

criterion_group!(benches, bench_worker_tick);
criterion_main!(benches);
