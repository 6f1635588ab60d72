//! Cooperative, instruction-budgeted operation scheduler.
//!
//! Long-running work is expressed as resumable [`Operation`]s that advance one
//! small step per call. A [`Worker`] drives them in short host-metered slices,
//! giving sub-operations strict LIFO priority and re-arming recurring work on a
//! timer. Per-operation state is recycled through [`ObjectPool`]s backed by the
//! ring-buffer [`Deque`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod deque;
pub mod error;
pub mod host;
pub mod operation;
pub mod pool;
pub mod scheduler;
pub mod trace;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::WorkerConfig;
pub use deque::Deque;
pub use error::{ConfigError, DequeError};
pub use host::{Host, InstructionMeter, SimulatedHost, UpdateFrequency};
pub use operation::{
    FnOperation, Operation, OperationStatus, Phase, ResultOperation, ResultSlot, SubOperations,
};
pub use pool::{ObjectPool, Recycler};
pub use scheduler::{TickReport, Worker};
pub use trace::{RingTraceSink, TraceEvent, TraceSink, VecTraceSink};
