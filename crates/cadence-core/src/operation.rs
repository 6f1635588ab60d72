use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Completed,
    NotCompleted,
}

impl OperationStatus {
    pub fn is_completed(self) -> bool {
        matches!(self, OperationStatus::Completed)
    }
}

impl From<bool> for OperationStatus {
    fn from(done: bool) -> Self {
        if done {
            OperationStatus::Completed
        } else {
            OperationStatus::NotCompleted
        }
    }
}

/// A resumable unit of work driven by a [`crate::Worker`].
///
/// Each `execute` call must do a small, bounded amount of work and return.
/// Progress lives in the implementor's fields; returning
/// [`OperationStatus::NotCompleted`] means "call me again".
pub trait Operation: 'static {
    fn execute(&mut self, sub: &mut SubOperations<'_>) -> OperationStatus;

    /// Called exactly once, right after `execute` reports `Completed`.
    ///
    /// Pooled operations reset their state here and release themselves.
    fn dispose(self: Box<Self>) {}
}

/// Operations that produce a value.
pub trait ResultOperation: Operation {
    type Output;

    /// `Some` once the operation has completed.
    fn result(&self) -> Option<&Self::Output>;
}

/// Sub-operations scheduled by the step currently executing.
///
/// They run to completion, most recently scheduled first, before the
/// scheduling operation gets its next step.
pub struct SubOperations<'a> {
    spawned: &'a mut Vec<Box<dyn Operation>>,
}

impl<'a> SubOperations<'a> {
    pub fn new(spawned: &'a mut Vec<Box<dyn Operation>>) -> Self {
        Self { spawned }
    }

    pub fn schedule(&mut self, operation: Box<dyn Operation>) {
        self.spawned.push(operation);
    }
}

/// Linear phase vocabulary for operation state machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Phase {
    #[default]
    Initializing,
    Starting,
    Working,
    Completing,
}

impl Phase {
    /// The following phase; `Completing` is terminal.
    pub fn next(self) -> Self {
        match self {
            Phase::Initializing => Phase::Starting,
            Phase::Starting => Phase::Working,
            Phase::Working => Phase::Completing,
            Phase::Completing => Phase::Completing,
        }
    }
}

/// Shared cell through which a sub-operation hands its result to the
/// operation that scheduled it.
pub struct ResultSlot<T> {
    value: Rc<RefCell<Option<T>>>,
}

impl<T> ResultSlot<T> {
    pub fn new() -> Self {
        Self {
            value: Rc::new(RefCell::new(None)),
        }
    }

    pub fn publish(&self, value: T) {
        *self.value.borrow_mut() = Some(value);
    }

    pub fn take(&self) -> Option<T> {
        self.value.borrow_mut().take()
    }

    pub fn clear(&self) {
        self.value.borrow_mut().take();
    }
}

impl<T: Clone> ResultSlot<T> {
    pub fn get(&self) -> Option<T> {
        self.value.borrow().clone()
    }
}

impl<T> Clone for ResultSlot<T> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
        }
    }
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for ResultSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResultSlot").field(&self.value.borrow()).finish()
    }
}

/// Adapts a closure into an [`Operation`].
pub struct FnOperation<F>
where
    F: FnMut(&mut SubOperations<'_>) -> OperationStatus + 'static,
{
    step: F,
}

impl<F> FnOperation<F>
where
    F: FnMut(&mut SubOperations<'_>) -> OperationStatus + 'static,
{
    pub fn new(step: F) -> Self {
        Self { step }
    }

    pub fn boxed(step: F) -> Box<dyn Operation> {
        Box::new(Self::new(step))
    }
}

impl<F> Operation for FnOperation<F>
where
    F: FnMut(&mut SubOperations<'_>) -> OperationStatus + 'static,
{
    fn execute(&mut self, sub: &mut SubOperations<'_>) -> OperationStatus {
        (self.step)(sub)
    }
}
