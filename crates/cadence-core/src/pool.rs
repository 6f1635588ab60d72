//! Recycling allocator for per-operation state.
//!
//! A pool hands out boxed instances and takes them back through a [`Recycler`]
//! handle, so a steady workload allocates once per peak concurrent use instead
//! of once per task. There is no eviction: the idle queue grows to the
//! high-water mark and stays there.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::Deque;

type Idle<T> = RefCell<Deque<Box<T>>>;

pub struct ObjectPool<T> {
    idle: Rc<Idle<T>>,
    construct: Box<dyn Fn(Recycler<T>) -> T>,
}

impl<T: 'static> ObjectPool<T> {
    /// Create a pool around `construct`, which receives the handle the new
    /// instance must use to hand itself back.
    pub fn new<F>(construct: F) -> Self
    where
        F: Fn(Recycler<T>) -> T + 'static,
    {
        Self {
            idle: Rc::new(RefCell::new(Deque::new())),
            construct: Box::new(construct),
        }
    }

    /// Take an idle instance, or construct a new one if none is waiting.
    ///
    /// The caller must initialize every per-use field before scheduling it.
    pub fn get(&self) -> Box<T> {
        let recycled = self.idle.borrow_mut().remove_from_front().ok();
        match recycled {
            Some(instance) => instance,
            None => Box::new((self.construct)(self.recycler())),
        }
    }

    /// Number of idle instances.
    pub fn count(&self) -> usize {
        self.idle.borrow().len()
    }

    pub fn recycler(&self) -> Recycler<T> {
        Recycler {
            idle: Rc::downgrade(&self.idle),
        }
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("idle", &self.idle.borrow().len())
            .finish()
    }
}

/// Handle that returns instances to the pool that created them.
///
/// Holds the pool weakly; idle instances carrying their own recycler do not
/// keep it alive.
pub struct Recycler<T> {
    idle: Weak<Idle<T>>,
}

impl<T> Recycler<T> {
    /// Put `instance` back on the idle queue. Dropped if the pool is gone.
    pub fn release(&self, instance: Box<T>) {
        if let Some(idle) = self.idle.upgrade() {
            idle.borrow_mut().add_to_back(instance);
        }
    }
}

impl<T> Clone for Recycler<T> {
    fn clone(&self) -> Self {
        Self {
            idle: self.idle.clone(),
        }
    }
}

impl<T> fmt::Debug for Recycler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recycler")
            .field("live", &(self.idle.strong_count() > 0))
            .finish()
    }
}
