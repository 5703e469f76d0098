//! Deferred-task scheduling for the single-threaded event loop.
//!
//! There is no parallelism in this system, only reentrant callback
//! dispatch; "suspension" means queueing a closure for a later tick. The
//! host's event loop drains the queue in production; tests drive it
//! explicitly with [`Scheduler::run_pending`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Identifies a scheduled task for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(u64);

struct Task {
    id: u64,
    delay_ms: u64,
    run: Box<dyn FnOnce()>,
}

struct SchedulerInner {
    next_id: Cell<u64>,
    tasks: RefCell<Vec<Task>>,
}

/// A cooperative task queue: one-tick deferrals and cancellable timeouts
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                next_id: Cell::new(0),
                tasks: RefCell::new(Vec::new()),
            }),
        }
    }

    fn push(&self, delay_ms: u64, run: Box<dyn FnOnce()>) -> TaskId {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.tasks.borrow_mut().push(Task { id, delay_ms, run });
        TaskId(id)
    }

    /// Queues a closure for the next tick
    pub fn defer<F: FnOnce() + 'static>(&self, run: F) -> TaskId {
        self.push(0, Box::new(run))
    }

    /// Queues a closure after a delay; cancel-and-reschedule implements
    /// debouncing
    pub fn timeout<F: FnOnce() + 'static>(&self, delay_ms: u64, run: F) -> TaskId {
        self.push(delay_ms, Box::new(run))
    }

    /// Cancels a queued task; unknown or already-run tasks are a no-op
    pub fn cancel(&self, task: TaskId) {
        self.inner.tasks.borrow_mut().retain(|t| t.id != task.0);
    }

    /// Runs every currently queued task in scheduling order. Tasks queued
    /// during the run wait for the next call.
    pub fn run_pending(&self) {
        let mut batch: Vec<Task> = self.inner.tasks.borrow_mut().drain(..).collect();
        batch.sort_by_key(|t| (t.delay_ms, t.id));
        for task in batch {
            (task.run)();
        }
    }

    /// Number of queued tasks
    pub fn pending(&self) -> usize {
        self.inner.tasks.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defer_runs_once() {
        let scheduler = Scheduler::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        scheduler.defer(move || count_clone.set(count_clone.get() + 1));

        assert_eq!(scheduler.pending(), 1);
        scheduler.run_pending();
        scheduler.run_pending();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_cancel_debounce() {
        let scheduler = Scheduler::new();
        let count = Rc::new(Cell::new(0));

        let count_clone = Rc::clone(&count);
        let first = scheduler.timeout(100, move || count_clone.set(count_clone.get() + 1));
        scheduler.cancel(first);

        let count_clone = Rc::clone(&count);
        scheduler.timeout(100, move || count_clone.set(count_clone.get() + 1));

        scheduler.run_pending();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_tasks_queued_during_run_wait() {
        let scheduler = Scheduler::new();
        let count = Rc::new(Cell::new(0));

        let inner_scheduler = scheduler.clone();
        let count_clone = Rc::clone(&count);
        scheduler.defer(move || {
            let count_inner = Rc::clone(&count_clone);
            inner_scheduler.defer(move || count_inner.set(count_inner.get() + 10));
            count_clone.set(count_clone.get() + 1);
        });

        scheduler.run_pending();
        assert_eq!(count.get(), 1);
        scheduler.run_pending();
        assert_eq!(count.get(), 11);
    }
}
