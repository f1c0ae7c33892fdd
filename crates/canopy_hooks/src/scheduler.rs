//! The cooperative re-render scheduler.
//!
//! A single-threaded FIFO of deferred tasks. Nothing runs until the host
//! drains the queue with [`Scheduler::tick`] or [`Scheduler::run_until_idle`];
//! every state change made before that point is absorbed into the re-render
//! already queued for its component.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use canopy_tree::TreeError;

use crate::error::HookError;

type Task = Box<dyn FnOnce() -> Result<(), TreeError>>;

/// Configuration for a [`Scheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    max_tasks_per_drain: usize,
}

impl SchedulerConfig {
    /// Default cap on tasks run by one [`Scheduler::run_until_idle`] call.
    pub const DEFAULT_MAX_TASKS_PER_DRAIN: usize = 10_000;

    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_tasks_per_drain: Self::DEFAULT_MAX_TASKS_PER_DRAIN,
        }
    }

    /// Sets how many tasks one drain may run before it fails with
    /// [`HookError::RenderLoop`].
    #[must_use]
    pub fn with_max_tasks_per_drain(mut self, max: usize) -> Self {
        self.max_tasks_per_drain = max;
        self
    }

    /// Returns the per-drain task cap.
    #[must_use]
    pub fn max_tasks_per_drain(&self) -> usize {
        self.max_tasks_per_drain
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct SchedulerInner {
    queue: RefCell<VecDeque<Task>>,
    config: SchedulerConfig,
}

/// A FIFO of deferred tasks, shared by every component built against it.
///
/// Cloning yields another handle to the same queue.
///
/// # Example
///
/// ```
/// use canopy_hooks::scheduler::Scheduler;
///
/// let scheduler = Scheduler::new();
/// scheduler.defer(|| Ok(()));
/// scheduler.defer(|| Ok(()));
///
/// assert_eq!(scheduler.pending(), 2);
/// assert_eq!(scheduler.run_until_idle()?, 2);
/// # Ok::<(), canopy_tree::TreeError>(())
/// ```
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Scheduler {
    /// Creates a scheduler with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Creates a scheduler with the given configuration.
    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                queue: RefCell::new(VecDeque::new()),
                config,
            }),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Queues `task` to run on a later tick.
    pub fn defer(&self, task: impl FnOnce() -> Result<(), TreeError> + 'static) {
        let mut queue = self.inner.queue.borrow_mut();
        queue.push_back(Box::new(task));
        tracing::trace!(queued = queue.len(), "task deferred");
    }

    /// Returns the number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Returns `true` if no tasks are queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }

    /// Runs the oldest queued task. Returns `Ok(false)` if the queue was empty.
    ///
    /// # Errors
    ///
    /// Returns the task's error. Later tasks stay queued.
    pub fn tick(&self) -> Result<bool, TreeError> {
        let Some(task) = self.pop() else {
            return Ok(false);
        };
        task()?;
        Ok(true)
    }

    /// Runs tasks until the queue is empty, including tasks queued by the tasks
    /// themselves, and returns how many ran.
    ///
    /// # Errors
    ///
    /// Returns the first task error, leaving later tasks queued, or
    /// [`HookError::RenderLoop`] once `max_tasks_per_drain` tasks have run
    /// with more still queued.
    pub fn run_until_idle(&self) -> Result<usize, TreeError> {
        let limit = self.inner.config.max_tasks_per_drain;
        let mut ran = 0;
        while let Some(task) = self.pop() {
            if ran == limit {
                self.inner.queue.borrow_mut().push_front(task);
                return Err(HookError::RenderLoop { limit }.into());
            }
            task()?;
            ran += 1;
        }
        if ran > 0 {
            tracing::debug!(ran, "scheduler drained");
        }
        Ok(ran)
    }

    fn pop(&self) -> Option<Task> {
        self.inner.queue.borrow_mut().pop_front()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.pending())
            .field("config", &self.inner.config)
            .finish()
    }
}
