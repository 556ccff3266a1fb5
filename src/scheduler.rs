//! Simulated clock and one-shot timer queue.
//!
//! Nothing here waits on real time. Tasks become due when the owner advances
//! the clock, and run in `(due_at, order)` order so equal deadlines keep their
//! scheduling order.

use tracing::{debug, trace};

use crate::dom::NodeId;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) i64);

impl TimerId {
    pub fn get(self) -> i64 {
        self.0
    }
}

/// Deferred work the page behaviors schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Begin fading a notice: inline `opacity` becomes `0`.
    FadeNotice(NodeId),
    /// Take a faded notice out of layout: inline `display` becomes `none`.
    HideNotice(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: TimerId,
    pub due_at: i64,
    pub order: i64,
    pub task: TimerTask,
}

/// Capability to schedule a one-shot callback relative to the current time.
pub trait Schedule {
    fn now_ms(&self) -> i64;

    /// Queues `task` to run `delay_ms` after now. Negative delays clamp to zero.
    fn set_timeout(&mut self, delay_ms: i64, task: TimerTask) -> TimerId;
}

#[derive(Debug)]
pub struct TimerQueue {
    tasks: Vec<PendingTimer>,
    now_ms: i64,
    step_limit: usize,
    next_timer_id: i64,
    next_task_order: i64,
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            now_ms: 0,
            step_limit: 10_000,
            next_timer_id: 1,
            next_task_order: 0,
        }
    }
}

impl Schedule for TimerQueue {
    fn now_ms(&self) -> i64 {
        self.now_ms
    }

    fn set_timeout(&mut self, delay_ms: i64, task: TimerTask) -> TimerId {
        let delay_ms = delay_ms.max(0);
        let due_at = self.now_ms.saturating_add(delay_ms);
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        self.tasks.push(PendingTimer {
            id,
            due_at,
            order,
            task,
        });
        trace!(id = id.0, due_at, delay_ms, ?task, "timer scheduled");
        id
    }
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Timer(
                "timer step limit requires at least 1 step".into(),
            ));
        }
        self.step_limit = max_steps;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Pending timers sorted by the order they would run in.
    pub fn pending(&self) -> Vec<PendingTimer> {
        let mut timers = self.tasks.clone();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    pub fn clear_timer(&mut self, id: TimerId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        before != self.tasks.len()
    }

    pub fn clear_all(&mut self) -> usize {
        let cleared = self.tasks.len();
        self.tasks.clear();
        cleared
    }

    /// Deadline `delta_ms` after now. The clock itself does not move.
    pub(crate) fn deadline_after(&self, delta_ms: i64) -> Result<i64> {
        if delta_ms < 0 {
            return Err(Error::Timer(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        Ok(self.now_ms.saturating_add(delta_ms))
    }

    pub(crate) fn check_deadline(&self, target_ms: i64) -> Result<i64> {
        if target_ms < self.now_ms {
            return Err(Error::Timer(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                self.now_ms
            )));
        }
        Ok(target_ms)
    }

    /// Runs every task due by `target_ms`, each with the clock at its own
    /// deadline, then leaves the clock at `target_ms`. Follow-up tasks that
    /// fall inside the window run too.
    pub(crate) fn run_until<F>(&mut self, target_ms: i64, exec: F) -> Result<usize>
    where
        F: FnMut(&mut Self, PendingTimer) -> Result<()>,
    {
        let ran = self.run_queue(Some(target_ms), exec)?;
        self.now_ms = self.now_ms.max(target_ms);
        Ok(ran)
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    /// Removes the next task, optionally only if due by `due_limit`. When the
    /// task lies in the future the clock jumps to its deadline.
    pub(crate) fn take_next(&mut self, due_limit: Option<i64>) -> Option<PendingTimer> {
        let idx = self.next_task_index(due_limit)?;
        let task = self.tasks.remove(idx);
        if task.due_at > self.now_ms {
            self.now_ms = task.due_at;
        }
        Some(task)
    }

    /// Runs tasks through `exec` until none are due by `due_limit`, or until
    /// the queue is empty when `due_limit` is `None`. Tasks queued by `exec`
    /// take part in the same run.
    pub(crate) fn run_queue<F>(&mut self, due_limit: Option<i64>, mut exec: F) -> Result<usize>
    where
        F: FnMut(&mut Self, PendingTimer) -> Result<()>,
    {
        let mut steps = 0usize;
        while let Some(next_idx) = self.next_task_index(due_limit) {
            steps += 1;
            if steps > self.step_limit {
                return Err(self.step_limit_error(steps, due_limit, next_idx));
            }
            let task = self.tasks.remove(next_idx);
            if task.due_at > self.now_ms {
                self.now_ms = task.due_at;
            }
            debug!(
                id = task.id.0,
                due_at = task.due_at,
                now_ms = self.now_ms,
                task = ?task.task,
                "timer run"
            );
            exec(self, task)?;
        }
        Ok(steps)
    }

    fn step_limit_error(&self, steps: usize, due_limit: Option<i64>, next_idx: usize) -> Error {
        let due_limit_desc = due_limit
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".into());
        let next_task_desc = self
            .tasks
            .get(next_idx)
            .map(|task| {
                format!(
                    "id={},due_at={},order={},task={:?}",
                    task.id.0, task.due_at, task.order, task.task
                )
            })
            .unwrap_or_else(|| "none".into());
        Error::Timer(format!(
            "timer queue exceeded max steps: limit={}, steps={steps}, now_ms={}, due_limit={due_limit_desc}, pending_tasks={}, next_task={next_task_desc}",
            self.step_limit,
            self.now_ms,
            self.tasks.len(),
        ))
    }
}
