// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! In-process scheduler for periodic refresh jobs.
//!
//! A single tick thread polls a min-heap keyed on absolute run time and
//! fires each due task on its own thread. Nothing is persisted and a task
//! that panics is simply lost.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);
pub type TaskFn = Arc<dyn Fn() + Send + Sync>;
#[derive(Clone)]
pub struct ScheduledTask {
    pub id: Uuid,
    pub name: String,
    pub interval: Option<Duration>,
    run: TaskFn,
}
impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("interval", &self.interval)
            .finish()
    }
}
struct QueueEntry {
    run_at: Instant,
    seq: u64,
    task: ScheduledTask,
}
impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.run_at == other.run_at && self.seq == other.seq
    }
}
impl Eq for QueueEntry {}
impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.run_at
            .cmp(&other.run_at)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}
type TaskQueue = BinaryHeap<Reverse<QueueEntry>>;
struct Shared {
    queue: Mutex<TaskQueue>,
    ticking: AtomicBool,
    generation: AtomicU64,
    next_seq: AtomicU64,
}
impl Shared {
    fn queue(&self) -> MutexGuard<'_, TaskQueue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
    fn push(&self, queue: &mut TaskQueue, run_at: Instant, task: ScheduledTask) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        queue.push(Reverse(QueueEntry { run_at, seq, task }));
    }
}
pub struct TaskManager {
    shared: Arc<Shared>,
    tick: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}
impl TaskManager {
    pub fn new(tick: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(BinaryHeap::new()),
                ticking: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                next_seq: AtomicU64::new(0),
            }),
            tick: tick.max(Duration::from_millis(1)),
            handle: Mutex::new(None),
        }
    }
    /// Queues `run` to fire after `delay`, then every `interval` if given.
    /// Intervals shorter than one tick are raised to the tick. Restarts the
    /// tick thread when it had stopped.
    pub fn add_task<F>(&self, name: &str, delay: Duration, interval: Option<Duration>, run: F) -> Uuid
    where
        F: Fn() + Send + Sync + 'static,
    {
        let interval = interval.map(|every| {
            if every < self.tick {
                warn!(
                    task = %name,
                    interval_ms = every.as_millis() as u64,
                    tick_ms = self.tick.as_millis() as u64,
                    "Interval shorter than tick, clamping"
                );
            }
            every.max(self.tick)
        });
        let task = ScheduledTask {
            id: Uuid::new_v4(),
            name: name.to_string(),
            interval,
            run: Arc::new(run),
        };
        let id = task.id;
        let mut queue = self.shared.queue();
        self.shared.push(&mut queue, Instant::now() + delay, task);
        debug!(task = %name, id = %id, delay_ms = delay.as_millis() as u64, periodic = interval.is_some(), "Task queued");
        if !self.shared.ticking.swap(true, Ordering::SeqCst) {
            drop(queue);
            self.start_ticking();
        }
        id
    }
    pub fn cancel(&self, id: Uuid) -> bool {
        let mut queue = self.shared.queue();
        let before = queue.len();
        queue.retain(|Reverse(entry)| entry.task.id != id);
        before != queue.len()
    }
    pub fn pending(&self) -> usize {
        self.shared.queue().len()
    }
    pub fn tick(&self) -> Duration {
        self.tick
    }
    pub fn is_ticking(&self) -> bool {
        self.shared.ticking.load(Ordering::SeqCst)
    }
    /// Halts ticking and waits for the tick thread. Queued tasks are kept.
    pub fn stop(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.ticking.store(false, Ordering::SeqCst);
        self.join_previous();
        info!(pending = self.pending(), "Task manager stopped");
    }
    fn join_previous(&self) {
        let previous = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = previous {
            if handle.join().is_err() {
                warn!("Tick thread panicked");
            }
        }
    }
    fn start_ticking(&self) {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.join_previous();
        let shared = Arc::clone(&self.shared);
        let tick = self.tick;
        let spawned = thread::Builder::new()
            .name("charta-tick".to_string())
            .spawn(move || tick_loop(shared, tick, generation));
        match spawned {
            Ok(handle) => {
                *self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
            }
            Err(e) => {
                self.shared.ticking.store(false, Ordering::SeqCst);
                warn!(error = %e, "Failed to start tick thread");
            }
        }
    }
}
impl Default for TaskManager {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}
impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.ticking.store(false, Ordering::SeqCst);
        self.join_previous();
    }
}
fn fire(task: &ScheduledTask) {
    let run = Arc::clone(&task.run);
    let spawned = thread::Builder::new()
        .name(format!("charta-task-{}", task.name))
        .spawn(move || run());
    if let Err(e) = spawned {
        warn!(task = %task.name, error = %e, "Failed to spawn task thread");
    }
}
fn take_due(shared: &Shared, now: Instant, generation: u64) -> Option<Vec<ScheduledTask>> {
    let mut queue = shared.queue();
    if shared.generation.load(Ordering::SeqCst) != generation {
        return None;
    }
    if queue.is_empty() {
        // cleared under the lock so add_task cannot miss a stopped ticker
        shared.ticking.store(false, Ordering::SeqCst);
        return None;
    }
    let mut due = Vec::new();
    while queue.peek().is_some_and(|Reverse(entry)| entry.run_at <= now) {
        let Some(Reverse(entry)) = queue.pop() else {
            break;
        };
        if let Some(interval) = entry.task.interval {
            // a late task skips missed runs so each task pops at most once per tick
            let next = entry.run_at + interval;
            let next = if next <= now { now + interval } else { next };
            shared.push(&mut queue, next, entry.task.clone());
        }
        due.push(entry.task);
    }
    Some(due)
}
fn tick_loop(shared: Arc<Shared>, tick: Duration, generation: u64) {
    debug!(tick_ms = tick.as_millis() as u64, generation, "Tick thread started");
    while shared.ticking.load(Ordering::SeqCst) {
        let Some(due) = take_due(&shared, Instant::now(), generation) else {
            debug!(generation, "Tick thread exiting");
            return;
        };
        for task in &due {
            debug!(task = %task.name, id = %task.id, "Firing task");
            fire(task);
        }
        thread::sleep(tick);
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn earlier_run_at_pops_first() {
        let task = |name: &str| ScheduledTask {
            id: Uuid::new_v4(),
            name: name.to_string(),
            interval: None,
            run: Arc::new(|| {}),
        };
        let now = Instant::now();
        let mut heap = BinaryHeap::new();
        heap.push(Reverse(QueueEntry { run_at: now + Duration::from_secs(5), seq: 0, task: task("late") }));
        heap.push(Reverse(QueueEntry { run_at: now, seq: 2, task: task("second") }));
        heap.push(Reverse(QueueEntry { run_at: now, seq: 1, task: task("first") }));
        let order: Vec<String> = std::iter::from_fn(|| heap.pop().map(|Reverse(e)| e.task.name)).collect();
        assert_eq!(order, vec!["first", "second", "late"]);
    }

    #[test]
    fn cancel_removes_pending_task() {
        let manager = TaskManager::new(Duration::from_millis(5));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = manager.add_task("later", Duration::from_secs(60), None, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(manager.pending(), 1);
        assert!(manager.cancel(id));
        assert!(!manager.cancel(id));
        manager.stop();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn late_periodic_task_is_popped_once_per_tick() {
        let shared = Shared {
            queue: Mutex::new(BinaryHeap::new()),
            ticking: AtomicBool::new(true),
            generation: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
        };
        let task = ScheduledTask {
            id: Uuid::new_v4(),
            name: "behind".to_string(),
            interval: Some(Duration::from_millis(10)),
            run: Arc::new(|| {}),
        };
        let now = Instant::now();
        {
            let mut queue = shared.queue();
            shared.push(&mut queue, now.checked_sub(Duration::from_secs(5)).unwrap_or(now), task);
        }
        let due = take_due(&shared, now, 0).unwrap();
        assert_eq!(due.len(), 1);
        let queue = shared.queue();
        assert_eq!(queue.len(), 1);
        assert!(queue.peek().unwrap().0.run_at > now);
    }
}
