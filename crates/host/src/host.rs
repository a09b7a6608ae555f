use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info};

use dispatchsim_domain::{SimError, SimResult, Task};

use crate::queue::TaskQueue;

/// Stable host identifier, the deterministic tie-break key for dispatch
/// strategies that compare hosts.
pub type HostId = u32;

/// The task currently occupying the execution slot.
///
/// Remaining work is derived from elapsed time instead of being ticked
/// down, so `work_left` snapshots decrease with the clock while the task
/// runs. The value is written back to the task only on preemption or
/// completion.
struct RunningTask {
    task: Arc<Task>,
    started_at: Instant,
    remaining_at_start: Duration,
}

impl RunningTask {
    fn remaining_now(&self) -> Duration {
        self.remaining_at_start
            .saturating_sub(self.started_at.elapsed())
    }
}

struct HostState {
    queue: TaskQueue,
    slot: Option<RunningTask>,
}

impl HostState {
    fn slot_holds(&self, task: &Arc<Task>) -> bool {
        self.slot
            .as_ref()
            .is_some_and(|running| Arc::ptr_eq(&running.task, task))
    }
}

/// A simulated worker host with a single execution slot.
///
/// Tasks are queued by priority and processed one at a time by the
/// execution loop spawned from [`Host::start`]. A newly added task whose
/// priority strictly exceeds that of a preemptible running task preempts
/// it: the running task is moved back into the queue with its remaining
/// work checkpointed, and the loop picks the new head of the queue.
pub struct Host {
    id: HostId,
    state: Mutex<HostState>,
    /// Signals the loop that the queue became non-empty.
    work_available: Notify,
    /// Signals the loop that the slot was vacated by a preemption.
    preempted: Notify,
    running: AtomicBool,
    started: AtomicBool,
}

impl Host {
    pub fn new(id: HostId) -> Self {
        Self {
            id,
            state: Mutex::new(HostState {
                queue: TaskQueue::new(),
                slot: None,
            }),
            work_available: Notify::new(),
            preempted: Notify::new(),
            running: AtomicBool::new(true),
            started: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> HostId {
        self.id
    }

    /// Whether the execution loop is still accepting work.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Enqueues a task, preempting the running one if the newcomer's
    /// priority is strictly higher and the running task is preemptible.
    ///
    /// On preemption the running task keeps the work it already completed:
    /// its remaining work is recomputed from elapsed time, it transitions
    /// back to queued and re-enters the queue behind equal-priority tasks.
    pub fn add_task(&self, task: Arc<Task>) {
        let mut state = self.state();
        let preempting = state.slot.as_ref().is_some_and(|running| {
            running.task.preemptible() && task.priority() > running.task.priority()
        });

        debug!(
            "task {} (priority {}) queued on host {}",
            task.id(),
            task.priority(),
            self.id
        );
        state.queue.push(Arc::clone(&task));

        if preempting {
            if let Some(running) = state.slot.take() {
                let left = running.remaining_now();
                running.task.set_remaining(left);
                running.task.mark_queued();
                info!(
                    "task {} preempted task {} on host {} ({}ms left)",
                    task.id(),
                    running.task.id(),
                    self.id,
                    left.as_millis()
                );
                state.queue.push(running.task);
            }
        }
        drop(state);

        if preempting {
            self.preempted.notify_one();
        }
        self.work_available.notify_one();
    }

    /// Number of tasks on this host: queued ones plus the running one.
    pub fn queue_size(&self) -> usize {
        let state = self.state();
        state.queue.len() + usize::from(state.slot.is_some())
    }

    /// Total remaining work on this host, including the live remainder of
    /// the running task. Strictly decreasing while the slot is occupied
    /// and zero exactly when the host is empty.
    pub fn work_left(&self) -> Duration {
        let state = self.state();
        let running = state
            .slot
            .as_ref()
            .map(RunningTask::remaining_now)
            .unwrap_or(Duration::ZERO);
        state.queue.work_left() + running
    }

    /// Spawns the execution loop. Fails if the host was already started.
    pub fn start(self: &Arc<Self>) -> SimResult<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SimError::host_already_started(self.id));
        }
        let host = Arc::clone(self);
        Ok(tokio::spawn(async move { host.run().await }))
    }

    /// Requests a cooperative stop. Idempotent and non-blocking: the loop
    /// observes the flag between tasks, so an in-flight task completes but
    /// nothing further is started.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("host {} shutdown requested", self.id);
        }
        // Wake the loop in case it is idling on an empty queue.
        self.work_available.notify_one();
    }

    async fn run(&self) {
        info!("host {} execution loop started", self.id);
        loop {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            match self.take_next() {
                Some((task, deadline)) => self.execute(task, deadline).await,
                None => self.work_available.notified().await,
            }
        }
        info!("host {} execution loop stopped", self.id);
    }

    /// Moves the highest-priority queued task into the execution slot and
    /// returns it with its completion deadline.
    fn take_next(&self) -> Option<(Arc<Task>, Instant)> {
        let mut state = self.state();
        let task = state.queue.pop()?;
        let remaining = task.remaining();
        task.mark_running();
        let started_at = Instant::now();
        state.slot = Some(RunningTask {
            task: Arc::clone(&task),
            started_at,
            remaining_at_start: remaining,
        });
        debug!(
            "task {} running on host {} ({}ms left)",
            task.id(),
            self.id,
            remaining.as_millis()
        );
        Some((task, started_at + remaining))
    }

    /// Waits for the slot occupant to either run to completion or get
    /// preempted out of the slot by `add_task`.
    async fn execute(&self, task: Arc<Task>, deadline: Instant) {
        loop {
            tokio::select! {
                _ = time::sleep_until(deadline) => {
                    let mut state = self.state();
                    if state.slot_holds(&task) {
                        state.slot = None;
                        task.finish();
                        drop(state);
                        info!("task {} finished on host {}", task.id(), self.id);
                    }
                    // If the slot no longer holds the task, a preemption
                    // won the race at the deadline and already re-queued it.
                    return;
                }
                _ = self.preempted.notified() => {
                    let state = self.state();
                    if !state.slot_holds(&task) {
                        // Vacated by add_task; the task is back in the queue.
                        return;
                    }
                    // Stale permit from an earlier race; keep waiting.
                }
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().expect("host state lock poisoned")
    }
}
