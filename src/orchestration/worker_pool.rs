//! Worker Pool Manager: owns the worker map and the idle LIFO stack
//! (spec.md §4.11).
//!
//! LIFO (not FIFO) idle selection maximizes cache reuse in a worker's
//! embedded browser — the most recently idled worker is the most likely to
//! still have a warm page/profile cache, so it is preferred for the next
//! dispatch.

use std::time::Duration;

use crate::orchestration::error::OrchestratorError;
use crate::orchestration::event_bus::{EventBus, OrchestratorEvent};
use crate::orchestration::ipc::{MasterCommand, TaskType, WorkerTransport};
use crate::orchestration::worker_proxy::{WorkerOutcome, WorkerProxy, WorkerState};

const MIN_WORKERS: u32 = 1;
const MAX_WORKERS: u32 = 8;
const DEFAULT_ALLOCATION_TIMEOUT: Duration = Duration::from_secs(60);

/// `workerCount = clamp(min, max, min(cpus - 1, floor(0.7 * freeMemMB / 1024)))`.
#[must_use]
pub fn plan_capacity(cpu_count: u32, free_mem_mb: u64) -> u32 {
    let cpu_bound = cpu_count.saturating_sub(1);
    let mem_bound = ((0.7 * free_mem_mb as f64) / 1024.0).floor() as u32;
    cpu_bound.min(mem_bound).clamp(MIN_WORKERS, MAX_WORKERS)
}

pub struct WorkerPool {
    workers: std::collections::HashMap<u32, WorkerProxy>,
    idle: Vec<u32>,
    next_worker_id: u32,
    allocation_timeout: Duration,
}

impl WorkerPool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: std::collections::HashMap::new(),
            idle: Vec::new(),
            next_worker_id: 0,
            allocation_timeout: DEFAULT_ALLOCATION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_allocation_timeout(mut self, timeout: Duration) -> Self {
        self.allocation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn next_worker_id(&mut self) -> u32 {
        let id = self.next_worker_id;
        self.next_worker_id += 1;
        id
    }

    pub fn insert(&mut self, proxy: WorkerProxy) {
        self.workers.insert(proxy.worker_id, proxy);
    }

    #[must_use]
    pub fn workers_mut(&mut self) -> &mut std::collections::HashMap<u32, WorkerProxy> {
        &mut self.workers
    }

    /// Spawns one worker process next to the current executable, waits for
    /// its `READY` envelope within `spawn_timeout`, then registers it as idle.
    pub async fn spawn_worker(
        &mut self,
        worker_binary: &std::path::Path,
        spawn_timeout: Duration,
        bus: &EventBus,
    ) -> Result<u32, OrchestratorError> {
        let transport = WorkerTransport::spawn(&worker_binary.to_string_lossy(), &[])
            .map_err(|e| OrchestratorError::InvariantViolation(format!("failed to spawn worker: {e}")))?;

        let worker_id = self.next_worker_id();
        let mut proxy = WorkerProxy::new(worker_id, transport);

        match tokio::time::timeout(spawn_timeout, proxy.poll(bus)).await {
            Ok(_) if proxy.state() == WorkerState::Idle => {}
            Ok(_) => {
                return Err(OrchestratorError::InvariantViolation(format!(
                    "worker {worker_id} did not send READY"
                )));
            }
            Err(_) => {
                return Err(OrchestratorError::InvariantViolation(format!(
                    "worker {worker_id} spawn timed out after {}s",
                    spawn_timeout.as_secs()
                )));
            }
        }

        self.mark_idle(worker_id);
        self.insert(proxy);
        Ok(worker_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Called on `WORKER:READY`/`WORKER:IDLE`: (re)pushes `worker_id` onto
    /// the idle stack.
    pub fn mark_idle(&mut self, worker_id: u32) {
        if !self.idle.contains(&worker_id) {
            self.idle.push(worker_id);
        }
    }

    /// Called on `WORKER:CRASHED`: removes `worker_id` from both the
    /// workers map and the idle stack.
    pub fn remove_crashed(&mut self, worker_id: u32, bus: &EventBus) {
        self.workers.remove(&worker_id);
        self.idle.retain(|id| *id != worker_id);
        tracing::warn!(worker_id, "worker crashed, pool shrinking by one");
        let _ = bus;
    }

    /// Blocks (cooperatively) until an idle worker exists, then pops and
    /// dispatches. Raises `AllocationTimeout` (fatal) if none becomes
    /// available within `allocation_timeout`.
    pub async fn execute(
        &mut self,
        task_id: String,
        task_type: TaskType,
        command: &MasterCommand,
        bus: &EventBus,
    ) -> Result<u32, OrchestratorError> {
        let deadline = tokio::time::Instant::now() + self.allocation_timeout;
        loop {
            if let Some(worker_id) = self.idle.pop() {
                bus.emit(&OrchestratorEvent::TaskStarted { worker_id, task_id: task_id.clone() });
                bus.emit(&OrchestratorEvent::WorkerBusy { worker_id });
                let proxy = self
                    .workers
                    .get_mut(&worker_id)
                    .ok_or_else(|| OrchestratorError::InvariantViolation(format!("idle worker {worker_id} missing from pool")))?;
                proxy.send_command(task_id, task_type, command).await.map_err(|e| {
                    OrchestratorError::InvariantViolation(format!("dispatch to worker {worker_id} failed: {e}"))
                })?;
                return Ok(worker_id);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(OrchestratorError::AllocationTimeout(self.allocation_timeout.as_secs()));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Polls every non-crashed worker once for a pending `RESULT`/`READY`,
    /// feeding idle transitions back into the LIFO stack.
    pub async fn poll_all(&mut self, bus: &EventBus) -> Vec<WorkerOutcome> {
        let mut outcomes = Vec::new();
        let ids: Vec<u32> = self.workers.keys().copied().collect();
        for id in ids {
            let Some(proxy) = self.workers.get_mut(&id) else { continue };
            if proxy.state() == WorkerState::Crashed {
                continue;
            }
            if let Some(outcome) = proxy.poll(bus).await {
                if proxy.state() == WorkerState::Idle {
                    self.mark_idle(id);
                } else if proxy.state() == WorkerState::Crashed {
                    self.remove_crashed(id, bus);
                }
                outcomes.push(outcome);
            } else if proxy.state() == WorkerState::Idle {
                self.mark_idle(id);
            }
        }
        outcomes
    }

    /// Cooperative shutdown of every worker, then force-kill stragglers.
    pub async fn shutdown_all(&mut self) {
        for proxy in self.workers.values_mut() {
            proxy.terminate().await;
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_clamps_to_min_one() {
        assert_eq!(plan_capacity(1, 512), MIN_WORKERS);
    }

    #[test]
    fn capacity_clamps_to_max_eight() {
        assert_eq!(plan_capacity(64, 1_000_000), MAX_WORKERS);
    }

    #[test]
    fn capacity_is_memory_bound_when_memory_is_scarce() {
        // cpu_bound = 15, mem_bound = floor(0.7 * 2048 / 1024) = 1
        assert_eq!(plan_capacity(16, 2048), 1);
    }

    #[test]
    fn capacity_is_cpu_bound_when_memory_is_plentiful() {
        // cpu_bound = 3, mem_bound = floor(0.7 * 65536 / 1024) = 44, clamped to 8
        assert_eq!(plan_capacity(4, 65536), 3);
    }

    #[test]
    fn idle_stack_is_lifo() {
        let mut pool = WorkerPool::new();
        pool.mark_idle(1);
        pool.mark_idle(2);
        pool.mark_idle(3);
        assert_eq!(pool.idle.pop(), Some(3));
        assert_eq!(pool.idle.pop(), Some(2));
    }

    #[test]
    fn crash_removes_from_idle_stack() {
        let mut pool = WorkerPool::new();
        pool.mark_idle(1);
        pool.mark_idle(2);
        let bus = EventBus::new();
        pool.remove_crashed(1, &bus);
        assert_eq!(pool.idle, vec![2]);
    }
}
