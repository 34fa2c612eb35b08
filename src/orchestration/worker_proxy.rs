//! Per-worker master-side state machine and RAII process handle (spec.md §4.10).
//!
//! Grounded on the teacher's pooled-resource guard idiom (acquire, use, drop
//! returns the slot to idle) applied to a worker subprocess instead of a
//! browser handle, and on the teacher's `FailureKind`-driven result routing:
//! a crashed worker's in-flight task is reported as failed with
//! `ErrorKind::WorkerCrash` rather than silently dropped.

use std::time::Duration;

use crate::orchestration::error::{ErrorKind, WireError};
use crate::orchestration::event_bus::{EventBus, OrchestratorEvent};
use crate::orchestration::ipc::{MasterCommand, TaskType, WorkerMessage, WorkerTransport};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Initializing,
    Idle,
    Busy,
    Crashed,
}

#[derive(Debug)]
pub struct InFlightTask {
    pub task_id: String,
    pub task_type: TaskType,
}

/// One worker's master-side view: its transport, state, and current task.
pub struct WorkerProxy {
    pub worker_id: u32,
    pub pid: Option<u32>,
    state: WorkerState,
    transport: WorkerTransport,
    current_task: Option<InFlightTask>,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerProxyError {
    #[error("worker {0} is crashed")]
    Crashed(u32),
    #[error("worker {0} is busy")]
    Busy(u32),
    #[error(transparent)]
    Ipc(#[from] crate::orchestration::ipc::IpcError),
}

impl WorkerProxy {
    #[must_use]
    pub fn new(worker_id: u32, transport: WorkerTransport) -> Self {
        Self { worker_id, pid: None, state: WorkerState::Initializing, transport, current_task: None }
    }

    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Called once the worker's `READY` envelope arrives: records `pid`,
    /// transitions `Initializing -> Idle`, emits `WORKER:READY`.
    pub fn on_ready(&mut self, pid: u32, bus: &EventBus) {
        self.pid = Some(pid);
        self.state = WorkerState::Idle;
        bus.emit(&OrchestratorEvent::WorkerReady { worker_id: self.worker_id, pid });
    }

    /// Dispatches a task-bearing command (`DISCOVER`/`DOWNLOAD`), transitioning
    /// to `Busy` until the matching `RESULT` arrives. Rejected (without
    /// touching IPC) if the worker is `Crashed` or `Busy`.
    pub async fn send_command(
        &mut self,
        task_id: String,
        task_type: TaskType,
        command: &MasterCommand,
    ) -> Result<(), WorkerProxyError> {
        match self.state {
            WorkerState::Crashed => return Err(WorkerProxyError::Crashed(self.worker_id)),
            WorkerState::Busy => return Err(WorkerProxyError::Busy(self.worker_id)),
            WorkerState::Initializing | WorkerState::Idle => {}
        }
        self.transport.send(command).await?;
        self.current_task = Some(InFlightTask { task_id, task_type });
        self.state = WorkerState::Busy;
        Ok(())
    }

    /// Sends a control command (`INIT`/`SET_COOKIES`) that has no matching
    /// `RESULT` and does not move the worker out of `Idle`.
    pub async fn send_control(&mut self, command: &MasterCommand) -> Result<(), WorkerProxyError> {
        match self.state {
            WorkerState::Crashed => return Err(WorkerProxyError::Crashed(self.worker_id)),
            WorkerState::Busy => return Err(WorkerProxyError::Busy(self.worker_id)),
            WorkerState::Initializing | WorkerState::Idle => {}
        }
        self.transport.send(command).await?;
        Ok(())
    }

    /// Awaits the next `WorkerMessage`, routing `RESULT` into
    /// `TASK:COMPLETE`/`TASK:FAILED` and transitioning back to `Idle`; a
    /// closed transport (process exit) is reported as a crash.
    pub async fn poll(&mut self, bus: &EventBus) -> Option<WorkerOutcome> {
        match self.transport.recv::<WorkerMessage>().await {
            None => Some(self.crash(bus, "worker transport closed")),
            Some(Err(_)) => None, // malformed envelope: logged and dropped, not a crash.
            Some(Ok(WorkerMessage::Ready { pid })) => {
                self.on_ready(pid, bus);
                None
            }
            Some(Ok(WorkerMessage::Result { task_type: _, data, error })) => {
                Some(self.complete_task(bus, data, error))
            }
        }
    }

    fn complete_task(
        &mut self,
        bus: &EventBus,
        data: Option<crate::orchestration::ipc::ResultData>,
        error: Option<WireError>,
    ) -> WorkerOutcome {
        let task = self.current_task.take();
        self.state = WorkerState::Idle;
        bus.emit(&OrchestratorEvent::WorkerIdle { worker_id: self.worker_id });

        let task_id = task.map(|t| t.task_id).unwrap_or_default();
        let page_id = match &data {
            Some(crate::orchestration::ipc::ResultData::Discovery(d)) => Some(d.page_id.clone()),
            Some(crate::orchestration::ipc::ResultData::Download(d)) => Some(d.page_id.clone()),
            None => None,
        };
        match error {
            Some(err) => {
                bus.emit(&OrchestratorEvent::TaskFailed {
                    task_id: task_id.clone(),
                    page_id,
                    kind: err.kind,
                    message: err.message.clone(),
                });
                WorkerOutcome::Failed { task_id, error: err }
            }
            None => {
                bus.emit(&OrchestratorEvent::TaskComplete {
                    task_id: task_id.clone(),
                    page_id: page_id.unwrap_or_else(|| crate::orchestration::context::PageId::new("")),
                });
                WorkerOutcome::Completed { task_id, data }
            }
        }
    }

    fn crash(&mut self, bus: &EventBus, message: &str) -> WorkerOutcome {
        self.state = WorkerState::Crashed;
        bus.emit(&OrchestratorEvent::WorkerCrashed { worker_id: self.worker_id });
        let task_id = self.current_task.take().map(|t| t.task_id).unwrap_or_default();
        WorkerOutcome::Failed {
            task_id,
            error: WireError { message: message.to_string(), kind: ErrorKind::WorkerCrash, stack_trace: None },
        }
    }

    /// Sends `SHUTDOWN`, waits `SHUTDOWN_GRACE`, then force-kills regardless.
    pub async fn terminate(&mut self) {
        if self.state != WorkerState::Crashed {
            let _ = self.transport.send(&MasterCommand::Shutdown).await;
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, self.transport.wait()).await;
        }
        let _ = self.transport.kill().await;
        self.state = WorkerState::Crashed;
    }
}

#[derive(Debug)]
pub enum WorkerOutcome {
    Completed { task_id: String, data: Option<crate::orchestration::ipc::ResultData> },
    Failed { task_id: String, error: WireError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn command_rejected_while_busy() {
        let transport = WorkerTransport::spawn("cat", &[]).expect("spawn cat");
        let mut proxy = WorkerProxy::new(1, transport);
        proxy.on_ready(123, &EventBus::new());
        let bus = EventBus::new();
        proxy
            .send_command("t1".into(), TaskType::Discover, &MasterCommand::Shutdown)
            .await
            .expect("first command accepted");
        let second = proxy.send_command("t2".into(), TaskType::Discover, &MasterCommand::Shutdown).await;
        assert!(matches!(second, Err(WorkerProxyError::Busy(1))));
        let _ = bus;
        proxy.terminate().await;
    }

    #[tokio::test]
    async fn ready_transitions_to_idle_and_records_pid() {
        let transport = WorkerTransport::spawn("cat", &[]).expect("spawn cat");
        let mut proxy = WorkerProxy::new(7, transport);
        let bus = EventBus::new();
        proxy.on_ready(999, &bus);
        assert_eq!(proxy.state(), WorkerState::Idle);
        assert_eq!(proxy.pid, Some(999));
        proxy.terminate().await;
    }
}
