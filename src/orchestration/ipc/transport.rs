//! Newline-delimited JSON framing over a worker child process's stdio.
//!
//! Grounded on `runtime::channel`'s `Tx`/`Rx` wrappers: a background task
//! owns the child's stdout and forwards decoded envelopes into an
//! unbounded channel, so `WorkerTransport::recv` is a plain `await` rather
//! than hand-rolled buffered-reader polling at every call site.

use std::process::Stdio;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};

use crate::runtime::channel::{self, Rx, Tx};

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("failed to spawn worker process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("write to worker stdin failed: {0}")]
    Write(#[source] std::io::Error),
    #[error("worker stdin is closed")]
    StdinClosed,
    #[error("worker produced a line that does not match the envelope schema: {0}")]
    MalformedEnvelope(String),
    #[error("failed to encode outgoing envelope: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Generic envelope wrapper kept for symmetry with spec.md §4.1's `{ type, payload }`
/// framing description; `MasterCommand`/`WorkerMessage` already carry that
/// shape via `#[serde(tag = "type", content = "payload")]`, so this alias
/// documents the wire contract without introducing a second representation.
pub type Envelope<T> = T;

/// Owns a spawned worker child process and the framed stdio channels to it.
pub struct WorkerTransport {
    child: Child,
    stdin: ChildStdin,
    incoming: Rx<String>,
}

impl WorkerTransport {
    /// Spawns `program` with `args`, piping stdio, and starts the
    /// background line-reader task over stdout.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self, IpcError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(IpcError::Spawn)?;

        let stdin = child.stdin.take().ok_or(IpcError::StdinClosed)?;
        let stdout = child.stdout.take().ok_or(IpcError::StdinClosed)?;

        let (tx, rx): (Tx<String>, Rx<String>) = channel::unbounded();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self { child, stdin, incoming: rx })
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Serializes `message` and writes it as one newline-terminated JSON line.
    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<(), IpcError> {
        let mut line = serde_json::to_string(message).map_err(IpcError::Encode)?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await.map_err(IpcError::Write)?;
        self.stdin.flush().await.map_err(IpcError::Write)
    }

    /// Awaits the next decoded line. A line that fails to parse against `T`
    /// is dropped with a logged warning, not surfaced as a crash — per
    /// spec.md §4.1, a malformed envelope is not treated as a worker crash.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Option<Result<T, IpcError>> {
        loop {
            let line = self.incoming.recv().await?;
            match serde_json::from_str::<T>(&line) {
                Ok(value) => return Some(Ok(value)),
                Err(err) => {
                    tracing::warn!(line = %line, error = %err, "dropping malformed worker envelope");
                    return Some(Err(IpcError::MalformedEnvelope(err.to_string())));
                }
            }
        }
    }

    /// Waits for the child to exit (e.g. after `Shutdown` + grace window),
    /// returning its exit status.
    pub async fn wait(&mut self) -> Result<std::process::ExitStatus, std::io::Error> {
        self.child.wait().await
    }

    /// Forcefully kills the child process.
    pub async fn kill(&mut self) -> Result<(), std::io::Error> {
        self.child.kill().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_cat_echoes_one_line() {
        // `cat` is a reasonable stand-in for a worker that echoes what it's sent.
        let mut transport = WorkerTransport::spawn("cat", &[]).expect("spawn cat");
        transport.send(&serde_json::json!({"hello": "world"})).await.expect("send");
        let reply: serde_json::Value = transport.recv().await.expect("some line").expect("valid json");
        assert_eq!(reply, serde_json::json!({"hello": "world"}));
        let _ = transport.kill().await;
    }
}
