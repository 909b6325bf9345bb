// Process runner
//
// Spawns a tool as an isolated child, drains its output, and enforces the
// wall-clock bound. The child is always killed and reaped on timeout or
// shutdown.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::ExecutionError;
use crate::tools::types::CommandSpec;

/// How long to keep reading pipes after the child itself has exited
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitState {
    /// Process exited; code is None when it was killed by a signal
    Exited(Option<i32>),
    TimedOut(Duration),
    LaunchFailed(String),
    Cancelled,
}

/// Captured result of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub stdout: String,
    pub stderr: String,
    pub state: ExitState,
    pub elapsed: Duration,
}

impl ProcessOutcome {
    /// Exit status zero; empty stdout still counts
    pub fn success(&self) -> bool {
        self.state == ExitState::Exited(Some(0))
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.state {
            ExitState::Exited(code) => code,
            _ => None,
        }
    }

    /// Stdout on success, otherwise the diagnostic for the caller
    pub fn into_result(self, program: &str) -> Result<String, ExecutionError> {
        match self.state {
            ExitState::Exited(Some(0)) => Ok(self.stdout),
            ExitState::Exited(code) => {
                let stderr = self.stderr.trim();
                let message = if !stderr.is_empty() {
                    self.stderr
                } else {
                    match code {
                        Some(code) => format!("Process exited with code {}", code),
                        None => "Process terminated by signal".to_string(),
                    }
                };
                Err(ExecutionError::Failed(message))
            }
            ExitState::TimedOut(limit) => Err(ExecutionError::Timeout {
                secs: limit.as_secs_f64().ceil() as u64,
            }),
            ExitState::LaunchFailed(reason) => Err(ExecutionError::Launch {
                program: program.to_string(),
                reason,
            }),
            ExitState::Cancelled => Err(ExecutionError::Cancelled),
        }
    }
}

/// Executes a resolved command
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> ProcessOutcome;
}

/// Runner backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct SubprocessRunner {
    shutdown: CancellationToken,
}

impl SubprocessRunner {
    /// Runner whose in-flight children are killed when `shutdown` fires
    pub fn new(shutdown: CancellationToken) -> Self {
        Self { shutdown }
    }
}

/// Output pipe being read on its own task
struct PipeReader {
    chunks: mpsc::UnboundedReceiver<Vec<u8>>,
    task: JoinHandle<()>,
}

fn drain<R>(pipe: Option<R>) -> PipeReader
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, chunks) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        let Some(mut pipe) = pipe else { return };
        let mut buf = [0u8; 8192];
        loop {
            match pipe.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "Error reading child output");
                    break;
                }
            }
        }
    });

    PipeReader { chunks, task }
}

/// Everything read before EOF or `deadline`, whichever comes first
async fn collect(mut reader: PipeReader, deadline: tokio::time::Instant) -> String {
    let mut buffer = Vec::new();
    loop {
        match tokio::time::timeout_at(deadline, reader.chunks.recv()).await {
            Ok(Some(chunk)) => buffer.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(_) => {
                // Grandchildren may still hold the pipe open
                debug!(bytes = buffer.len(), "Pipe still open after exit, keeping output read so far");
                break;
            }
        }
    }
    reader.task.abort();
    String::from_utf8_lossy(&buffer).into_owned()
}

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    async fn run(&self, command: &CommandSpec) -> ProcessOutcome {
        let start = Instant::now();

        let Some((program, args)) = command.argv.split_first() else {
            return ProcessOutcome {
                stdout: String::new(),
                stderr: String::new(),
                state: ExitState::LaunchFailed("empty command".to_string()),
                elapsed: start.elapsed(),
            };
        };

        info!(cwd = %command.cwd.display(), "Running command: {}", command.display());

        let mut process = Command::new(program);
        process
            .args(args)
            .current_dir(&command.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match process.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %program, error = %e, "Failed to spawn tool");
                return ProcessOutcome {
                    stdout: String::new(),
                    stderr: String::new(),
                    state: ExitState::LaunchFailed(e.to_string()),
                    elapsed: start.elapsed(),
                };
            }
        };

        let stdout_task = drain(child.stdout.take());
        let stderr_task = drain(child.stderr.take());

        let state = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => ExitState::Exited(status.code()),
                Err(e) => ExitState::LaunchFailed(e.to_string()),
            },
            _ = tokio::time::sleep(command.timeout) => ExitState::TimedOut(command.timeout),
            _ = self.shutdown.cancelled() => ExitState::Cancelled,
        };

        let (stdout, stderr) = match state {
            ExitState::Exited(_) | ExitState::LaunchFailed(_) => {
                let deadline = tokio::time::Instant::now() + DRAIN_GRACE;
                tokio::join!(collect(stdout_task, deadline), collect(stderr_task, deadline))
            }
            _ => {
                // kill() also waits, so the child is reaped here
                if let Err(e) = child.kill().await {
                    warn!(program = %program, error = %e, "Failed to kill tool process");
                }
                stdout_task.task.abort();
                stderr_task.task.abort();
                (String::new(), String::new())
            }
        };

        let elapsed = start.elapsed();
        debug!(
            program = %program,
            state = ?state,
            elapsed_ms = elapsed.as_millis() as u64,
            "Command finished"
        );

        ProcessOutcome {
            stdout,
            stderr,
            state,
            elapsed,
        }
    }
}
