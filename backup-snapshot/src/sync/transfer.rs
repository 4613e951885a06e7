//! Running sync commands.
//!
//! The orchestrator only sees the [`Transferer`] capability, so tests can
//! swap the real process for a fake.

use super::command::SyncCommand;
use crate::utils::{Result, SnapshotError};
use std::collections::VecDeque;
use std::future::Future;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// How many trailing stderr lines are kept for the failure report.
const STDERR_TAIL_LINES: usize = 20;

/// Result of a finished sync process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Exit code, `None` if the process was killed by a signal
    pub code: Option<i32>,

    /// Last lines the tool wrote to stderr
    pub stderr_tail: Vec<String>,
}

impl TransferOutcome {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            stderr_tail: Vec::new(),
        }
    }

    pub fn failure(code: i32) -> Self {
        Self {
            code: Some(code),
            stderr_tail: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes a sync command to completion.
///
/// `Err` means the command could not be run at all; a command that ran
/// and failed is an `Ok` outcome with a non-zero code.
pub trait Transferer {
    fn execute(&self, command: &SyncCommand) -> impl Future<Output = Result<TransferOutcome>> + Send;
}

/// Runs the sync tool as a child process and streams its output into the
/// log. There is no timeout; a hung transfer hangs the run.
#[derive(Debug, Clone, Default)]
pub struct ProcessTransferer;

impl Transferer for ProcessTransferer {
    async fn execute(&self, command: &SyncCommand) -> Result<TransferOutcome> {
        let program = command.program.to_string_lossy().into_owned();

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SnapshotError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdout_task = async {
            if let Some(stdout) = stdout {
                forward_lines(stdout, |line| debug!(target: "sync", "{}", line), 0).await;
            }
        };
        let stderr_task = async {
            match stderr {
                Some(stderr) => {
                    forward_lines(stderr, |line| warn!(target: "sync", "{}", line), STDERR_TAIL_LINES).await
                }
                None => Vec::new(),
            }
        };

        let (_, stderr_tail, status) = tokio::join!(stdout_task, stderr_task, child.wait());
        let status = status?;

        Ok(TransferOutcome {
            code: status.code(),
            stderr_tail,
        })
    }
}

/// Log every line of `reader`, returning the last `keep` lines.
///
/// Lines are read as bytes; file names in the tool's output need not be
/// UTF-8. The pipe is drained to EOF even after a read error so the tool
/// never writes into a closed pipe.
async fn forward_lines<R, F>(reader: R, log: F, keep: usize) -> Vec<String>
where
    R: AsyncRead + Unpin,
    F: Fn(&str),
{
    let mut tail = VecDeque::with_capacity(keep);
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                log(line);
                if keep > 0 {
                    if tail.len() == keep {
                        tail.pop_front();
                    }
                    tail.push_back(line.to_string());
                }
            }
            Err(e) => {
                warn!("Failed to read sync output: {}", e);
                if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    warn!("Failed to drain sync output: {}", e);
                }
                break;
            }
        }
    }

    tail.into()
}
