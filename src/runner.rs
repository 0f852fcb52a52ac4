use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("exit status {0}")]
    Exit(i32),
    #[error("terminated by signal")]
    Signaled,
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("cancelled")]
    Cancelled,
}

/// Output of one external process run. `output` holds whatever the process
/// wrote to stdout and stderr, even when `failure` is set.
#[derive(Debug, Default)]
pub struct Invocation {
    pub output: String,
    pub failure: Option<RunError>,
}

impl Invocation {
    pub fn ok(output: impl Into<String>) -> Self {
        Invocation {
            output: output.into(),
            failure: None,
        }
    }

    pub fn failed(output: impl Into<String>, failure: RunError) -> Self {
        Invocation {
            output: output.into(),
            failure: Some(failure),
        }
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, binary: &Path, args: &[String], cancel: &CancellationToken) -> Invocation;
}

/// Runs a binary directly (no shell) with a hard deadline.
pub struct KubectlRunner {
    timeout: Duration,
}

impl KubectlRunner {
    pub fn new(timeout: Duration) -> Self {
        KubectlRunner { timeout }
    }
}

#[async_trait]
impl ProcessRunner for KubectlRunner {
    async fn run(&self, binary: &Path, args: &[String], cancel: &CancellationToken) -> Invocation {
        debug!("Running {} {:?}", binary.display(), args);

        let child = Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(source) => {
                return Invocation::failed(
                    String::new(),
                    RunError::Spawn {
                        binary: binary.display().to_string(),
                        source,
                    },
                );
            }
        };

        // Output lands in these buffers as it is read, so whatever arrived
        // before a timeout or cancellation is still reported.
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let outcome = {
            let finished = async {
                let (status, _, _) = tokio::join!(
                    child.wait(),
                    drain(stdout_pipe.as_mut(), &mut stdout),
                    drain(stderr_pipe.as_mut(), &mut stderr),
                );
                status
            };
            tokio::select! {
                status = finished => Ok(status),
                _ = tokio::time::sleep(self.timeout) => Err(RunError::TimedOut(self.timeout)),
                _ = cancel.cancelled() => Err(RunError::Cancelled),
            }
        };

        let mut text = String::from_utf8_lossy(&stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&stderr));

        let status = match outcome {
            Ok(Ok(status)) => status,
            Ok(Err(source)) => {
                return Invocation::failed(
                    text,
                    RunError::Spawn {
                        binary: binary.display().to_string(),
                        source,
                    },
                );
            }
            Err(failure) => {
                if let Err(e) = child.start_kill() {
                    debug!("Failed to kill {}: {}", binary.display(), e);
                }
                return Invocation::failed(text, failure);
            }
        };

        if status.success() {
            Invocation::ok(text)
        } else {
            let failure = match status.code() {
                Some(code) => RunError::Exit(code),
                None => RunError::Signaled,
            };
            Invocation::failed(text, failure)
        }
    }
}

/// Appends everything readable from `pipe` to `buf`. Reads are chunked so a
/// dropped future leaves every completed read in `buf`.
async fn drain<R: AsyncRead + Unpin>(pipe: Option<&mut R>, buf: &mut Vec<u8>) {
    let Some(pipe) = pipe else {
        return;
    };
    let mut chunk = [0u8; 4096];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) => {
                debug!("Stopped reading process output: {}", e);
                break;
            }
        }
    }
}
