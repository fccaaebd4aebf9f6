//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` uses tokio for async process execution. Children are
//! killed if the future driving them is dropped.

use std::process::{Output, Stdio};

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::application::ports::CommandRunner;

/// Production `CommandRunner`.
///
/// Commands run to completion; there is no timeout, since copying a large
/// build or pulling an image may legitimately take minutes.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        tracing::debug!(program, ?args, "running command");
        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to spawn {program}"))?;
        log_exit(program, &output);
        Ok(output)
    }

    async fn run_with_stdin(&self, program: &str, args: &[&str], input: &[u8]) -> Result<Output> {
        tracing::debug!(program, ?args, bytes = input.len(), "running command with stdin");
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let stdin_handle = child.stdin.take();
        let input_owned = input.to_vec();
        let stdin_task = tokio::spawn(async move {
            if let Some(mut stdin) = stdin_handle {
                let _ = stdin.write_all(&input_owned).await;
            }
        });

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();
        let (status, stdout, stderr) = tokio::join!(
            child.wait(),
            async {
                let mut buf = Vec::new();
                if let Some(ref mut h) = stdout_handle {
                    let _ = h.read_to_end(&mut buf).await;
                }
                buf
            },
            async {
                let mut buf = Vec::new();
                if let Some(ref mut h) = stderr_handle {
                    let _ = h.read_to_end(&mut buf).await;
                }
                buf
            },
        );
        let _ = stdin_task.await;

        let output = Output {
            status: status.with_context(|| format!("waiting for {program}"))?,
            stdout,
            stderr,
        };
        log_exit(program, &output);
        Ok(output)
    }
}

fn log_exit(program: &str, output: &Output) {
    tracing::debug!(
        program,
        status = ?output.status.code(),
        stdout_bytes = output.stdout.len(),
        stderr = %String::from_utf8_lossy(&output.stderr).trim(),
        "command finished"
    );
}
