use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::info;

/// Environment handed to the child process. The child sees exactly this map
/// and nothing from the orchestrator's own environment.
pub type EnvMap = BTreeMap<String, String>;

#[derive(Debug)]
pub struct ScriptOutput {
    pub exit_code: i32,
    pub lines: Vec<String>,
}

impl ScriptOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a script to completion, streaming its output to the log as it
/// arrives.
///
/// Stdout and stderr are drained concurrently with the exit wait so a full
/// pipe buffer can never deadlock the child; their relative interleaving in
/// the log is not guaranteed. There is deliberately no timeout: a hung init
/// script blocks the pipeline.
///
/// # Errors
///
/// Returns an error when the child cannot be spawned or its output streams
/// cannot be read. A non-zero exit is not an error here; callers decide what
/// the exit code means.
pub async fn run_script(
    interpreter: &str,
    script_path: &Path,
    envs: &EnvMap,
) -> Result<ScriptOutput> {
    let mut child = Command::new(interpreter)
        .arg("-c")
        .arg(script_path)
        .env_clear()
        .envs(envs)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn {interpreter} {}", script_path.display()))?;

    let stdout_handle = tokio::spawn(drain_lines(child.stdout.take(), "stdout"));
    let stderr_handle = tokio::spawn(drain_lines(child.stderr.take(), "stderr"));

    let status = child.wait().await.context("Failed to wait for script")?;
    let mut lines = stdout_handle
        .await
        .context("Script stdout task failed")??;
    let stderr_lines = stderr_handle
        .await
        .context("Script stderr task failed")??;
    lines.extend(stderr_lines);

    let exit_code = status.code().unwrap_or(-1);
    Ok(ScriptOutput { exit_code, lines })
}

async fn drain_lines<R>(stream: Option<R>, label: &'static str) -> Result<Vec<String>>
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return Ok(Vec::new());
    };

    let mut reader = BufReader::new(stream).lines();
    let mut collected = Vec::new();
    while let Some(line) = reader
        .next_line()
        .await
        .with_context(|| format!("Failed to read script {label}"))?
    {
        info!("script {label}: {line}");
        collected.push(line);
    }
    Ok(collected)
}
