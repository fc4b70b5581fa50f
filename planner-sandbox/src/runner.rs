//! Sandbox Runner (§4.4.3, §6.4): spawns the generated plan, enforces a
//! wall-clock timeout, and parses the sentinel-delimited result.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use planner_core::{RunId, SandboxError, SandboxResult, TenantId};
use planner_dispatcher::ToolDispatch;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::ipc::IpcServer;
use crate::root::SandboxRoot;

const SENTINEL: &str = "___TB_RESULT___";

/// Object-safe sandbox execution boundary the orchestrator depends on
/// (`Arc<dyn SandboxRun>`), mirroring [`planner_dispatcher::ToolDispatch`]'s
/// split between a trait name and its one concrete implementation.
#[async_trait]
pub trait SandboxRun: Send + Sync {
    /// See [`SandboxRunner::run`].
    async fn run(
        &self,
        run_id: &RunId,
        token: &str,
        tenant: &TenantId,
        code: &str,
        discovered_tools: &BTreeSet<String>,
        dispatcher: &dyn ToolDispatch,
    ) -> Result<SandboxResult, SandboxError>;
}

/// Tunables for the sandbox runner, passed in at construction rather than
/// read from ambient statics.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Wall-clock timeout for one sandbox invocation.
    pub timeout: Duration,
    /// The interpreter used to run the generated plan.
    pub python_path: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            python_path: "python3".to_string(),
        }
    }
}

/// Runs one `sandbox` command's generated plan to completion or timeout.
pub struct SandboxRunner {
    config: SandboxConfig,
}

impl SandboxRunner {
    /// Build a runner with the given configuration.
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SandboxRun for SandboxRunner {
    /// Materialize a sandbox root for `code`, spawn it, and run the IPC
    /// server alongside it until the subprocess exits or the timeout
    /// fires. `discovered_tools` determines which `sandbox_py.servers`
    /// wrapper modules are generated — the submitted code may only import
    /// from among them (enforced upstream, at the Action Executor's AST
    /// gate).
    async fn run(
        &self,
        run_id: &RunId,
        token: &str,
        tenant: &TenantId,
        code: &str,
        discovered_tools: &BTreeSet<String>,
        dispatcher: &dyn ToolDispatch,
    ) -> Result<SandboxResult, SandboxError> {
        let root = SandboxRoot::build(discovered_tools, code)?;
        let ipc = IpcServer::bind(root.path()).await?;

        let mut command = Command::new(&self.config.python_path);
        command
            .arg(root.plan_path())
            .current_dir(root.path())
            .env("SANDBOX_RUN_ID", run_id.as_str())
            .env("SANDBOX_TOKEN", token)
            .env("PYTHONPATH", root.path())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in ipc.transport().env_vars() {
            command.env(key, value);
        }

        let mut child = command
            .spawn()
            .map_err(|e| SandboxError::Spawn(e.to_string()))?;
        let mut stdout = BufReader::new(child.stdout.take().expect("stdout piped")).lines();
        let mut stderr = child.stderr.take().expect("stderr piped");

        let run_id_str = run_id.to_string();

        let outcome = tokio::time::timeout(self.config.timeout, async {
            let serve_fut = ipc.serve_one(&run_id_str, token, tenant, dispatcher);
            tokio::pin!(serve_fut);
            let wait_fut = child.wait();
            tokio::pin!(wait_fut);

            tokio::select! {
                status = &mut wait_fut => status,
                served = &mut serve_fut => {
                    if let Err(e) = served {
                        tracing::warn!(error = %e, "sandbox IPC server ended with an error");
                    }
                    wait_fut.await
                }
            }
        })
        .await;

        let status = match outcome {
            Ok(status) => status.map_err(|e| SandboxError::Runtime(e.to_string()))?,
            Err(_) => {
                let _ = child.kill().await;
                return Ok(SandboxResult {
                    success: false,
                    result: None,
                    logs: Vec::new(),
                    error: Some("sandbox subprocess timed out".to_string()),
                    timed_out: true,
                });
            }
        };

        let mut logs = Vec::new();
        let mut result_json = None;
        while let Ok(Some(line)) = stdout.next_line().await {
            if let Some(payload) = line.strip_prefix(SENTINEL) {
                result_json = Some(payload.to_string());
            } else {
                logs.push(line);
            }
        }

        let mut stderr_buf = String::new();
        let _ = stderr.read_to_string(&mut stderr_buf).await;
        for line in stderr_buf.lines() {
            logs.push(line.to_string());
        }

        match result_json {
            Some(raw) => {
                let value: serde_json::Value = serde_json::from_str(&raw)
                    .map_err(|e| SandboxError::Runtime(format!("malformed result json: {e}")))?;
                Ok(SandboxResult {
                    success: status.success(),
                    result: Some(value),
                    logs,
                    error: None,
                    timed_out: false,
                })
            }
            None => Ok(SandboxResult {
                success: false,
                result: None,
                logs,
                error: Some(if stderr_buf.is_empty() {
                    "sandbox produced no result sentinel".to_string()
                } else {
                    stderr_buf
                }),
                timed_out: false,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_spec_expectations() {
        let config = SandboxConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.python_path, "python3");
    }

    #[test]
    fn sentinel_line_is_stripped_from_logs() {
        let line = format!("{SENTINEL}{{\"ok\":true}}");
        assert_eq!(line.strip_prefix(SENTINEL), Some("{\"ok\":true}"));
    }
}
