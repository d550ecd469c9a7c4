use crate::error::{OpsError, Result};
use crate::process::{spawn_process, ProcessHandle};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Captured result of a one-shot runtime invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the command was terminated by a signal.
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The target of a stop/remove did not exist.
    pub fn is_not_found(&self) -> bool {
        let err = self.stderr.to_lowercase();
        err.contains("no such") || err.contains("not found")
    }

    pub fn describe(&self) -> String {
        let status = match (self.code, self.signal) {
            (Some(c), _) => format!("exit code {c}"),
            (None, Some(s)) => format!("signal {s}"),
            (None, None) => "unknown status".to_string(),
        };
        format!(
            "{status}\n\tstdout: {}\n\tstderr: {}",
            self.stdout.trim_end(),
            self.stderr.trim_end()
        )
    }
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Run one runtime command to completion.
    async fn exec(&self, args: &[String]) -> Result<CommandOutput>;

    /// Start a long-lived shell script that drives the runtime.
    fn launch(&self, name: &str, script: &str) -> Result<ProcessHandle>;

    /// Binary name used when composing launch scripts.
    fn binary(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct DockerCli {
    pub docker_bin: String,
    pub cwd: PathBuf,
}

impl DockerCli {
    pub fn new(docker_bin: impl Into<String>, cwd: &Path) -> Self {
        DockerCli {
            docker_bin: docker_bin.into(),
            cwd: cwd.to_path_buf(),
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn exec(&self, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!("$ {} {}", self.docker_bin, args.join(" "));
        let out = Command::new(&self.docker_bin)
            .current_dir(&self.cwd)
            .args(args)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| {
                OpsError::infrastructure(format!("Failed to run {}", self.docker_bin), e)
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            code: out.status.code(),
            signal: exit_signal(&out.status),
        })
    }

    fn launch(&self, name: &str, script: &str) -> Result<ProcessHandle> {
        spawn_process(name, script, &self.cwd)
    }

    fn binary(&self) -> &str {
        &self.docker_bin
    }
}

#[cfg(unix)]
pub fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
pub fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// `docker rm -f <name>`, tolerating a missing container.
pub async fn container_rm_force(runtime: &dyn ContainerRuntime, name: &str) -> Result<()> {
    let out = runtime.exec(&args(&["rm", "-f", name])).await?;
    if out.success() || out.is_not_found() {
        Ok(())
    } else {
        Err(OpsError::infrastructure(
            format!("Failed to remove container {name}"),
            anyhow::anyhow!(out.describe()),
        ))
    }
}

/// `docker network rm <name>`, tolerating a missing network.
pub async fn network_rm(runtime: &dyn ContainerRuntime, name: &str) -> Result<()> {
    let out = runtime.exec(&args(&["network", "rm", name])).await?;
    if out.success() || out.is_not_found() {
        return Ok(());
    }
    if let (None, Some(sig)) = (out.code, out.signal) {
        return Err(OpsError::interrupted(sig.to_string()));
    }
    Err(OpsError::infrastructure(
        format!("docker network rm {name} failed"),
        anyhow::anyhow!(out.describe()),
    ))
}

pub async fn network_create(runtime: &dyn ContainerRuntime, name: &str) -> Result<()> {
    let out = runtime
        .exec(&args(&["network", "create", "-d", "bridge", name]))
        .await?;
    if out.success() {
        return Ok(());
    }
    if let (None, Some(sig)) = (out.code, out.signal) {
        return Err(OpsError::interrupted(sig.to_string()));
    }
    Err(OpsError::infrastructure(
        format!("docker network create {name} failed"),
        anyhow::anyhow!(out.describe()),
    ))
}
