use crate::docker::exit_signal;
use crate::error::{OpsError, Result};
use async_trait::async_trait;
use tokio::process::Command;

#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// `Ok` when `package` resolves. `OpsError::Interrupted` means the lookup itself was
    /// cancelled; any other error means the package could not be resolved.
    async fn resolve(&self, package: &str) -> Result<()>;
}

pub struct NpmRegistry {
    npm_bin: String,
}

impl NpmRegistry {
    pub fn new(npm_bin: impl Into<String>) -> Self {
        NpmRegistry {
            npm_bin: npm_bin.into(),
        }
    }
}

#[async_trait]
impl PackageRegistry for NpmRegistry {
    async fn resolve(&self, package: &str) -> Result<()> {
        tracing::debug!("$ {} view {package} name", self.npm_bin);
        let out = Command::new(&self.npm_bin)
            .args(["view", package, "name"])
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| OpsError::infrastructure(format!("Failed to run {}", self.npm_bin), e))?;

        if out.status.success() {
            return Ok(());
        }
        if let Some(sig) = exit_signal(&out.status) {
            return Err(OpsError::interrupted(sig.to_string()));
        }
        Err(OpsError::infrastructure(
            format!("{} view {package} failed", self.npm_bin),
            anyhow::anyhow!(String::from_utf8_lossy(&out.stderr).trim().to_string()),
        ))
    }
}

/// Check every dependency in turn and report all unresolvable ones together.
/// Interruption stops the loop and propagates unchanged.
pub async fn validate_dependencies<'a, I>(registry: &dyn PackageRegistry, deps: I) -> Result<()>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut missing = Vec::new();
    for dep in deps {
        match registry.resolve(dep).await {
            Ok(()) => {}
            Err(e) if e.is_interrupted() => return Err(e),
            Err(e) => {
                tracing::debug!("dependency {dep} did not resolve: {e}");
                missing.push(dep.clone());
            }
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(OpsError::DependenciesNotFound { missing })
    }
}
