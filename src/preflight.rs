//! Checks that run before anything touches containers, files or the network.

use crate::config::config_file_location;
use crate::error::{OpsError, Result};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;

/// Location of a config file that existed when it was validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub parent_directory: PathBuf,
    pub file: String,
}

impl ResolvedPaths {
    pub fn full_path(&self) -> PathBuf {
        self.parent_directory.join(&self.file)
    }
}

pub fn resolve_config_path(raw: Option<&Path>, cwd: &Path) -> Result<ResolvedPaths> {
    let absolute = config_file_location(raw, cwd);
    if !absolute.is_file() {
        return Err(OpsError::ConfigNotFound { path: absolute });
    }

    let parent_directory = absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.to_path_buf());
    let file = absolute
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .ok_or(OpsError::ConfigNotFound {
            path: absolute.clone(),
        })?;

    Ok(ResolvedPaths {
        parent_directory,
        file,
    })
}

/// Image architecture the published base images are built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchitectureTag {
    X86,
    Arm,
}

impl ArchitectureTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchitectureTag::X86 => "x86",
            ArchitectureTag::Arm => "arm",
        }
    }
}

pub fn normalize_architecture(raw: &str) -> Result<ArchitectureTag> {
    match raw {
        "x64" | "x86_64" | "amd64" | "ia32" | "x86" => Ok(ArchitectureTag::X86),
        "arm" | "arm64" | "aarch64" => Ok(ArchitectureTag::Arm),
        other => Err(OpsError::UnsupportedArchitecture {
            arch: other.to_string(),
        }),
    }
}

pub fn host_architecture() -> &'static str {
    std::env::consts::ARCH
}

/// Probe each port with a transient bind on `0.0.0.0`. Every occupied port is reported.
/// A port listed twice is rejected before probing, since each probe releases its bind.
pub async fn check_ports_available(ports: &[u16]) -> Result<()> {
    let mut seen = HashSet::new();
    if let Some(&port) = ports.iter().find(|p| !seen.insert(**p)) {
        return Err(OpsError::DuplicatePort { port });
    }

    let mut in_use = Vec::new();
    for &port in ports {
        match TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => drop(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                tracing::debug!("port {port} is in use");
                in_use.push(port);
            }
            Err(source) => return Err(OpsError::PortProbe { port, source }),
        }
    }

    if in_use.is_empty() {
        Ok(())
    } else {
        Err(OpsError::PortsInUse { ports: in_use })
    }
}
