//! Error types for the ops console CLI.
//!
//! Every fatal path ends in one [`OpsError`]. The top level prints it as a single
//! `Error:` line followed by its hints.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    // Validation
    #[error("Specified config file {} does not exist.", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("ops does not currently support {arch}")]
    UnsupportedArchitecture { arch: String },

    #[error("Cannot launch ops console! The following ports are already in use: {}", join(ports))]
    PortsInUse { ports: Vec<u16> },

    #[error("Cannot launch ops console! Port {port} was requested for both the backend and the frontend")]
    DuplicatePort { port: u16 },

    #[error("Failed to check whether port {port} is available: {source}")]
    PortProbe {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    MalformedConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    // Dependencies
    #[error("The following dependencies could not be found: {}", missing.join(", "))]
    DependenciesNotFound { missing: Vec<String> },

    #[error("Process was interrupted by signal {signal}")]
    Interrupted { signal: String },

    // Infrastructure
    #[error("{message}: {source:#}")]
    Infrastructure {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    // Runtime
    #[error("Ops console backend exited with {}", exit_description(*code))]
    BackendExited { code: Option<i32> },

    #[error("Ops console {component} process failed: {reason}")]
    ProcessFailed { component: String, reason: String },

    // Hosted service
    #[error("Cannot find credentials! Try running \"opsconsole configure\" and try again.")]
    MissingCredentials,

    #[error("Hosted service responded with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Request to hosted service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Prompt failed: {0}")]
    Prompt(#[from] inquire::InquireError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl OpsError {
    pub fn infrastructure(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        OpsError::Infrastructure {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn interrupted(signal: impl Into<String>) -> Self {
        OpsError::Interrupted {
            signal: signal.into(),
        }
    }

    /// Interruption is a cancellation, not a failure: it is never aggregated or reported.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, OpsError::Interrupted { .. })
    }

    pub fn hints(&self) -> Vec<String> {
        match self {
            OpsError::ConfigNotFound { .. } => vec![
                "Pass the path with --config-file, or run \"opsconsole init\" to create an example.".to_string(),
            ],
            OpsError::UnsupportedArchitecture { .. } => {
                vec!["Supported architectures are x64, ia32, arm and arm64.".to_string()]
            }
            OpsError::PortsInUse { .. } => vec![
                "Stop the processes using these ports, or pick others with --backend-port and --frontend-port."
                    .to_string(),
            ],
            OpsError::DuplicatePort { .. } => {
                vec!["Pass different values to --backend-port and --frontend-port.".to_string()]
            }
            OpsError::MalformedConfig { .. } => vec![
                "The template appears to be malformed. Check its YAML syntax and structure."
                    .to_string(),
            ],
            OpsError::DependenciesNotFound { .. } => vec![
                "Check the package names in the dependencies section of your config file.".to_string(),
            ],
            OpsError::Api { status: 401 | 403, .. } => {
                vec!["Run \"opsconsole configure\" to update your API key.".to_string()]
            }
            _ => vec![],
        }
    }
}

fn join(ports: &[u16]) -> String {
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "no exit code (terminated by a signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, OpsError>;
