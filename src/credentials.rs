use crate::config::ensure_dir_exists;
use crate::error::{OpsError, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
}

/// Read the credentials file. Anything short of a readable file with an API key
/// is reported as missing credentials.
pub fn load(path: &Path) -> Result<Credentials> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("Could not read file {}! File does not exist!", path.display());
            return Err(OpsError::MissingCredentials);
        }
        Err(e) => {
            tracing::debug!("Failed to read file {}! {e}", path.display());
            return Err(OpsError::MissingCredentials);
        }
    };

    match serde_json::from_str::<Credentials>(&contents) {
        Ok(creds) if !creds.api_key.trim().is_empty() => Ok(creds),
        Ok(_) => Err(OpsError::MissingCredentials),
        Err(e) => {
            tracing::debug!("Failed to parse {}: {e}", path.display());
            Err(OpsError::MissingCredentials)
        }
    }
}

pub fn save(path: &Path, creds: &Credentials) -> Result<()> {
    if let Some(dir) = path.parent() {
        ensure_dir_exists(dir)?;
    }
    let json = serde_json::to_string(creds).map_err(std::io::Error::from)?;
    std::fs::write(path, json)?;
    Ok(())
}
