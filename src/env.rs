use std::path::Path;

/// Load `.env` from `cwd` into the process environment, if present.
/// Variables already set in the environment win over the file.
pub fn load_env(cwd: &Path) -> Option<String> {
    let base = cwd.join(".env");
    if !base.exists() {
        return None;
    }
    match dotenvy::from_path(&base) {
        Ok(()) => Some(".env".to_string()),
        Err(e) => {
            tracing::warn!("ignoring unreadable {}: {e}", base.display());
            None
        }
    }
}

pub fn var_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
