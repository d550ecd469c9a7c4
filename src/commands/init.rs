use crate::error::Result;
use crate::output;
use std::path::{Path, PathBuf};

pub const EXAMPLE_FILENAME: &str = "example.yml";
const EXAMPLE_TEMPLATE: &str = include_str!("../../templates/example.yml");

/// Write the example template into `dir`, replacing any previous copy.
pub fn write_example(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(EXAMPLE_FILENAME);
    std::fs::write(&path, EXAMPLE_TEMPLATE)?;
    Ok(path)
}

pub fn run(cwd: &Path) -> Result<()> {
    let path = write_example(cwd)?;
    tracing::debug!("wrote {}", path.display());
    output::success("Example template successfully created!");
    Ok(())
}
