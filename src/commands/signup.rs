use crate::config::SIGNUP_URL;
use crate::error::{OpsError, Result};
use crate::output;

pub fn run() -> Result<()> {
    open::that(SIGNUP_URL)
        .map_err(|e| OpsError::infrastructure(format!("Could not open {SIGNUP_URL}"), e))?;
    output::info(&format!("Opened {SIGNUP_URL} in your browser."));
    Ok(())
}
