use crate::config::{ensure_dir_exists, Settings};
use crate::credentials::{self, Credentials};
use crate::error::Result;
use crate::output;
use inquire::Password;

const API_KEY_PROMPT: &str =
    "Enter your TinyStacks API key. If you do not have one, create one at https://ops.tinystacks.com";

pub fn run() -> Result<()> {
    let settings = Settings::from_env();
    ensure_dir_exists(&settings.tmp_dir)?;

    let api_key = Password::new(API_KEY_PROMPT)
        .without_confirmation()
        .prompt()?;

    let path = settings.credentials_path();
    credentials::save(
        &path,
        &Credentials {
            api_key: api_key.trim().to_string(),
            group_name: None,
        },
    )?;
    tracing::debug!("saved credentials to {}", path.display());
    output::success("Credentials saved.");
    Ok(())
}
