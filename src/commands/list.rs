use crate::cli::ListArgs;
use crate::config::Settings;
use crate::credentials;
use crate::error::Result;
use crate::hosted::OpsStackClient;
use crate::output;

pub async fn run(args: ListArgs) -> Result<()> {
    let settings = Settings::from_env();
    let creds = credentials::load(&settings.credentials_path())?;
    let client = OpsStackClient::new(&settings.api_url, Some(creds.api_key));

    let response = match args.console_name.as_deref() {
        Some(name) => client.get_ops_stack(name).await?,
        None => client.list_ops_stacks().await?,
    };
    output::stdout(&serde_json::to_string_pretty(&response).unwrap_or_default());
    Ok(())
}
