use crate::cli::ConfigArgs;
use crate::config::{config_file_location, Settings};
use crate::credentials;
use crate::error::{OpsError, Result};
use crate::hosted::OpsStackClient;
use crate::manifest::ConsoleManifest;
use crate::output;
use std::path::Path;

pub async fn run(cwd: &Path, args: ConfigArgs) -> Result<()> {
    let settings = Settings::from_env();
    let path = config_file_location(args.config_file.as_deref(), cwd);
    let contents = std::fs::read_to_string(&path).map_err(|source| OpsError::ConfigRead {
        path: path.clone(),
        source,
    })?;
    let manifest = ConsoleManifest::parse(&contents, &path)?;

    let creds = credentials::load(&settings.credentials_path())?;
    let client = OpsStackClient::new(&settings.api_url, Some(creds.api_key));

    let response = deploy(&client, &manifest.name, &contents).await?;
    output::success("Successfully started ops console deployment!");
    output::stdout(&serde_json::to_string_pretty(&response).unwrap_or_default());
    Ok(())
}

/// Update the console if the service already has it, create it otherwise.
pub async fn deploy(
    client: &OpsStackClient,
    name: &str,
    config_yaml: &str,
) -> Result<serde_json::Value> {
    if client.ops_stack_exists(name).await? {
        tracing::debug!("console {name} exists, updating");
        client.update_ops_stack(name, config_yaml).await
    } else {
        tracing::debug!("console {name} not found, creating");
        client.create_ops_stack(config_yaml).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = "Console:\n  name: console\n";

    #[tokio::test]
    async fn existing_console_is_updated() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ops-stack/console")
            .with_status(200)
            .with_body(r#"{"name":"console"}"#)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/ops-stack/console")
            .with_status(200)
            .with_body(r#"{"name":"console","status":"UPDATING"}"#)
            .create_async()
            .await;

        let client = OpsStackClient::new(server.url(), Some("k".into()));
        let resp = deploy(&client, "console", YAML).await.unwrap();

        put.assert_async().await;
        assert_eq!(resp["status"], "UPDATING");
    }

    #[tokio::test]
    async fn unknown_console_is_created() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ops-stack/console")
            .with_status(404)
            .create_async()
            .await;
        let post = server
            .mock("POST", "/ops-stack")
            .with_status(201)
            .with_body(r#"{"name":"console","status":"CREATING"}"#)
            .create_async()
            .await;

        let client = OpsStackClient::new(server.url(), Some("k".into()));
        let resp = deploy(&client, "console", YAML).await.unwrap();

        post.assert_async().await;
        assert_eq!(resp["status"], "CREATING");
    }

    #[tokio::test]
    async fn lookup_failure_aborts_deploy() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ops-stack/console")
            .with_status(500)
            .create_async()
            .await;
        let post = server
            .mock("POST", "/ops-stack")
            .expect(0)
            .create_async()
            .await;

        let client = OpsStackClient::new(server.url(), Some("k".into()));
        let err = deploy(&client, "console", YAML).await.unwrap_err();

        post.assert_async().await;
        assert!(matches!(err, OpsError::Api { status: 500, .. }));
    }
}
