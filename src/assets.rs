//! Build files for the two containers: fetched from the asset bucket and pinned
//! to the architecture-specific base image.

use crate::config::{ensure_dir_exists, Component, Settings};
use crate::error::{OpsError, Result};
use crate::preflight::ArchitectureTag;
use async_trait::async_trait;
use futures_util::StreamExt;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tokio::io::AsyncWriteExt;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the object stored under `key` into `dest`.
    async fn download(&self, key: &str, dest: &Path) -> Result<()>;
}

/// Public bucket reachable over plain HTTPS.
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpObjectStore {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn download(&self, key: &str, dest: &Path) -> Result<()> {
        let url = self.object_url(key);
        tracing::debug!("GET {url} -> {}", dest.display());

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| OpsError::infrastructure(format!("Failed to fetch {key}"), e))?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| write_failed(dest, e))?;
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk =
                chunk.map_err(|e| OpsError::infrastructure(format!("Failed to fetch {key}"), e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| write_failed(dest, e))?;
        }
        file.flush().await.map_err(|e| write_failed(dest, e))?;
        Ok(())
    }
}

fn write_failed(dest: &Path, e: std::io::Error) -> OpsError {
    OpsError::infrastructure(format!("Failed to write {}", dest.display()), e)
}

fn from_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^FROM.*$").expect("valid FROM regex"))
}

/// Replace the first `FROM` line with `FROM <image>`.
pub fn patch_base_image(contents: &str, image: &str) -> String {
    from_line()
        .replacen(contents, 1, regex::NoExpand(&format!("FROM {image}")))
        .into_owned()
}

/// Download both build files into the temp directory and pin their base images to `tag`.
pub async fn fetch_and_patch(
    store: &dyn ObjectStore,
    settings: &Settings,
    tag: ArchitectureTag,
) -> Result<()> {
    ensure_dir_exists(&settings.tmp_dir).map_err(|e| write_failed(&settings.tmp_dir, e))?;

    for component in Component::all() {
        let key = component.build_file_name();
        let dest = settings.build_file(component);
        store.download(key, &dest).await?;

        let contents = tokio::fs::read_to_string(&dest).await.map_err(|e| {
            OpsError::infrastructure(format!("File not found: {}", dest.display()), e)
        })?;
        let patched = patch_base_image(&contents, &component.base_image(tag.as_str()));
        tokio::fs::write(&dest, patched)
            .await
            .map_err(|e| write_failed(&dest, e))?;
        tracing::debug!("patched {} for {}", dest.display(), tag.as_str());
    }
    Ok(())
}
