//! Client for the hosted ops console service.

use crate::error::{OpsError, Result};
use reqwest::{Method, StatusCode};
use serde_json::Value;

pub struct OpsStackClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpsStackClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        OpsStackClient {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!("{method} {url}");
        let req = self.client.request(method, url);
        match &self.api_key {
            Some(key) => req.header("authorization", key),
            None => req,
        }
    }

    async fn send(req: reqwest::RequestBuilder) -> Result<Value> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(OpsError::Api {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    pub async fn get_ops_stack(&self, name: &str) -> Result<Value> {
        Self::send(self.request(Method::GET, &format!("/ops-stack/{name}"))).await
    }

    pub async fn list_ops_stacks(&self) -> Result<Value> {
        Self::send(self.request(Method::GET, "/ops-stack")).await
    }

    pub async fn create_ops_stack(&self, config_yaml: &str) -> Result<Value> {
        let req = self
            .request(Method::POST, "/ops-stack")
            .header("content-type", "text/plain")
            .body(config_yaml.to_string());
        Self::send(req).await
    }

    pub async fn update_ops_stack(&self, name: &str, config_yaml: &str) -> Result<Value> {
        let req = self
            .request(Method::PUT, &format!("/ops-stack/{name}"))
            .header("content-type", "text/plain")
            .body(config_yaml.to_string());
        Self::send(req).await
    }

    /// `Ok(false)` on 404; other failures propagate.
    pub async fn ops_stack_exists(&self, name: &str) -> Result<bool> {
        match self.get_ops_stack(name).await {
            Ok(stack) => Ok(stack.get("name").and_then(Value::as_str) == Some(name)),
            Err(OpsError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
