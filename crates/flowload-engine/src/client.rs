use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use flowload_core::config::EngineConfig;
use flowload_core::error::{FlowloadError, Result};
use flowload_core::traits::{ProcessEngine, Variables};

/// JSON-over-HTTP engine client.
///
/// One pooled `reqwest::Client` is shared by all calls. Requests are never
/// retried: any status of 300 or above is returned as `EngineStatus`.
pub struct RestEngineClient {
    http: Client,
    base_url: String,
}

// ── Request types ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct DeployRequest {
    name: String,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    definition_id: String,
    variables: Variables,
}

#[derive(Debug, Serialize)]
struct ClaimRequest {
    variables: Variables,
}

// ── Response types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

impl RestEngineClient {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .default_headers(default_headers(config)?)
            .user_agent(concat!("flowload/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FlowloadError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_for_id<T: Serialize>(&self, path: &str, body: &T) -> Result<String> {
        let url = self.url(path);
        debug!(url = %url, "POST");

        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| FlowloadError::EngineRequest(format!("{}: {}", url, e)))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| FlowloadError::EngineRequest(format!("{}: {}", url, e)))?;

        if status.as_u16() >= 300 {
            return Err(FlowloadError::EngineStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_id(&text)
    }
}

fn default_headers(config: &EngineConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FlowloadError::Config(format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FlowloadError::Config(format!("Invalid value for header '{}': {}", name, e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn parse_id(body: &str) -> Result<String> {
    serde_json::from_str::<IdResponse>(body)
        .map(|r| r.id)
        .map_err(|e| FlowloadError::EngineResponse(format!("{} (body: {})", e, body)))
}

fn claim_path(process_id: &str, task_name: &str) -> String {
    format!(
        "/processes/{}/tasks/{}/claim",
        urlencoding::encode(process_id),
        urlencoding::encode(task_name)
    )
}

impl ProcessEngine for RestEngineClient {
    fn name(&self) -> &str {
        "rest"
    }

    fn deploy_definition(&self, name: String, content: String) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let id = self
                .post_for_id("/definitions", &DeployRequest { name: name.clone(), content })
                .await?;
            info!(name = %name, definition_id = %id, "Deployed process definition");
            Ok(id)
        })
    }

    fn start_process(
        &self,
        definition_id: String,
        variables: Variables,
    ) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let request = StartRequest {
                definition_id,
                variables,
            };
            let id = self.post_for_id("/processes", &request).await?;
            info!(definition_id = %request.definition_id, process_id = %id, "Started process");
            Ok(id)
        })
    }

    fn claim_task(
        &self,
        process_id: String,
        task_name: String,
        variables: Variables,
    ) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let path = claim_path(&process_id, &task_name);
            let id = self.post_for_id(&path, &ClaimRequest { variables }).await?;
            debug!(process_id = %process_id, task = %task_name, task_id = %id, "Claimed task");
            Ok(id)
        })
    }
}
