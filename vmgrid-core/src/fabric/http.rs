use serde::Deserialize;
use tracing::debug;

use vmgrid_model::ComputeHost;

use super::{
    CloneSpec, ComputeFabricClient, FabricRef, MetricsSnapshot, PowerState, TaskHandle, TaskStatus,
};
use crate::error::{GridError, Result};

/// Connection parameters for the fabric management gateway.
#[derive(Debug, Clone)]
pub struct FabricEndpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// REST client for the fabric management gateway.
///
/// The gateway fronts the hypervisor management endpoint and exposes host
/// inventory, template cloning, task polling, and power control. Certificate
/// verification is relaxed because management endpoints routinely present
/// self-signed certificates inside the management network.
pub struct HttpFabricClient {
    http: reqwest::Client,
    base: String,
    endpoint: FabricEndpoint,
}

impl std::fmt::Debug for HttpFabricClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFabricClient")
            .field("base", &self.base)
            .finish()
    }
}

impl HttpFabricClient {
    pub fn new(endpoint: FabricEndpoint) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| GridError::Upstream(format!("failed to build fabric client: {e}")))?;
        let base = format!("https://{}:{}/api", endpoint.host, endpoint.port);
        Ok(Self {
            http,
            base,
            endpoint,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .basic_auth(&self.endpoint.username, Some(&self.endpoint.password))
            .send()
            .await
            .map_err(|e| GridError::Upstream(format!("fabric GET {path} failed: {e}")))?
            .error_for_status()
            .map_err(|e| GridError::Upstream(format!("fabric GET {path} failed: {e}")))?;
        response
            .json()
            .await
            .map_err(|e| GridError::Upstream(format!("fabric GET {path} returned bad body: {e}")))
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .http
            .post(self.url(path))
            .basic_auth(&self.endpoint.username, Some(&self.endpoint.password))
            .json(body)
            .send()
            .await
            .map_err(|e| GridError::Upstream(format!("fabric POST {path} failed: {e}")))?
            .error_for_status()
            .map_err(|e| GridError::Upstream(format!("fabric POST {path} failed: {e}")))?;
        response
            .json()
            .await
            .map_err(|e| GridError::Upstream(format!("fabric POST {path} returned bad body: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct TaskDto {
    id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PowerResultDto {
    success: bool,
}

#[derive(Debug, Deserialize)]
struct EntityDto {
    handle: String,
    power_state: PowerState,
}

#[async_trait::async_trait]
impl ComputeFabricClient for HttpFabricClient {
    async fn list_hosts(&self) -> Result<Vec<ComputeHost>> {
        self.get_json("/hosts").await
    }

    async fn clone_from_template(&self, spec: &CloneSpec) -> Result<TaskHandle> {
        debug!(template = %spec.template, name = %spec.name, "starting clone task");
        let task: TaskDto = self.post_json("/clone-tasks", spec).await?;
        Ok(TaskHandle(task.id))
    }

    async fn poll_task(&self, task: &TaskHandle) -> Result<TaskStatus> {
        let dto: TaskDto = self.get_json(&format!("/tasks/{}", task.0)).await?;
        match dto.state.as_str() {
            "running" | "queued" => Ok(TaskStatus::Running),
            "succeeded" => {
                let handle = dto.result.ok_or_else(|| {
                    GridError::Upstream(format!("task {} succeeded without a result", task.0))
                })?;
                Ok(TaskStatus::Succeeded { handle })
            }
            _ => Ok(TaskStatus::Failed(
                dto.error.unwrap_or_else(|| format!("task state {}", dto.state)),
            )),
        }
    }

    async fn power_on(&self, handle: &str) -> Result<bool> {
        let result: PowerResultDto = self
            .post_json(&format!("/entities/{handle}/power/on"), &())
            .await?;
        Ok(result.success)
    }

    async fn power_off(&self, handle: &str) -> Result<bool> {
        let result: PowerResultDto = self
            .post_json(&format!("/entities/{handle}/power/off"), &())
            .await?;
        Ok(result.success)
    }

    async fn reset(&self, handle: &str) -> Result<bool> {
        let result: PowerResultDto = self
            .post_json(&format!("/entities/{handle}/power/reset"), &())
            .await?;
        Ok(result.success)
    }

    async fn destroy(&self, handle: &str) -> Result<bool> {
        let result: PowerResultDto = self
            .post_json(&format!("/entities/{handle}/destroy"), &())
            .await?;
        Ok(result.success)
    }

    async fn metrics(&self, handle: &str) -> Result<Option<MetricsSnapshot>> {
        self.get_json(&format!("/entities/{handle}/metrics")).await
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<FabricRef>> {
        let found: Option<EntityDto> = self.get_json(&format!("/entities/{handle}")).await?;
        Ok(found.map(|dto| FabricRef {
            handle: dto.handle,
            power_state: dto.power_state,
        }))
    }
}
