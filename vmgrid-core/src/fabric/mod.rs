//! Contracts for the external collaborators the core orchestrates: the
//! compute fabric management endpoint, the address liveness probe, and the
//! expiry notification sink.

pub mod http;
pub mod probe;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::info;

use vmgrid_model::{ComputeHost, Instance};

use crate::error::Result;

pub use http::HttpFabricClient;
pub use probe::TcpProbe;

/// Opaque identifier of an in-flight fabric task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle(pub String);

/// Outcome of polling a fabric task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    /// The task finished and produced the opaque handle of the new entity.
    Succeeded { handle: String },
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
}

/// Monitoring snapshot for a powered-on entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub cpu_usage_percent: f64,
    pub memory_usage_mb: f64,
    pub disk_usage_gb: f64,
    pub power_state: PowerState,
    pub uptime_seconds: u64,
}

/// Resolved reference to a fabric-managed entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabricRef {
    pub handle: String,
    pub power_state: PowerState,
}

/// Parameters for cloning a new entity from a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneSpec {
    pub template: String,
    pub name: String,
    pub cpu_cores: i32,
    pub memory_gb: i32,
    pub disk_gb: i32,
    pub address: IpAddr,
    /// Pinned host name, or `None` for fabric-chosen placement.
    pub host: Option<String>,
}

/// Client for the external compute fabric management endpoint.
///
/// Power and destroy operations are idempotent from the orchestrator's point
/// of view: acting on an already-stopped or absent entity reports success
/// rather than an error, since a timed-out earlier attempt may already have
/// taken effect.
#[async_trait]
pub trait ComputeFabricClient: Send + Sync {
    async fn list_hosts(&self) -> Result<Vec<ComputeHost>>;

    /// Start a clone and return the task to poll; the clone itself may take
    /// minutes.
    async fn clone_from_template(&self, spec: &CloneSpec) -> Result<TaskHandle>;

    async fn poll_task(&self, task: &TaskHandle) -> Result<TaskStatus>;

    async fn power_on(&self, handle: &str) -> Result<bool>;

    async fn power_off(&self, handle: &str) -> Result<bool>;

    async fn reset(&self, handle: &str) -> Result<bool>;

    async fn destroy(&self, handle: &str) -> Result<bool>;

    async fn metrics(&self, handle: &str) -> Result<Option<MetricsSnapshot>>;

    async fn find_by_handle(&self, handle: &str) -> Result<Option<FabricRef>>;
}

/// Probe used by the address allocator to detect addresses that are in use
/// outside the platform's knowledge.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn is_reachable(&self, address: IpAddr, timeout: Duration) -> bool;
}

/// Sink for expiry notifications. Message composition and transport live
/// outside the core; this trait only carries the facts.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// `days_until_expiry` is negative once the deadline has passed.
    async fn notify_expiry(
        &self,
        recipient: &str,
        instance: &Instance,
        days_until_expiry: i64,
    ) -> Result<bool>;
}

/// Serializes access to a fabric client whose transport does not tolerate
/// concurrent calls. The orchestrator and the scheduler share one endpoint
/// connection, so every call funnels through a single permit.
pub struct SerializedFabric {
    inner: Arc<dyn ComputeFabricClient>,
    gate: Semaphore,
}

impl std::fmt::Debug for SerializedFabric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializedFabric").finish()
    }
}

impl SerializedFabric {
    pub fn new(inner: Arc<dyn ComputeFabricClient>) -> Self {
        Self {
            inner,
            gate: Semaphore::new(1),
        }
    }

    async fn permit(&self) -> tokio::sync::SemaphorePermit<'_> {
        self.gate.acquire().await.expect("semaphore never closed")
    }
}

#[async_trait]
impl ComputeFabricClient for SerializedFabric {
    async fn list_hosts(&self) -> Result<Vec<ComputeHost>> {
        let _permit = self.permit().await;
        self.inner.list_hosts().await
    }

    async fn clone_from_template(&self, spec: &CloneSpec) -> Result<TaskHandle> {
        let _permit = self.permit().await;
        self.inner.clone_from_template(spec).await
    }

    async fn poll_task(&self, task: &TaskHandle) -> Result<TaskStatus> {
        let _permit = self.permit().await;
        self.inner.poll_task(task).await
    }

    async fn power_on(&self, handle: &str) -> Result<bool> {
        let _permit = self.permit().await;
        self.inner.power_on(handle).await
    }

    async fn power_off(&self, handle: &str) -> Result<bool> {
        let _permit = self.permit().await;
        self.inner.power_off(handle).await
    }

    async fn reset(&self, handle: &str) -> Result<bool> {
        let _permit = self.permit().await;
        self.inner.reset(handle).await
    }

    async fn destroy(&self, handle: &str) -> Result<bool> {
        let _permit = self.permit().await;
        self.inner.destroy(handle).await
    }

    async fn metrics(&self, handle: &str) -> Result<Option<MetricsSnapshot>> {
        let _permit = self.permit().await;
        self.inner.metrics(handle).await
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Option<FabricRef>> {
        let _permit = self.permit().await;
        self.inner.find_by_handle(handle).await
    }
}

/// Notification sink that records the event in the log stream. Used when no
/// delivery transport is wired in; delivery itself is out of scope for the
/// core.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationService for LogNotifier {
    async fn notify_expiry(
        &self,
        recipient: &str,
        instance: &Instance,
        days_until_expiry: i64,
    ) -> Result<bool> {
        info!(
            recipient,
            instance = %instance.id,
            name = %instance.name,
            days_until_expiry,
            "expiry notification"
        );
        Ok(true)
    }
}
