//! Provisioning orchestration.
//!
//! A provisioning attempt runs as a sequence of steps that each acquire a
//! resource: the database row, the address lease, optionally a pinned host,
//! and finally the cloned fabric entity. A failure at any step undoes the
//! acquisitions in reverse order, so a failed attempt leaves no trace beyond
//! log output.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use vmgrid_model::{
    FleetStats, GpuModel, Instance, InstanceFilter, InstanceId, InstanceRequest, InstanceStatus,
    PowerAction, Project, TenantId,
};

use crate::allocation::AddressAllocator;
use crate::database::ports::{
    InstanceRepository, NewInstance, NewProject, ProjectRepository, ProjectSummary,
};
use crate::error::{GridError, Result};
use crate::fabric::{CloneSpec, ComputeFabricClient, MetricsSnapshot, PowerState, TaskStatus};
use crate::placement::{PlacementRequirement, select_gpu_host};

/// Host name recorded when the fabric chose placement itself.
pub const UNCONSTRAINED_HOST: &str = "auto-assigned";

#[derive(Debug, Clone, Copy)]
pub struct ProvisioningSettings {
    /// Upper bound on waiting for a clone task.
    pub clone_timeout: Duration,
    /// Interval between clone task polls.
    pub poll_interval: Duration,
}

pub struct Provisioner {
    instances: Arc<dyn InstanceRepository>,
    projects: Arc<dyn ProjectRepository>,
    allocator: Arc<AddressAllocator>,
    fabric: Arc<dyn ComputeFabricClient>,
    settings: ProvisioningSettings,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("settings", &self.settings)
            .finish()
    }
}

impl Provisioner {
    pub fn new(
        instances: Arc<dyn InstanceRepository>,
        projects: Arc<dyn ProjectRepository>,
        allocator: Arc<AddressAllocator>,
        fabric: Arc<dyn ComputeFabricClient>,
        settings: ProvisioningSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            instances,
            projects,
            allocator,
            fabric,
            settings,
            shutdown,
        }
    }

    /// Provision a new instance for the tenant.
    ///
    /// On success the returned instance is `stopped` with its fabric handle,
    /// address, and host recorded. On failure every acquired resource has
    /// been returned and the error describes the failing step.
    pub async fn submit(&self, tenant_id: TenantId, request: InstanceRequest) -> Result<Instance> {
        let gpu_model = validate(&request)?;

        let project = self
            .projects
            .get_owned(request.project_id, tenant_id)
            .await?
            .ok_or_else(|| {
                GridError::NotFound(format!("project {} not found", request.project_id))
            })?;

        let now = Utc::now();
        let instance = self
            .instances
            .create(
                NewInstance {
                    name: request.name.clone(),
                    project_id: project.id,
                    tenant_id,
                    owner: request.owner.clone(),
                    deadline: request.deadline,
                    cpu_cores: request.cpu_cores,
                    memory_gb: request.memory_gb,
                    disk_gb: request.disk_gb,
                    gpu_model: request.gpu_model.clone(),
                    gpu_count: request.gpu_count,
                    template_name: request.template_name.clone(),
                },
                now,
            )
            .await?;
        let id = instance.id;

        let record = match self.allocator.allocate(id, now).await {
            Ok(record) => record,
            Err(e) => {
                // No lease was kept, so only the row needs undoing.
                if let Err(cleanup) = self.instances.delete(id).await {
                    error!(instance = %id, %cleanup, "failed to remove row after allocation failure");
                }
                return Err(e);
            }
        };

        if let Err(e) = self.instances.set_address(id, record.address, Utc::now()).await {
            self.roll_back(id).await;
            return Err(e);
        }

        let host = match gpu_model {
            Some(model) => match self.place(&request, model).await {
                Ok(host) => Some(host),
                Err(e) => {
                    self.roll_back(id).await;
                    return Err(e);
                }
            },
            None => None,
        };

        let spec = CloneSpec {
            template: request.template_name.clone(),
            name: request.name.clone(),
            cpu_cores: request.cpu_cores,
            memory_gb: request.memory_gb,
            disk_gb: request.disk_gb,
            address: record.address,
            host: host.clone(),
        };

        let handle = match self.clone_and_wait(&spec).await {
            Ok(handle) => handle,
            Err(e) => {
                self.roll_back(id).await;
                return Err(e);
            }
        };

        let host_name = host.as_deref().unwrap_or(UNCONSTRAINED_HOST);
        self.instances
            .finalize_provisioned(id, &handle, host_name, Utc::now())
            .await?;

        info!(
            instance = %id,
            name = %request.name,
            address = %record.address,
            host = host_name,
            "instance provisioned"
        );

        self.instances
            .get(id)
            .await?
            .ok_or_else(|| GridError::NotFound(format!("instance {id} not found")))
    }

    /// Tear down an instance and free everything it holds.
    ///
    /// Safe to retry: a fabric entity that is already gone counts as
    /// destroyed, and an attempt that fails partway leaves the row in place
    /// so a later call can pick up where it stopped.
    pub async fn destroy(&self, tenant_id: TenantId, id: InstanceId) -> Result<()> {
        let instance = self
            .instances
            .get_for_tenant(id, tenant_id)
            .await?
            .ok_or_else(|| GridError::NotFound(format!("instance {id} not found")))?;

        if let Some(handle) = &instance.fabric_handle {
            match self.fabric.find_by_handle(handle).await? {
                None => {
                    info!(instance = %id, "fabric entity already gone");
                }
                Some(entity) => {
                    if entity.power_state == PowerState::On {
                        self.fabric.power_off(handle).await?;
                    }
                    self.fabric.destroy(handle).await?;
                }
            }
        }

        self.allocator.release(id).await?;
        self.instances.delete(id).await?;

        info!(instance = %id, name = %instance.name, "instance destroyed");
        Ok(())
    }

    /// Apply a power action. Returns whether the fabric actually changed
    /// state; `false` means the entity was already in the requested state.
    pub async fn power(
        &self,
        tenant_id: TenantId,
        id: InstanceId,
        action: PowerAction,
    ) -> Result<bool> {
        let instance = self
            .instances
            .get_for_tenant(id, tenant_id)
            .await?
            .ok_or_else(|| GridError::NotFound(format!("instance {id} not found")))?;

        let handle = instance
            .fabric_handle
            .as_deref()
            .ok_or_else(|| GridError::Validation("instance has no fabric entity".into()))?;

        let changed = match action {
            PowerAction::On => {
                let changed = self.fabric.power_on(handle).await?;
                self.instances
                    .update_status(id, InstanceStatus::Running, Utc::now())
                    .await?;
                changed
            }
            PowerAction::Off => {
                let changed = self.fabric.power_off(handle).await?;
                self.instances
                    .update_status(id, InstanceStatus::Stopped, Utc::now())
                    .await?;
                changed
            }
            PowerAction::Restart => self.fabric.reset(handle).await?,
        };

        Ok(changed)
    }

    pub async fn get(&self, tenant_id: TenantId, id: InstanceId) -> Result<Instance> {
        self.instances
            .get_for_tenant(id, tenant_id)
            .await?
            .ok_or_else(|| GridError::NotFound(format!("instance {id} not found")))
    }

    pub async fn list(&self, filter: &InstanceFilter) -> Result<Vec<Instance>> {
        self.instances.list(filter).await
    }

    /// Live monitoring snapshot, or `None` for an instance without a fabric
    /// entity or one the fabric no longer knows.
    pub async fn metrics(
        &self,
        tenant_id: TenantId,
        id: InstanceId,
    ) -> Result<Option<MetricsSnapshot>> {
        let instance = self.get(tenant_id, id).await?;
        match instance.fabric_handle.as_deref() {
            Some(handle) => self.fabric.metrics(handle).await,
            None => Ok(None),
        }
    }

    pub async fn fleet_stats(&self, tenant_id: TenantId) -> Result<FleetStats> {
        self.instances.fleet_stats(tenant_id, Utc::now()).await
    }

    pub async fn create_project(
        &self,
        tenant_id: TenantId,
        name: &str,
        code: &str,
    ) -> Result<Project> {
        if name.trim().is_empty() || code.trim().is_empty() {
            return Err(GridError::Validation(
                "project name and code are required".into(),
            ));
        }
        self.projects
            .create(
                NewProject {
                    name: name.trim().to_string(),
                    code: code.trim().to_string(),
                    tenant_id,
                },
                Utc::now(),
            )
            .await
    }

    pub async fn list_projects(&self, tenant_id: TenantId) -> Result<Vec<ProjectSummary>> {
        self.projects.list_for_tenant(tenant_id).await
    }

    async fn place(&self, request: &InstanceRequest, model: GpuModel) -> Result<String> {
        let hosts = self.fabric.list_hosts().await?;
        let requirement = PlacementRequirement {
            cpu_cores: request.cpu_cores,
            memory_gb: request.memory_gb,
            gpu_model: model,
            gpu_count: request.gpu_count,
        };
        match select_gpu_host(&hosts, &requirement) {
            Some(host) => Ok(host.name),
            None => Err(GridError::PlacementRejected(format!(
                "no connected host offers {}x {} with the requested capacity",
                request.gpu_count, model
            ))),
        }
    }

    async fn clone_and_wait(&self, spec: &CloneSpec) -> Result<String> {
        let task = self.fabric.clone_from_template(spec).await?;
        let deadline = tokio::time::Instant::now() + self.settings.clone_timeout;

        loop {
            match self.fabric.poll_task(&task).await? {
                TaskStatus::Succeeded { handle } => return Ok(handle),
                TaskStatus::Failed(reason) => {
                    return Err(GridError::Upstream(format!("clone failed: {reason}")));
                }
                TaskStatus::Running => {}
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(GridError::Upstream(format!(
                    "clone did not finish within {:?}",
                    self.settings.clone_timeout
                )));
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Err(GridError::Upstream("shutdown during clone wait".into()));
                }
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
    }

    /// Undo a partial provisioning attempt: the lease first, then the row.
    /// Cleanup failures are logged rather than propagated so the original
    /// error reaches the caller.
    async fn roll_back(&self, id: InstanceId) {
        warn!(instance = %id, "rolling back provisioning attempt");
        if let Err(e) = self.allocator.release(id).await {
            error!(instance = %id, error = %e, "failed to release address during rollback");
        }
        if let Err(e) = self.instances.delete(id).await {
            error!(instance = %id, error = %e, "failed to delete row during rollback");
        }
    }
}

/// Check request fields and resolve the GPU model, if one is asked for.
fn validate(request: &InstanceRequest) -> Result<Option<GpuModel>> {
    if request.name.trim().is_empty() {
        return Err(GridError::Validation("instance name is required".into()));
    }
    if request.owner.trim().is_empty() {
        return Err(GridError::Validation("owner is required".into()));
    }
    if request.template_name.trim().is_empty() {
        return Err(GridError::Validation("template name is required".into()));
    }
    if request.deadline <= Utc::now() {
        return Err(GridError::Validation("deadline must be in the future".into()));
    }
    if request.cpu_cores <= 0 || request.memory_gb <= 0 || request.disk_gb <= 0 {
        return Err(GridError::Validation(
            "cpu, memory, and disk must be positive".into(),
        ));
    }
    if request.gpu_count < 0 {
        return Err(GridError::Validation("gpu count cannot be negative".into()));
    }

    match (&request.gpu_model, request.gpu_count) {
        (None, 0) => Ok(None),
        (None, _) => Err(GridError::Validation(
            "gpu count given without a gpu model".into(),
        )),
        (Some(_), 0) => Err(GridError::Validation(
            "gpu model given without a gpu count".into(),
        )),
        (Some(model), _) => GpuModel::parse(model)
            .map(Some)
            .ok_or_else(|| GridError::Validation(format!("unknown gpu model: {model}"))),
    }
}
