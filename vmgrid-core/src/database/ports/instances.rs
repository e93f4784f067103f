use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use vmgrid_model::{
    FleetStats, Instance, InstanceFilter, InstanceId, InstanceStatus, ProjectId, TenantId,
};

use crate::error::Result;

/// Fields persisted when a provisioning attempt reserves its row.
#[derive(Debug, Clone)]
pub struct NewInstance {
    pub name: String,
    pub project_id: ProjectId,
    pub tenant_id: TenantId,
    pub owner: String,
    pub deadline: DateTime<Utc>,
    pub cpu_cores: i32,
    pub memory_gb: i32,
    pub disk_gb: i32,
    pub gpu_model: Option<String>,
    pub gpu_count: i32,
    pub template_name: String,
}

/// Store for provisioned instances.
#[async_trait]
pub trait InstanceRepository: Send + Sync {
    /// Insert a new row with status `creating` and no fabric handle.
    async fn create(&self, new: NewInstance, now: DateTime<Utc>) -> Result<Instance>;

    async fn get(&self, id: InstanceId) -> Result<Option<Instance>>;

    /// Tenant-scoped lookup; other tenants' instances are invisible.
    async fn get_for_tenant(&self, id: InstanceId, tenant_id: TenantId)
        -> Result<Option<Instance>>;

    async fn list(&self, filter: &InstanceFilter) -> Result<Vec<Instance>>;

    /// Record the leased address on a `creating` row.
    async fn set_address(&self, id: InstanceId, address: IpAddr, now: DateTime<Utc>)
        -> Result<()>;

    /// Complete a successful provisioning attempt: store the fabric handle
    /// and host name and move the row to `stopped`.
    async fn finalize_provisioned(
        &self,
        id: InstanceId,
        fabric_handle: &str,
        host_name: &str,
        now: DateTime<Utc>,
    ) -> Result<()>;

    async fn update_status(
        &self,
        id: InstanceId,
        status: InstanceStatus,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Apply a batch of status updates in one transaction; either all commit
    /// or none do.
    async fn update_statuses(
        &self,
        updates: &[(InstanceId, InstanceStatus)],
        now: DateTime<Utc>,
    ) -> Result<()>;

    async fn delete(&self, id: InstanceId) -> Result<()>;

    /// Instances whose status is running or stopped.
    async fn find_active(&self) -> Result<Vec<Instance>>;

    /// Active instances whose deadline lies strictly between `now` and
    /// `now + window_days` days.
    async fn find_expiring_within(
        &self,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Result<Vec<Instance>>;

    /// Active instances whose deadline has passed.
    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Instance>>;

    /// Active instances that hold a fabric handle, eligible for status
    /// reconciliation.
    async fn find_reconcilable(&self) -> Result<Vec<Instance>>;

    async fn fleet_stats(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Result<FleetStats>;
}
