use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{InstanceId, ProjectId, TenantId};

/// Daily cost components for one instance under the platform rate table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub cpu_cost: f64,
    pub memory_cost: f64,
    pub disk_cost: f64,
    pub gpu_cost: f64,
    pub total_cost: f64,
}

/// Append-only daily charge for one instance. At most one record exists per
/// `(instance_id, billing_date)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRecord {
    pub id: Uuid,
    pub instance_id: InstanceId,
    pub project_id: ProjectId,
    pub tenant_id: TenantId,
    pub billing_date: NaiveDate,
    pub cpu_cost: f64,
    pub memory_cost: f64,
    pub disk_cost: f64,
    pub gpu_cost: f64,
    pub total_cost: f64,
    pub created_at: DateTime<Utc>,
}

/// Per-project cost aggregate over a reporting window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCostSummary {
    pub project_id: ProjectId,
    pub project_name: String,
    pub project_code: String,
    pub cpu_cost: f64,
    pub memory_cost: f64,
    pub disk_cost: f64,
    pub gpu_cost: f64,
    pub total_cost: f64,
    pub instance_count: u64,
}

/// Tenant-wide cost view: grand total plus per-project aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingSummary {
    pub total_cost: f64,
    pub record_count: u64,
    pub projects: Vec<ProjectCostSummary>,
}

/// One row of the detailed billing listing, joined with instance identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingLine {
    pub record: BillingRecord,
    pub instance_name: String,
    pub owner: String,
}
