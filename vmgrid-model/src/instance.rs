use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::ids::{InstanceId, ProjectId, TenantId};

/// Lifecycle status of a provisioned instance.
///
/// `Creating` rows exist only while a provisioning attempt is in flight; the
/// orchestrator either finalizes them to `Stopped` or deletes them while
/// rolling back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Creating,
    Running,
    Stopped,
    Expired,
    Deleted,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Creating => "creating",
            InstanceStatus::Running => "running",
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::Expired => "expired",
            InstanceStatus::Deleted => "deleted",
        }
    }

    /// Statuses that accrue daily charges and participate in reconciliation.
    pub fn is_active(&self) -> bool {
        matches!(self, InstanceStatus::Running | InstanceStatus::Stopped)
    }
}

impl FromStr for InstanceStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "creating" => Ok(InstanceStatus::Creating),
            "running" => Ok(InstanceStatus::Running),
            "stopped" => Ok(InstanceStatus::Stopped),
            "expired" => Ok(InstanceStatus::Expired),
            "deleted" => Ok(InstanceStatus::Deleted),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Power operation requested against a running instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    On,
    Off,
    Restart,
}

impl FromStr for PowerAction {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(PowerAction::On),
            "off" => Ok(PowerAction::Off),
            "restart" => Ok(PowerAction::Restart),
            other => Err(ModelError::UnknownPowerAction(other.to_string())),
        }
    }
}

/// Provisioning input submitted by the API layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRequest {
    pub name: String,
    pub project_id: ProjectId,
    pub owner: String,
    pub deadline: DateTime<Utc>,
    pub cpu_cores: i32,
    pub memory_gb: i32,
    pub disk_gb: i32,
    pub gpu_model: Option<String>,
    pub gpu_count: i32,
    pub template_name: String,
}

/// A managed compute instance backed by an external fabric-managed entity.
///
/// `fabric_handle` is set exactly when the provisioning transaction finished
/// successfully; a `Creating` row never holds one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    pub name: String,
    pub project_id: ProjectId,
    pub tenant_id: TenantId,
    pub owner: String,
    pub deadline: DateTime<Utc>,
    pub fabric_handle: Option<String>,
    pub address: Option<IpAddr>,
    pub cpu_cores: i32,
    pub memory_gb: i32,
    pub disk_gb: i32,
    pub gpu_model: Option<String>,
    pub gpu_count: i32,
    pub host_name: Option<String>,
    pub status: InstanceStatus,
    pub template_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Instance {
    /// Whole days until the deadline; negative once the deadline has passed.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.deadline - now).num_days()
    }
}

/// Per-tenant aggregate counts, consumed by the reporting surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetStats {
    pub total: u64,
    pub running: u64,
    pub stopped: u64,
    pub expiring_soon: u64,
    pub expired: u64,
    pub total_cpu_cores: i64,
    pub total_memory_gb: i64,
    pub total_disk_gb: i64,
    pub total_gpus: i64,
    pub projects: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            InstanceStatus::Creating,
            InstanceStatus::Running,
            InstanceStatus::Stopped,
            InstanceStatus::Expired,
            InstanceStatus::Deleted,
        ] {
            assert_eq!(status.as_str().parse::<InstanceStatus>().unwrap(), status);
        }
        assert!("paused".parse::<InstanceStatus>().is_err());
    }

    #[test]
    fn only_running_and_stopped_are_active() {
        assert!(InstanceStatus::Running.is_active());
        assert!(InstanceStatus::Stopped.is_active());
        assert!(!InstanceStatus::Creating.is_active());
        assert!(!InstanceStatus::Expired.is_active());
        assert!(!InstanceStatus::Deleted.is_active());
    }

    #[test]
    fn days_until_expiry_goes_negative_past_deadline() {
        let now = Utc::now();
        let mut instance = sample(now);

        instance.deadline = now + Duration::days(3);
        assert_eq!(instance.days_until_expiry(now), 3);

        instance.deadline = now - Duration::days(2);
        assert_eq!(instance.days_until_expiry(now), -2);
    }

    fn sample(now: DateTime<Utc>) -> Instance {
        Instance {
            id: InstanceId::new(),
            name: "vm-1".into(),
            project_id: ProjectId::new(),
            tenant_id: TenantId::new(),
            owner: "alice".into(),
            deadline: now,
            fabric_handle: None,
            address: None,
            cpu_cores: 2,
            memory_gb: 4,
            disk_gb: 50,
            gpu_model: None,
            gpu_count: 0,
            host_name: None,
            status: InstanceStatus::Creating,
            template_name: "ubuntu-22.04".into(),
            created_at: now,
            updated_at: now,
        }
    }
}
