use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{ProjectId, TenantId};
use crate::instance::InstanceStatus;

/// Narrowing criteria for instance listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceFilter {
    pub tenant_id: Option<TenantId>,
    pub project_id: Option<ProjectId>,
    pub statuses: Option<Vec<InstanceStatus>>,
}

impl InstanceFilter {
    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            ..Self::default()
        }
    }
}

/// Narrowing criteria for billing queries. Reporting is always scoped to one
/// tenant; project and date bounds are optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingFilter {
    pub tenant_id: TenantId,
    pub project_id: Option<ProjectId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl BillingFilter {
    pub fn for_tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            project_id: None,
            from: None,
            to: None,
        }
    }
}

/// One-based pagination window for detailed listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

impl Page {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}
