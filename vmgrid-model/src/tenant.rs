use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ProjectId, TenantId};

/// An authenticated organizational identity sourced from the directory
/// service. Credential verification happens outside this crate; the row
/// exists so resources and charges can be attributed and notified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub directory_uid: String,
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// A named grouping of instances under a tenant, used for cost aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub code: String,
    pub tenant_id: TenantId,
    pub created_at: DateTime<Utc>,
}
