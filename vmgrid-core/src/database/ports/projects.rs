use async_trait::async_trait;
use chrono::{DateTime, Utc};

use vmgrid_model::{Project, ProjectId, TenantId};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub code: String,
    pub tenant_id: TenantId,
}

/// A project joined with how many instances it currently owns.
#[derive(Debug, Clone)]
pub struct ProjectSummary {
    pub project: Project,
    pub instance_count: u64,
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Create a project; the project code is unique platform-wide.
    async fn create(&self, new: NewProject, now: DateTime<Utc>) -> Result<Project>;

    /// Fetch a project only if it belongs to the given tenant.
    async fn get_owned(&self, id: ProjectId, tenant_id: TenantId) -> Result<Option<Project>>;

    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<ProjectSummary>>;
}
