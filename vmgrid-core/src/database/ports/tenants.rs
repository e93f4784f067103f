use async_trait::async_trait;

use vmgrid_model::{Tenant, TenantId};

use crate::error::Result;

/// Read access to tenant identity rows. Rows are written by the
/// authentication boundary outside this core; the lifecycle jobs only need
/// to resolve notification recipients.
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn get(&self, id: TenantId) -> Result<Option<Tenant>>;
}
