use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use vmgrid_model::{Tenant, TenantId};

use crate::database::ports::TenantRepository;
use crate::error::{GridError, Result};

#[derive(Debug, Clone)]
pub struct PostgresTenantRepository {
    pool: PgPool,
}

impl PostgresTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Result<Tenant> {
        let id: Uuid = row
            .try_get("id")
            .map_err(|e| GridError::Persistence(format!("failed to read tenant id: {e}")))?;
        let directory_uid: String = row
            .try_get("directory_uid")
            .map_err(|e| GridError::Persistence(format!("failed to read directory_uid: {e}")))?;
        let username: String = row
            .try_get("username")
            .map_err(|e| GridError::Persistence(format!("failed to read username: {e}")))?;
        let display_name: Option<String> = row
            .try_get("display_name")
            .map_err(|e| GridError::Persistence(format!("failed to read display_name: {e}")))?;
        let email: Option<String> = row
            .try_get("email")
            .map_err(|e| GridError::Persistence(format!("failed to read email: {e}")))?;
        let department: Option<String> = row
            .try_get("department")
            .map_err(|e| GridError::Persistence(format!("failed to read department: {e}")))?;
        let active: bool = row
            .try_get("active")
            .map_err(|e| GridError::Persistence(format!("failed to read active: {e}")))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| GridError::Persistence(format!("failed to read created_at: {e}")))?;
        let last_login: Option<DateTime<Utc>> = row
            .try_get("last_login")
            .map_err(|e| GridError::Persistence(format!("failed to read last_login: {e}")))?;

        Ok(Tenant {
            id: TenantId(id),
            directory_uid,
            username,
            display_name,
            email,
            department,
            active,
            created_at,
            last_login,
        })
    }
}

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    async fn get(&self, id: TenantId) -> Result<Option<Tenant>> {
        let row = sqlx::query(
            r#"
            SELECT id, directory_uid, username, display_name, email, department,
                   active, created_at, last_login
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GridError::Persistence(format!("failed to fetch tenant: {e}")))?;

        row.as_ref().map(Self::map_row).transpose()
    }
}
