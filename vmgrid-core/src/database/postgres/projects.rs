use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use vmgrid_model::{Project, ProjectId, TenantId};

use crate::database::ports::{NewProject, ProjectRepository, ProjectSummary};
use crate::error::{GridError, Result};

#[derive(Debug, Clone)]
pub struct PostgresProjectRepository {
    pool: PgPool,
}

impl PostgresProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Result<Project> {
        let id: Uuid = row
            .try_get("id")
            .map_err(|e| GridError::Persistence(format!("failed to read project id: {e}")))?;
        let name: String = row
            .try_get("name")
            .map_err(|e| GridError::Persistence(format!("failed to read project name: {e}")))?;
        let code: String = row
            .try_get("code")
            .map_err(|e| GridError::Persistence(format!("failed to read project code: {e}")))?;
        let tenant_id: Uuid = row
            .try_get("tenant_id")
            .map_err(|e| GridError::Persistence(format!("failed to read tenant_id: {e}")))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| GridError::Persistence(format!("failed to read created_at: {e}")))?;

        Ok(Project {
            id: ProjectId(id),
            name,
            code,
            tenant_id: TenantId(tenant_id),
            created_at,
        })
    }
}

#[async_trait]
impl ProjectRepository for PostgresProjectRepository {
    async fn create(&self, new: NewProject, now: DateTime<Utc>) -> Result<Project> {
        let row = sqlx::query(
            r#"
            INSERT INTO projects (id, name, code, tenant_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, code, tenant_id, created_at
            "#,
        )
        .bind(ProjectId::new().to_uuid())
        .bind(&new.name)
        .bind(&new.code)
        .bind(new.tenant_id.to_uuid())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                GridError::Validation(format!("project code already in use: {}", new.code))
            }
            _ => GridError::Persistence(format!("failed to create project: {e}")),
        })?;

        Self::map_row(&row)
    }

    async fn get_owned(&self, id: ProjectId, tenant_id: TenantId) -> Result<Option<Project>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, code, tenant_id, created_at
            FROM projects
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id.to_uuid())
        .bind(tenant_id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GridError::Persistence(format!("failed to fetch project: {e}")))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<ProjectSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT
                p.id, p.name, p.code, p.tenant_id, p.created_at,
                COUNT(i.id) FILTER (WHERE i.status <> 'deleted') AS instance_count
            FROM projects p
            LEFT JOIN instances i ON i.project_id = p.id
            WHERE p.tenant_id = $1
            GROUP BY p.id, p.name, p.code, p.tenant_id, p.created_at
            ORDER BY p.created_at
            "#,
        )
        .bind(tenant_id.to_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GridError::Persistence(format!("failed to list projects: {e}")))?;

        rows.iter()
            .map(|row| {
                let instance_count: i64 = row.try_get("instance_count").map_err(|e| {
                    GridError::Persistence(format!("failed to read instance count: {e}"))
                })?;
                Ok(ProjectSummary {
                    project: Self::map_row(row)?,
                    instance_count: instance_count as u64,
                })
            })
            .collect()
    }
}
