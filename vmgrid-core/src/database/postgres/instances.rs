use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use vmgrid_model::{
    FleetStats, Instance, InstanceFilter, InstanceId, InstanceStatus, ProjectId, TenantId,
};

use crate::database::ports::{InstanceRepository, NewInstance};
use crate::error::{GridError, Result};

const INSTANCE_COLUMNS: &str = r#"
    id, name, project_id, tenant_id, owner, deadline, fabric_handle, address,
    cpu_cores, memory_gb, disk_gb, gpu_model, gpu_count, host_name, status,
    template_name, created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct PostgresInstanceRepository {
    pool: PgPool,
}

impl PostgresInstanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Result<Instance> {
        let id: Uuid = row
            .try_get("id")
            .map_err(|e| GridError::Persistence(format!("failed to read instance id: {e}")))?;
        let name: String = row
            .try_get("name")
            .map_err(|e| GridError::Persistence(format!("failed to read name: {e}")))?;
        let project_id: Uuid = row
            .try_get("project_id")
            .map_err(|e| GridError::Persistence(format!("failed to read project_id: {e}")))?;
        let tenant_id: Uuid = row
            .try_get("tenant_id")
            .map_err(|e| GridError::Persistence(format!("failed to read tenant_id: {e}")))?;
        let owner: String = row
            .try_get("owner")
            .map_err(|e| GridError::Persistence(format!("failed to read owner: {e}")))?;
        let deadline: DateTime<Utc> = row
            .try_get("deadline")
            .map_err(|e| GridError::Persistence(format!("failed to read deadline: {e}")))?;
        let fabric_handle: Option<String> = row
            .try_get("fabric_handle")
            .map_err(|e| GridError::Persistence(format!("failed to read fabric_handle: {e}")))?;
        let address: Option<IpAddr> = row
            .try_get::<Option<IpNetwork>, _>("address")
            .map_err(|e| GridError::Persistence(format!("failed to read address: {e}")))?
            .map(|network| network.ip());
        let cpu_cores: i32 = row
            .try_get("cpu_cores")
            .map_err(|e| GridError::Persistence(format!("failed to read cpu_cores: {e}")))?;
        let memory_gb: i32 = row
            .try_get("memory_gb")
            .map_err(|e| GridError::Persistence(format!("failed to read memory_gb: {e}")))?;
        let disk_gb: i32 = row
            .try_get("disk_gb")
            .map_err(|e| GridError::Persistence(format!("failed to read disk_gb: {e}")))?;
        let gpu_model: Option<String> = row
            .try_get("gpu_model")
            .map_err(|e| GridError::Persistence(format!("failed to read gpu_model: {e}")))?;
        let gpu_count: i32 = row
            .try_get("gpu_count")
            .map_err(|e| GridError::Persistence(format!("failed to read gpu_count: {e}")))?;
        let host_name: Option<String> = row
            .try_get("host_name")
            .map_err(|e| GridError::Persistence(format!("failed to read host_name: {e}")))?;
        let status: String = row
            .try_get("status")
            .map_err(|e| GridError::Persistence(format!("failed to read status: {e}")))?;
        let template_name: String = row
            .try_get("template_name")
            .map_err(|e| GridError::Persistence(format!("failed to read template_name: {e}")))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| GridError::Persistence(format!("failed to read created_at: {e}")))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|e| GridError::Persistence(format!("failed to read updated_at: {e}")))?;

        let status = status
            .parse::<InstanceStatus>()
            .map_err(|e| GridError::Persistence(format!("invalid status in database: {e}")))?;

        Ok(Instance {
            id: InstanceId(id),
            name,
            project_id: ProjectId(project_id),
            tenant_id: TenantId(tenant_id),
            owner,
            deadline,
            fabric_handle,
            address,
            cpu_cores,
            memory_gb,
            disk_gb,
            gpu_model,
            gpu_count,
            host_name,
            status,
            template_name,
            created_at,
            updated_at,
        })
    }

    fn map_rows(rows: &[PgRow]) -> Result<Vec<Instance>> {
        rows.iter().map(Self::map_row).collect()
    }
}

#[async_trait]
impl InstanceRepository for PostgresInstanceRepository {
    async fn create(&self, new: NewInstance, now: DateTime<Utc>) -> Result<Instance> {
        let query = format!(
            r#"
            INSERT INTO instances (
                id, name, project_id, tenant_id, owner, deadline,
                cpu_cores, memory_gb, disk_gb, gpu_model, gpu_count,
                status, template_name, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
            RETURNING {INSTANCE_COLUMNS}
            "#
        );
        let row = sqlx::query(&query)
            .bind(InstanceId::new().to_uuid())
            .bind(&new.name)
            .bind(new.project_id.to_uuid())
            .bind(new.tenant_id.to_uuid())
            .bind(&new.owner)
            .bind(new.deadline)
            .bind(new.cpu_cores)
            .bind(new.memory_gb)
            .bind(new.disk_gb)
            .bind(&new.gpu_model)
            .bind(new.gpu_count)
            .bind(InstanceStatus::Creating.as_str())
            .bind(&new.template_name)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| GridError::Persistence(format!("failed to create instance: {e}")))?;

        Self::map_row(&row)
    }

    async fn get(&self, id: InstanceId) -> Result<Option<Instance>> {
        let query = format!("SELECT {INSTANCE_COLUMNS} FROM instances WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id.to_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| GridError::Persistence(format!("failed to fetch instance: {e}")))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn get_for_tenant(
        &self,
        id: InstanceId,
        tenant_id: TenantId,
    ) -> Result<Option<Instance>> {
        let query =
            format!("SELECT {INSTANCE_COLUMNS} FROM instances WHERE id = $1 AND tenant_id = $2");
        let row = sqlx::query(&query)
            .bind(id.to_uuid())
            .bind(tenant_id.to_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| GridError::Persistence(format!("failed to fetch instance: {e}")))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn list(&self, filter: &InstanceFilter) -> Result<Vec<Instance>> {
        let statuses: Option<Vec<String>> = filter
            .statuses
            .as_ref()
            .map(|s| s.iter().map(|status| status.as_str().to_string()).collect());

        let query = format!(
            r#"
            SELECT {INSTANCE_COLUMNS}
            FROM instances
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::uuid IS NULL OR project_id = $2)
              AND ($3::text[] IS NULL OR status = ANY($3))
            ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query(&query)
            .bind(filter.tenant_id.map(|id| id.to_uuid()))
            .bind(filter.project_id.map(|id| id.to_uuid()))
            .bind(statuses)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GridError::Persistence(format!("failed to list instances: {e}")))?;

        Self::map_rows(&rows)
    }

    async fn set_address(
        &self,
        id: InstanceId,
        address: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE instances SET address = $2, updated_at = $3 WHERE id = $1")
            .bind(id.to_uuid())
            .bind(IpNetwork::from(address))
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| GridError::Persistence(format!("failed to record address: {e}")))?;

        Ok(())
    }

    async fn finalize_provisioned(
        &self,
        id: InstanceId,
        fabric_handle: &str,
        host_name: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE instances
            SET fabric_handle = $2,
                host_name = $3,
                status = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id.to_uuid())
        .bind(fabric_handle)
        .bind(host_name)
        .bind(InstanceStatus::Stopped.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| GridError::Persistence(format!("failed to finalize instance: {e}")))?;

        Ok(())
    }

    async fn update_status(
        &self,
        id: InstanceId,
        status: InstanceStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE instances SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.to_uuid())
            .bind(status.as_str())
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| GridError::Persistence(format!("failed to update status: {e}")))?;

        Ok(())
    }

    async fn update_statuses(
        &self,
        updates: &[(InstanceId, InstanceStatus)],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| GridError::Persistence(format!("failed to begin transaction: {e}")))?;

        for (id, status) in updates {
            sqlx::query("UPDATE instances SET status = $2, updated_at = $3 WHERE id = $1")
                .bind(id.to_uuid())
                .bind(status.as_str())
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| GridError::Persistence(format!("failed to update status: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| GridError::Persistence(format!("failed to commit status batch: {e}")))?;

        Ok(())
    }

    async fn delete(&self, id: InstanceId) -> Result<()> {
        sqlx::query("DELETE FROM instances WHERE id = $1")
            .bind(id.to_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| GridError::Persistence(format!("failed to delete instance: {e}")))?;

        Ok(())
    }

    async fn find_active(&self) -> Result<Vec<Instance>> {
        let query = format!(
            r#"
            SELECT {INSTANCE_COLUMNS}
            FROM instances
            WHERE status IN ('running', 'stopped')
            ORDER BY created_at
            "#
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GridError::Persistence(format!("failed to list active: {e}")))?;

        Self::map_rows(&rows)
    }

    async fn find_expiring_within(
        &self,
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Result<Vec<Instance>> {
        let window_end = now + Duration::days(window_days);
        let query = format!(
            r#"
            SELECT {INSTANCE_COLUMNS}
            FROM instances
            WHERE status IN ('running', 'stopped')
              AND deadline > $1
              AND deadline <= $2
            ORDER BY deadline
            "#
        );
        let rows = sqlx::query(&query)
            .bind(now)
            .bind(window_end)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GridError::Persistence(format!("failed to list expiring: {e}")))?;

        Self::map_rows(&rows)
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> Result<Vec<Instance>> {
        let query = format!(
            r#"
            SELECT {INSTANCE_COLUMNS}
            FROM instances
            WHERE status IN ('running', 'stopped')
              AND deadline <= $1
            ORDER BY deadline
            "#
        );
        let rows = sqlx::query(&query)
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GridError::Persistence(format!("failed to list expired: {e}")))?;

        Self::map_rows(&rows)
    }

    async fn find_reconcilable(&self) -> Result<Vec<Instance>> {
        let query = format!(
            r#"
            SELECT {INSTANCE_COLUMNS}
            FROM instances
            WHERE status IN ('running', 'stopped')
              AND fabric_handle IS NOT NULL
            ORDER BY created_at
            "#
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GridError::Persistence(format!("failed to list reconcilable: {e}")))?;

        Self::map_rows(&rows)
    }

    async fn fleet_stats(&self, tenant_id: TenantId, now: DateTime<Utc>) -> Result<FleetStats> {
        let soon = now + Duration::days(7);
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'running') AS running,
                COUNT(*) FILTER (WHERE status = 'stopped') AS stopped,
                COUNT(*) FILTER (
                    WHERE status IN ('running', 'stopped')
                      AND deadline > $2 AND deadline <= $3
                ) AS expiring_soon,
                COUNT(*) FILTER (WHERE status = 'expired') AS expired,
                COALESCE(SUM(cpu_cores) FILTER (WHERE status IN ('running', 'stopped')), 0)
                    AS total_cpu_cores,
                COALESCE(SUM(memory_gb) FILTER (WHERE status IN ('running', 'stopped')), 0)
                    AS total_memory_gb,
                COALESCE(SUM(disk_gb) FILTER (WHERE status IN ('running', 'stopped')), 0)
                    AS total_disk_gb,
                COALESCE(SUM(gpu_count) FILTER (WHERE status IN ('running', 'stopped')), 0)
                    AS total_gpus,
                COUNT(DISTINCT project_id) AS projects
            FROM instances
            WHERE tenant_id = $1 AND status <> 'deleted'
            "#,
        )
        .bind(tenant_id.to_uuid())
        .bind(now)
        .bind(soon)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GridError::Persistence(format!("failed to compute fleet stats: {e}")))?;

        let read = |name: &str| -> Result<i64> {
            row.try_get(name)
                .map_err(|e| GridError::Persistence(format!("failed to read {name}: {e}")))
        };

        Ok(FleetStats {
            total: read("total")? as u64,
            running: read("running")? as u64,
            stopped: read("stopped")? as u64,
            expiring_soon: read("expiring_soon")? as u64,
            expired: read("expired")? as u64,
            total_cpu_cores: read("total_cpu_cores")?,
            total_memory_gb: read("total_memory_gb")?,
            total_disk_gb: read("total_disk_gb")?,
            total_gpus: read("total_gpus")?,
            projects: read("projects")? as u64,
        })
    }
}
