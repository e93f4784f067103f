use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use vmgrid_model::{
    BillingFilter, BillingLine, BillingRecord, BillingSummary, InstanceId, Page, ProjectCostSummary,
    ProjectId, TenantId,
};

use crate::database::ports::{BillingRepository, NewBillingRecord};
use crate::error::{GridError, Result};

#[derive(Debug, Clone)]
pub struct PostgresBillingRepository {
    pool: PgPool,
}

impl PostgresBillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_line(row: &PgRow) -> Result<BillingLine> {
        let read_cost = |name: &str| -> Result<f64> {
            row.try_get(name)
                .map_err(|e| GridError::Persistence(format!("failed to read {name}: {e}")))
        };

        let id: Uuid = row
            .try_get("id")
            .map_err(|e| GridError::Persistence(format!("failed to read record id: {e}")))?;
        let instance_id: Uuid = row
            .try_get("instance_id")
            .map_err(|e| GridError::Persistence(format!("failed to read instance_id: {e}")))?;
        let project_id: Uuid = row
            .try_get("project_id")
            .map_err(|e| GridError::Persistence(format!("failed to read project_id: {e}")))?;
        let tenant_id: Uuid = row
            .try_get("tenant_id")
            .map_err(|e| GridError::Persistence(format!("failed to read tenant_id: {e}")))?;
        let billing_date: NaiveDate = row
            .try_get("billing_date")
            .map_err(|e| GridError::Persistence(format!("failed to read billing_date: {e}")))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| GridError::Persistence(format!("failed to read created_at: {e}")))?;
        let instance_name: String = row
            .try_get("instance_name")
            .map_err(|e| GridError::Persistence(format!("failed to read instance name: {e}")))?;
        let owner: String = row
            .try_get("owner")
            .map_err(|e| GridError::Persistence(format!("failed to read owner: {e}")))?;

        Ok(BillingLine {
            record: BillingRecord {
                id,
                instance_id: InstanceId(instance_id),
                project_id: ProjectId(project_id),
                tenant_id: TenantId(tenant_id),
                billing_date,
                cpu_cost: read_cost("cpu_cost")?,
                memory_cost: read_cost("memory_cost")?,
                disk_cost: read_cost("disk_cost")?,
                gpu_cost: read_cost("gpu_cost")?,
                total_cost: read_cost("total_cost")?,
                created_at,
            },
            instance_name,
            owner,
        })
    }
}

#[async_trait]
impl BillingRepository for PostgresBillingRepository {
    async fn exists_for(&self, instance_id: InstanceId, billing_date: NaiveDate) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM billing_records
                WHERE instance_id = $1 AND billing_date = $2
            ) AS present
            "#,
        )
        .bind(instance_id.to_uuid())
        .bind(billing_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GridError::Persistence(format!("failed to check billing record: {e}")))?;

        row.try_get("present")
            .map_err(|e| GridError::Persistence(format!("failed to read existence: {e}")))
    }

    async fn insert_batch(&self, records: &[NewBillingRecord], now: DateTime<Utc>) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| GridError::Persistence(format!("failed to begin transaction: {e}")))?;

        let mut written = 0u64;
        for record in records {
            // The unique (instance_id, billing_date) index makes re-runs of a
            // billing day no-ops for rows already charged.
            let result = sqlx::query(
                r#"
                INSERT INTO billing_records (
                    id, instance_id, project_id, tenant_id, billing_date,
                    cpu_cost, memory_cost, disk_cost, gpu_cost, total_cost,
                    created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ON CONFLICT (instance_id, billing_date) DO NOTHING
                "#,
            )
            .bind(Uuid::now_v7())
            .bind(record.instance_id.to_uuid())
            .bind(record.project_id.to_uuid())
            .bind(record.tenant_id.to_uuid())
            .bind(record.billing_date)
            .bind(record.costs.cpu_cost)
            .bind(record.costs.memory_cost)
            .bind(record.costs.disk_cost)
            .bind(record.costs.gpu_cost)
            .bind(record.costs.total_cost)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                GridError::Persistence(format!("failed to insert billing record: {e}"))
            })?;
            written += result.rows_affected();
        }

        tx.commit().await.map_err(|e| {
            GridError::Persistence(format!("failed to commit billing batch: {e}"))
        })?;

        Ok(written)
    }

    async fn summary(&self, filter: &BillingFilter) -> Result<BillingSummary> {
        let rows = sqlx::query(
            r#"
            SELECT
                p.id AS project_id,
                p.name AS project_name,
                p.code AS project_code,
                COALESCE(SUM(b.cpu_cost), 0) AS cpu_cost,
                COALESCE(SUM(b.memory_cost), 0) AS memory_cost,
                COALESCE(SUM(b.disk_cost), 0) AS disk_cost,
                COALESCE(SUM(b.gpu_cost), 0) AS gpu_cost,
                COALESCE(SUM(b.total_cost), 0) AS total_cost,
                COUNT(DISTINCT b.instance_id) AS instance_count,
                COUNT(*) AS record_count
            FROM billing_records b
            JOIN projects p ON p.id = b.project_id
            WHERE b.tenant_id = $1
              AND ($2::uuid IS NULL OR b.project_id = $2)
              AND ($3::date IS NULL OR b.billing_date >= $3)
              AND ($4::date IS NULL OR b.billing_date <= $4)
            GROUP BY p.id, p.name, p.code
            ORDER BY total_cost DESC
            "#,
        )
        .bind(filter.tenant_id.to_uuid())
        .bind(filter.project_id.map(|id| id.to_uuid()))
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GridError::Persistence(format!("failed to summarize billing: {e}")))?;

        let mut summary = BillingSummary::default();
        for row in &rows {
            let read_cost = |name: &str| -> Result<f64> {
                row.try_get(name)
                    .map_err(|e| GridError::Persistence(format!("failed to read {name}: {e}")))
            };
            let project_id: Uuid = row
                .try_get("project_id")
                .map_err(|e| GridError::Persistence(format!("failed to read project_id: {e}")))?;
            let project_name: String = row
                .try_get("project_name")
                .map_err(|e| GridError::Persistence(format!("failed to read project name: {e}")))?;
            let project_code: String = row
                .try_get("project_code")
                .map_err(|e| GridError::Persistence(format!("failed to read project code: {e}")))?;
            let instance_count: i64 = row.try_get("instance_count").map_err(|e| {
                GridError::Persistence(format!("failed to read instance count: {e}"))
            })?;
            let record_count: i64 = row
                .try_get("record_count")
                .map_err(|e| GridError::Persistence(format!("failed to read record count: {e}")))?;

            let project = ProjectCostSummary {
                project_id: ProjectId(project_id),
                project_name,
                project_code,
                cpu_cost: read_cost("cpu_cost")?,
                memory_cost: read_cost("memory_cost")?,
                disk_cost: read_cost("disk_cost")?,
                gpu_cost: read_cost("gpu_cost")?,
                total_cost: read_cost("total_cost")?,
                instance_count: instance_count as u64,
            };

            summary.total_cost += project.total_cost;
            summary.record_count += record_count as u64;
            summary.projects.push(project);
        }

        Ok(summary)
    }

    async fn details(
        &self,
        filter: &BillingFilter,
        page: Page,
    ) -> Result<(Vec<BillingLine>, u64)> {
        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM billing_records b
            WHERE b.tenant_id = $1
              AND ($2::uuid IS NULL OR b.project_id = $2)
              AND ($3::date IS NULL OR b.billing_date >= $3)
              AND ($4::date IS NULL OR b.billing_date <= $4)
            "#,
        )
        .bind(filter.tenant_id.to_uuid())
        .bind(filter.project_id.map(|id| id.to_uuid()))
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GridError::Persistence(format!("failed to count billing records: {e}")))?;

        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| GridError::Persistence(format!("failed to read record count: {e}")))?;

        // Left join: billing history outlives the instance row it charged.
        let rows = sqlx::query(
            r#"
            SELECT
                b.id, b.instance_id, b.project_id, b.tenant_id, b.billing_date,
                b.cpu_cost, b.memory_cost, b.disk_cost, b.gpu_cost, b.total_cost,
                b.created_at,
                COALESCE(i.name, '(deleted)') AS instance_name,
                COALESCE(i.owner, '') AS owner
            FROM billing_records b
            LEFT JOIN instances i ON i.id = b.instance_id
            WHERE b.tenant_id = $1
              AND ($2::uuid IS NULL OR b.project_id = $2)
              AND ($3::date IS NULL OR b.billing_date >= $3)
              AND ($4::date IS NULL OR b.billing_date <= $4)
            ORDER BY b.billing_date DESC, b.created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.tenant_id.to_uuid())
        .bind(filter.project_id.map(|id| id.to_uuid()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(i64::from(page.per_page))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GridError::Persistence(format!("failed to list billing records: {e}")))?;

        let lines = rows
            .iter()
            .map(Self::map_line)
            .collect::<Result<Vec<_>>>()?;

        Ok((lines, total as u64))
    }
}
