use std::net::{IpAddr, Ipv4Addr};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use vmgrid_model::{AddressRecord, InstanceId};

use crate::database::ports::AddressPoolRepository;
use crate::error::{GridError, Result};

#[derive(Debug, Clone)]
pub struct PostgresAddressPoolRepository {
    pool: PgPool,
}

impl PostgresAddressPoolRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow) -> Result<AddressRecord> {
        let address: IpNetwork = row
            .try_get("address")
            .map_err(|e| GridError::Persistence(format!("failed to read address: {e}")))?;
        let segment: String = row
            .try_get("segment")
            .map_err(|e| GridError::Persistence(format!("failed to read segment: {e}")))?;
        let available: bool = row
            .try_get("available")
            .map_err(|e| GridError::Persistence(format!("failed to read available: {e}")))?;
        let leased_to: Option<Uuid> = row
            .try_get("leased_to")
            .map_err(|e| GridError::Persistence(format!("failed to read leased_to: {e}")))?;
        let leased_at: Option<DateTime<Utc>> = row
            .try_get("leased_at")
            .map_err(|e| GridError::Persistence(format!("failed to read leased_at: {e}")))?;

        Ok(AddressRecord {
            address: address.ip(),
            segment,
            available,
            leased_to: leased_to.map(InstanceId),
            leased_at,
        })
    }
}

#[async_trait]
impl AddressPoolRepository for PostgresAddressPoolRepository {
    async fn insert_segment(&self, segment: &str, addresses: &[Ipv4Addr]) -> Result<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| GridError::Persistence(format!("failed to begin transaction: {e}")))?;

        let mut inserted = 0u64;
        for address in addresses {
            let result = sqlx::query(
                r#"
                INSERT INTO address_pool (address, segment, available)
                VALUES ($1, $2, TRUE)
                ON CONFLICT (address) DO NOTHING
                "#,
            )
            .bind(IpNetwork::from(IpAddr::V4(*address)))
            .bind(segment)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                GridError::Persistence(format!("failed to insert pool address: {e}"))
            })?;
            inserted += result.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| GridError::Persistence(format!("failed to commit pool insert: {e}")))?;

        Ok(inserted)
    }

    async fn lease_next_available(
        &self,
        instance_id: InstanceId,
        now: DateTime<Utc>,
    ) -> Result<Option<AddressRecord>> {
        // Single conditional update so concurrent callers can never claim
        // the same record. SKIP LOCKED lets them fan out to distinct rows
        // instead of serializing on the lowest address.
        let row = sqlx::query(
            r#"
            UPDATE address_pool
            SET available = FALSE,
                leased_to = $1,
                leased_at = $2
            WHERE address = (
                SELECT address
                FROM address_pool
                WHERE available
                ORDER BY address
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING address, segment, available, leased_to, leased_at
            "#,
        )
        .bind(instance_id.to_uuid())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GridError::Persistence(format!("failed to lease address: {e}")))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn quarantine(&self, address: IpAddr) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE address_pool
            SET available = FALSE,
                leased_to = NULL,
                leased_at = NULL
            WHERE address = $1
            "#,
        )
        .bind(IpNetwork::from(address))
        .execute(&self.pool)
        .await
        .map_err(|e| GridError::Persistence(format!("failed to quarantine address: {e}")))?;

        Ok(())
    }

    async fn release_for_instance(&self, instance_id: InstanceId) -> Result<Option<IpAddr>> {
        let row = sqlx::query(
            r#"
            UPDATE address_pool
            SET available = TRUE,
                leased_to = NULL,
                leased_at = NULL
            WHERE leased_to = $1
            RETURNING address
            "#,
        )
        .bind(instance_id.to_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GridError::Persistence(format!("failed to release address: {e}")))?;

        row.map(|row| {
            row.try_get::<IpNetwork, _>("address")
                .map(|network| network.ip())
                .map_err(|e| GridError::Persistence(format!("failed to read address: {e}")))
        })
        .transpose()
    }

    async fn pool_size(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM address_pool")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| GridError::Persistence(format!("failed to count pool: {e}")))?;

        let total: i64 = row
            .try_get("total")
            .map_err(|e| GridError::Persistence(format!("failed to read pool count: {e}")))?;

        Ok(total as u64)
    }
}
