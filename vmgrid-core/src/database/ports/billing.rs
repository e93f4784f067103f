use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use vmgrid_model::{
    BillingFilter, BillingLine, BillingSummary, CostBreakdown, InstanceId, Page, ProjectId,
    TenantId,
};

use crate::error::Result;

/// One charge to be appended by a billing run.
#[derive(Debug, Clone)]
pub struct NewBillingRecord {
    pub instance_id: InstanceId,
    pub project_id: ProjectId,
    pub tenant_id: TenantId,
    pub billing_date: NaiveDate,
    pub costs: CostBreakdown,
}

/// Append-only store of daily billing records.
#[async_trait]
pub trait BillingRepository: Send + Sync {
    async fn exists_for(&self, instance_id: InstanceId, billing_date: NaiveDate) -> Result<bool>;

    /// Append a batch of records in one transaction. A record whose
    /// `(instance, date)` pair already exists is skipped rather than
    /// duplicated. Returns the number of rows written.
    async fn insert_batch(&self, records: &[NewBillingRecord], now: DateTime<Utc>) -> Result<u64>;

    async fn summary(&self, filter: &BillingFilter) -> Result<BillingSummary>;

    /// Detailed listing ordered by billing date descending. Returns the page
    /// of rows plus the total matching row count.
    async fn details(&self, filter: &BillingFilter, page: Page)
        -> Result<(Vec<BillingLine>, u64)>;
}
