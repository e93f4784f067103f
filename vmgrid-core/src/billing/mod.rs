//! Daily usage billing.
//!
//! Every active instance accrues one charge per calendar day, computed from
//! a fixed rate table. The run is idempotent: re-running a day skips
//! instances already charged, both through an upfront existence check and
//! the store's unique `(instance, date)` constraint.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use vmgrid_model::{
    BillingFilter, BillingLine, BillingSummary, CostBreakdown, GpuModel, Instance, Page,
};

use crate::database::ports::{BillingRepository, InstanceRepository, NewBillingRecord};
use crate::error::Result;

/// Daily rates, fixed at startup.
#[derive(Debug, Clone)]
pub struct RateTable {
    pub cpu_per_core: f64,
    pub memory_per_gb: f64,
    pub disk_per_100gb: f64,
    /// Per-device daily rate keyed by GPU model token.
    pub gpu: BTreeMap<String, f64>,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            cpu_per_core: 0.08,
            memory_per_gb: 0.16,
            disk_per_100gb: 0.5,
            gpu: BTreeMap::from([("3090".to_string(), 11.0), ("t4".to_string(), 5.0)]),
        }
    }
}

impl RateTable {
    /// Daily cost of one instance. A GPU model without a configured rate
    /// contributes nothing rather than failing the whole run.
    pub fn daily_cost(&self, instance: &Instance) -> CostBreakdown {
        let cpu_cost = f64::from(instance.cpu_cores) * self.cpu_per_core;
        let memory_cost = f64::from(instance.memory_gb) * self.memory_per_gb;
        let disk_cost = f64::from(instance.disk_gb) / 100.0 * self.disk_per_100gb;

        let gpu_rate = instance
            .gpu_model
            .as_deref()
            .and_then(GpuModel::parse)
            .and_then(|model| self.gpu.get(model.token()))
            .copied();
        if instance.gpu_model.is_some() && gpu_rate.is_none() {
            warn!(
                instance = %instance.id,
                model = ?instance.gpu_model,
                "no rate for gpu model, charging zero"
            );
        }
        let gpu_cost = gpu_rate.unwrap_or(0.0) * f64::from(instance.gpu_count);

        CostBreakdown {
            cpu_cost,
            memory_cost,
            disk_cost,
            gpu_cost,
            total_cost: cpu_cost + memory_cost + disk_cost + gpu_cost,
        }
    }
}

/// Outcome of one billing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BillingRunStats {
    pub charged: u64,
    pub skipped: u64,
}

pub struct BillingEngine {
    instances: Arc<dyn InstanceRepository>,
    billing: Arc<dyn BillingRepository>,
    rates: RateTable,
}

impl std::fmt::Debug for BillingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingEngine")
            .field("rates", &self.rates)
            .finish()
    }
}

impl BillingEngine {
    pub fn new(
        instances: Arc<dyn InstanceRepository>,
        billing: Arc<dyn BillingRepository>,
        rates: RateTable,
    ) -> Self {
        Self {
            instances,
            billing,
            rates,
        }
    }

    /// Charge every active instance for the given day.
    pub async fn run_daily_billing(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<BillingRunStats> {
        let active = self.instances.find_active().await?;

        let mut stats = BillingRunStats::default();
        let mut batch = Vec::new();
        for instance in &active {
            if self.billing.exists_for(instance.id, date).await? {
                stats.skipped += 1;
                continue;
            }
            batch.push(NewBillingRecord {
                instance_id: instance.id,
                project_id: instance.project_id,
                tenant_id: instance.tenant_id,
                billing_date: date,
                costs: self.rates.daily_cost(instance),
            });
        }

        let written = self.billing.insert_batch(&batch, now).await?;
        stats.charged = written;
        // Conflicts inside the batch count as skips too.
        stats.skipped += batch.len() as u64 - written;

        info!(
            %date,
            charged = stats.charged,
            skipped = stats.skipped,
            "billing run complete"
        );
        Ok(stats)
    }

    pub async fn summary(&self, filter: &BillingFilter) -> Result<BillingSummary> {
        self.billing.summary(filter).await
    }

    pub async fn details(
        &self,
        filter: &BillingFilter,
        page: Page,
    ) -> Result<(Vec<BillingLine>, u64)> {
        self.billing.details(filter, page).await
    }
}
