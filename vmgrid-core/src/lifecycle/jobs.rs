//! The recurring jobs: expiry sweep, billing run, status reconciliation,
//! and session cleanup.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use vmgrid_model::{Instance, InstanceStatus};

use crate::billing::BillingEngine;
use crate::database::ports::{InstanceRepository, SessionRepository, TenantRepository};
use crate::error::Result;
use crate::fabric::{ComputeFabricClient, NotificationService, PowerState};
use crate::lifecycle::LifecycleJob;

/// Days of advance warning before an instance's deadline.
const NOTICE_WINDOW_DAYS: i64 = 7;

/// Full days past the deadline before an expired instance is powered off.
const EXPIRY_GRACE_DAYS: i64 = 1;

/// Warns tenants about approaching deadlines and powers off instances whose
/// deadline has passed.
///
/// Power-off waits one full day past the deadline, so an instance expiring
/// at 23:00 is not cut off by the 02:00 sweep three hours later. The sweep
/// that expires an instance sends a final notification with a negative days
/// count; once marked expired the instance drops out of later sweeps.
pub struct ExpirySweep {
    instances: Arc<dyn InstanceRepository>,
    tenants: Arc<dyn TenantRepository>,
    fabric: Arc<dyn ComputeFabricClient>,
    notifier: Arc<dyn NotificationService>,
}

impl std::fmt::Debug for ExpirySweep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirySweep").finish()
    }
}

impl ExpirySweep {
    pub fn new(
        instances: Arc<dyn InstanceRepository>,
        tenants: Arc<dyn TenantRepository>,
        fabric: Arc<dyn ComputeFabricClient>,
        notifier: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            instances,
            tenants,
            fabric,
            notifier,
        }
    }

    async fn notify(&self, instance: &Instance, now: DateTime<Utc>) {
        let recipient = match self.tenants.get(instance.tenant_id).await {
            Ok(Some(tenant)) => tenant.email,
            Ok(None) => None,
            Err(error) => {
                warn!(instance = %instance.id, %error, "failed to resolve tenant");
                return;
            }
        };
        let Some(recipient) = recipient else {
            debug!(instance = %instance.id, "tenant has no notification address");
            return;
        };

        let days = instance.days_until_expiry(now);
        if let Err(error) = self.notifier.notify_expiry(&recipient, instance, days).await {
            warn!(instance = %instance.id, %error, "expiry notification failed");
        }
    }

    async fn power_off_expired(&self, instance: &Instance, now: DateTime<Utc>) -> Result<()> {
        if instance.status != InstanceStatus::Running {
            return Ok(());
        }
        if instance.days_until_expiry(now) > -EXPIRY_GRACE_DAYS {
            return Ok(());
        }

        if let Some(handle) = instance.fabric_handle.as_deref() {
            self.fabric.power_off(handle).await?;
            info!(instance = %instance.id, name = %instance.name, "expired instance powered off");
        }
        self.instances
            .update_status(instance.id, InstanceStatus::Expired, now)
            .await
    }
}

#[async_trait]
impl LifecycleJob for ExpirySweep {
    fn name(&self) -> &'static str {
        "expiry-sweep"
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<()> {
        let expiring = self
            .instances
            .find_expiring_within(now, NOTICE_WINDOW_DAYS)
            .await?;
        for instance in &expiring {
            self.notify(instance, now).await;
        }

        let expired = self.instances.find_expired(now).await?;
        for instance in &expired {
            // A fabric hiccup on one instance must not starve the rest.
            if let Err(error) = self.power_off_expired(instance, now).await {
                warn!(instance = %instance.id, %error, "failed to power off expired instance");
            }
            self.notify(instance, now).await;
        }

        info!(
            expiring = expiring.len(),
            expired = expired.len(),
            "expiry sweep complete"
        );
        Ok(())
    }
}

/// Runs the daily billing cycle for the sweep day.
pub struct BillingRun {
    engine: Arc<BillingEngine>,
}

impl std::fmt::Debug for BillingRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingRun").finish()
    }
}

impl BillingRun {
    pub fn new(engine: Arc<BillingEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl LifecycleJob for BillingRun {
    fn name(&self) -> &'static str {
        "billing-run"
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<()> {
        self.engine.run_daily_billing(now.date_naive(), now).await?;
        Ok(())
    }
}

/// Reconciles stored statuses with the fabric's observed power states.
///
/// All drift found in one pass commits as a single batch; a persistence
/// failure drops the whole batch and the next tick retries.
pub struct StatusReconciliation {
    instances: Arc<dyn InstanceRepository>,
    fabric: Arc<dyn ComputeFabricClient>,
}

impl std::fmt::Debug for StatusReconciliation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReconciliation").finish()
    }
}

impl StatusReconciliation {
    pub fn new(
        instances: Arc<dyn InstanceRepository>,
        fabric: Arc<dyn ComputeFabricClient>,
    ) -> Self {
        Self { instances, fabric }
    }
}

#[async_trait]
impl LifecycleJob for StatusReconciliation {
    fn name(&self) -> &'static str {
        "status-sync"
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<()> {
        let candidates = self.instances.find_reconcilable().await?;

        let mut updates = Vec::new();
        for instance in &candidates {
            let Some(handle) = instance.fabric_handle.as_deref() else {
                continue;
            };
            match self.fabric.find_by_handle(handle).await {
                Ok(Some(entity)) => {
                    let observed = match entity.power_state {
                        PowerState::On => InstanceStatus::Running,
                        PowerState::Off => InstanceStatus::Stopped,
                    };
                    if observed != instance.status {
                        updates.push((instance.id, observed));
                    }
                }
                Ok(None) => {
                    // Entity vanished outside our control; leave the row for
                    // the tenant to destroy.
                    warn!(instance = %instance.id, handle, "fabric entity not found");
                }
                Err(error) => {
                    warn!(instance = %instance.id, %error, "status lookup failed");
                }
            }
        }

        if !updates.is_empty() {
            self.instances.update_statuses(&updates, now).await?;
            info!(updated = updates.len(), "statuses reconciled");
        }
        Ok(())
    }
}

/// Purges expired session rows.
pub struct SessionCleanup {
    sessions: Arc<dyn SessionRepository>,
}

impl std::fmt::Debug for SessionCleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCleanup").finish()
    }
}

impl SessionCleanup {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl LifecycleJob for SessionCleanup {
    fn name(&self) -> &'static str {
        "session-cleanup"
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<()> {
        let purged = self.sessions.delete_expired(now).await?;
        if purged > 0 {
            info!(purged, "expired sessions removed");
        }
        Ok(())
    }
}
