//! Network address leasing.
//!
//! The pool is seeded from the configured segments and records are handed
//! out through a single conditional update in the store, so concurrent
//! provisioning attempts always receive distinct addresses. Before a lease
//! is accepted the address is probed; a reply means something outside the
//! platform already uses it, and the record is quarantined rather than
//! handed out.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ipnetwork::Ipv4Network;
use tracing::{debug, info, warn};

use vmgrid_model::{AddressRecord, InstanceId, usable_addresses};

use crate::database::ports::AddressPoolRepository;
use crate::error::{GridError, Result};
use crate::fabric::LivenessProbe;

pub struct AddressAllocator {
    pool: Arc<dyn AddressPoolRepository>,
    probe: Arc<dyn LivenessProbe>,
    segments: Vec<Ipv4Network>,
    probe_timeout: Duration,
}

impl std::fmt::Debug for AddressAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressAllocator")
            .field("segments", &self.segments)
            .field("probe_timeout", &self.probe_timeout)
            .finish()
    }
}

impl AddressAllocator {
    pub fn new(
        pool: Arc<dyn AddressPoolRepository>,
        probe: Arc<dyn LivenessProbe>,
        segments: Vec<Ipv4Network>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            probe,
            segments,
            probe_timeout,
        }
    }

    /// Seed the pool with every leasable address of the configured segments.
    /// Existing records keep their state, so startup is safe to repeat.
    pub async fn initialize(&self) -> Result<()> {
        for segment in &self.segments {
            let addresses = usable_addresses(segment);
            let inserted = self
                .pool
                .insert_segment(&segment.to_string(), &addresses)
                .await?;
            info!(
                segment = %segment,
                leasable = addresses.len(),
                inserted,
                "address segment initialized"
            );
        }
        Ok(())
    }

    /// Lease one free address for the instance.
    ///
    /// Leases that turn out to answer a liveness probe are quarantined and
    /// the next record is tried. The loop is bounded by the pool size, so a
    /// pool of entirely squatted addresses terminates with
    /// [`GridError::ResourceExhausted`] instead of spinning.
    pub async fn allocate(
        &self,
        instance_id: InstanceId,
        now: DateTime<Utc>,
    ) -> Result<AddressRecord> {
        let attempts = self.pool.pool_size().await?;
        for _ in 0..attempts {
            let Some(record) = self.pool.lease_next_available(instance_id, now).await? else {
                return Err(GridError::ResourceExhausted);
            };

            if self.probe.is_reachable(record.address, self.probe_timeout).await {
                warn!(
                    address = %record.address,
                    "leased address answered a probe, quarantining"
                );
                self.pool.quarantine(record.address).await?;
                continue;
            }

            debug!(address = %record.address, instance = %instance_id, "address leased");
            return Ok(record);
        }

        Err(GridError::ResourceExhausted)
    }

    /// Return the instance's lease to the pool. Idempotent: releasing an
    /// instance that holds no lease is a no-op.
    pub async fn release(&self, instance_id: InstanceId) -> Result<Option<IpAddr>> {
        let released = self.pool.release_for_instance(instance_id).await?;
        if let Some(address) = released {
            debug!(address = %address, instance = %instance_id, "address released");
        }
        Ok(released)
    }
}
