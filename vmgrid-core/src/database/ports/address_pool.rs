use std::net::{IpAddr, Ipv4Addr};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use vmgrid_model::{AddressRecord, InstanceId};

use crate::error::Result;

/// Store for the leasable address pool.
///
/// Implementations must make `lease_next_available` a single atomic
/// check-then-set: two concurrent callers must never be handed the same
/// record.
#[async_trait]
pub trait AddressPoolRepository: Send + Sync {
    /// Insert any of the given addresses not already present for the
    /// segment. Existing rows are left untouched, so re-running segment
    /// initialization is safe. Returns the number of rows inserted.
    async fn insert_segment(&self, segment: &str, addresses: &[Ipv4Addr]) -> Result<u64>;

    /// Atomically claim one available record for the instance and return it,
    /// or `None` when the pool has no available record left.
    async fn lease_next_available(
        &self,
        instance_id: InstanceId,
        now: DateTime<Utc>,
    ) -> Result<Option<AddressRecord>>;

    /// Mark an address unavailable without a lessee. Used when a liveness
    /// probe found the address in use outside the platform.
    async fn quarantine(&self, address: IpAddr) -> Result<()>;

    /// Clear the lease held by the instance, if any, making the address
    /// available again. Idempotent; returns the released address.
    async fn release_for_instance(&self, instance_id: InstanceId) -> Result<Option<IpAddr>>;

    /// Total number of records in the pool, leased or not. Bounds the
    /// allocator's probe-and-retry loop.
    async fn pool_size(&self) -> Result<u64>;
}
