use std::net::{IpAddr, Ipv4Addr};

use chrono::{DateTime, Utc};
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::ids::InstanceId;

/// One leasable network address within a configured segment.
///
/// Invariant: `leased_to` is set exactly when `available` is false because of
/// an active lease. A record can also be unavailable with no lessee when a
/// liveness probe found the address in use outside the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRecord {
    pub address: IpAddr,
    pub segment: String,
    pub available: bool,
    pub leased_to: Option<InstanceId>,
    pub leased_at: Option<DateTime<Utc>>,
}

/// Enumerate the leasable host addresses of a segment.
///
/// The network and broadcast addresses are excluded, as is the first usable
/// address, which is reserved for the segment gateway.
pub fn usable_addresses(segment: &Ipv4Network) -> Vec<Ipv4Addr> {
    let network = segment.network();
    let broadcast = segment.broadcast();
    let mut gateway_seen = false;
    let mut out = Vec::new();
    for addr in segment.iter() {
        if addr == network || addr == broadcast {
            continue;
        }
        if !gateway_seen {
            gateway_seen = true;
            continue;
        }
        out.push(addr);
    }
    out
}
