//! GPU-aware host selection.
//!
//! Placement works on a fresh capacity snapshot fetched from the fabric at
//! decision time; nothing here is persisted. Hosts are considered in name
//! order so the same snapshot always yields the same choice.

use tracing::debug;

use vmgrid_model::{ComputeHost, GpuModel};

/// Resource demand a candidate host must satisfy.
#[derive(Debug, Clone, Copy)]
pub struct PlacementRequirement {
    pub cpu_cores: i32,
    pub memory_gb: i32,
    pub gpu_model: GpuModel,
    pub gpu_count: i32,
}

/// First host, in name order, that is connected and has enough free CPU,
/// free memory, and matching GPU devices. Returns `None` when no host
/// qualifies; the caller turns that into a rejected provisioning attempt.
pub fn select_gpu_host(hosts: &[ComputeHost], req: &PlacementRequirement) -> Option<ComputeHost> {
    let mut candidates: Vec<&ComputeHost> = hosts.iter().collect();
    candidates.sort_by(|a, b| a.name.cmp(&b.name));

    for host in candidates {
        if !host.connected {
            debug!(host = %host.name, "skipping disconnected host");
            continue;
        }
        if host.free_cpu_cores() < f64::from(req.cpu_cores) {
            debug!(host = %host.name, free = host.free_cpu_cores(), "insufficient cpu");
            continue;
        }
        if host.free_memory_gb() < f64::from(req.memory_gb) {
            debug!(host = %host.name, free = host.free_memory_gb(), "insufficient memory");
            continue;
        }
        if host.count_gpus(req.gpu_model) < req.gpu_count as usize {
            debug!(host = %host.name, model = %req.gpu_model, "insufficient gpus");
            continue;
        }
        return Some(host.clone());
    }

    None
}
