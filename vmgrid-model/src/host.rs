use serde::{Deserialize, Serialize};

/// Canonical GPU model identifiers the platform prices and places.
///
/// Device names reported by hosts are matched case-insensitively against the
/// model token, e.g. `"NVIDIA GeForce RTX 3090"` matches [`GpuModel::Rtx3090`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuModel {
    Rtx3090,
    T4,
}

impl GpuModel {
    pub const ALL: [GpuModel; 2] = [GpuModel::Rtx3090, GpuModel::T4];

    /// The token used for request parsing, device-name matching, and rate
    /// lookup.
    pub fn token(&self) -> &'static str {
        match self {
            GpuModel::Rtx3090 => "3090",
            GpuModel::T4 => "t4",
        }
    }

    /// Resolve a requested model string to a canonical model, if recognized.
    pub fn parse(requested: &str) -> Option<GpuModel> {
        let lowered = requested.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|model| lowered == model.token())
    }

    /// Whether a host-reported device name denotes this model.
    pub fn matches_device(&self, device_name: &str) -> bool {
        device_name.to_ascii_lowercase().contains(self.token())
    }
}

impl std::fmt::Display for GpuModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Point-in-time capacity snapshot of one compute host, as reported by the
/// fabric. Never persisted; every placement decision fetches fresh state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeHost {
    pub name: String,
    pub connected: bool,
    pub total_cpu_cores: u32,
    pub used_cpu_percent: f64,
    pub total_memory_gb: f64,
    pub used_memory_gb: f64,
    pub gpu_inventory: Vec<String>,
}

impl ComputeHost {
    pub fn free_cpu_cores(&self) -> f64 {
        let total = f64::from(self.total_cpu_cores);
        total - (self.used_cpu_percent / 100.0) * total
    }

    pub fn free_memory_gb(&self) -> f64 {
        self.total_memory_gb - self.used_memory_gb
    }

    pub fn count_gpus(&self, model: GpuModel) -> usize {
        self.gpu_inventory
            .iter()
            .filter(|device| model.matches_device(device))
            .count()
    }
}
