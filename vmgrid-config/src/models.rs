use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveTime;
use ipnetwork::Ipv4Network;

/// Fully validated platform configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub fabric: FabricConfig,
    pub network: NetworkConfig,
    pub pricing: PricingConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Connection and timing parameters for the external compute fabric
/// management endpoint.
#[derive(Debug, Clone)]
pub struct FabricConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Upper bound on waiting for a clone task before the attempt is treated
    /// as failed and compensated.
    pub clone_timeout: Duration,
    /// Interval between task status polls.
    pub poll_interval: Duration,
    /// Timeout for the address liveness probe.
    pub probe_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub segments: Vec<Ipv4Network>,
}

/// Daily rate table, fixed at startup.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub cpu_per_core: f64,
    pub memory_per_gb: f64,
    pub disk_per_100gb: f64,
    /// Per-device daily rate keyed by GPU model token.
    pub gpu: BTreeMap<String, f64>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            cpu_per_core: 0.08,
            memory_per_gb: 0.16,
            disk_per_100gb: 0.5,
            gpu: BTreeMap::from([("3090".to_string(), 11.0), ("t4".to_string(), 5.0)]),
        }
    }
}

/// Cadences for the recurring lifecycle jobs.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub expiry_sweep_at: NaiveTime,
    pub billing_run_at: NaiveTime,
    pub status_sync_every: Duration,
    pub session_cleanup_every: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            expiry_sweep_at: NaiveTime::from_hms_opt(2, 0, 0).expect("valid time"),
            billing_run_at: NaiveTime::from_hms_opt(3, 0, 0).expect("valid time"),
            status_sync_every: Duration::from_secs(5 * 60),
            session_cleanup_every: Duration::from_secs(60 * 60),
        }
    }
}
