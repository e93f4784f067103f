//! # vmgrid-config
//!
//! TOML + environment configuration for the vmgrid platform. The loader
//! parses a raw on-disk representation, applies environment overrides for
//! secrets, and validates the result into the typed [`Config`] consumed by
//! the daemon.

pub mod loader;
pub mod models;

pub use loader::{ConfigLoadError, ENV_DATABASE_URL, ENV_FABRIC_PASSWORD};
pub use models::{
    Config, DatabaseConfig, FabricConfig, NetworkConfig, PricingConfig, SchedulerConfig,
};
