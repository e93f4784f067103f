//! # vmgrid-model
//!
//! Shared data models for the vmgrid compute platform: strongly typed IDs,
//! instance and address-pool entities, host capacity snapshots, billing
//! records, and the tenant/project ownership model.
//!
//! This crate carries no persistence or runtime logic; it only defines the
//! shapes exchanged between `vmgrid-core`, its repositories, and the daemon.

pub mod billing;
pub mod error;
pub mod filter;
pub mod host;
pub mod ids;
pub mod instance;
pub mod network;
pub mod tenant;

pub use billing::{BillingLine, BillingRecord, BillingSummary, CostBreakdown, ProjectCostSummary};
pub use error::ModelError;
pub use filter::{BillingFilter, InstanceFilter, Page};
pub use host::{ComputeHost, GpuModel};
pub use ids::{InstanceId, ProjectId, TenantId};
pub use instance::{FleetStats, Instance, InstanceRequest, InstanceStatus, PowerAction};
pub use network::{usable_addresses, AddressRecord};
pub use tenant::{Project, Tenant};
