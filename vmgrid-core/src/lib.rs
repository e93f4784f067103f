//! # vmgrid-core
//!
//! The allocation and lifecycle core of the vmgrid compute platform.
//!
//! ## Overview
//!
//! This crate owns the hard invariants of the platform:
//!
//! - **Address pool** ([`allocation`]): probe-verified leasing of network
//!   addresses from configured segments, with no address ever leased to two
//!   instances at once.
//! - **Placement** ([`placement`]): deterministic first-fit host selection
//!   for CPU/memory/GPU requirements against live fabric capacity.
//! - **Provisioning** ([`provisioning`]): the multi-step create/delete flows
//!   with compensating rollback, so a failed attempt never leaks a lease or
//!   leaves a half-created row behind.
//! - **Billing** ([`billing`]): idempotent daily cost records and reporting
//!   aggregates.
//! - **Lifecycle** ([`lifecycle`]): the recurring job scheduler driving
//!   expiry enforcement, billing runs, status reconciliation, and session
//!   housekeeping.
//!
//! Persistence is expressed through repository ports in [`database::ports`]
//! with PostgreSQL implementations in [`database::postgres`]; external
//! collaborators (compute fabric, liveness probe, notifications) are traits
//! in [`fabric`].

pub mod allocation;
pub mod billing;
pub mod database;
pub mod error;
pub mod fabric;
pub mod lifecycle;
pub mod placement;
pub mod provisioning;

pub use error::{GridError, Result};
