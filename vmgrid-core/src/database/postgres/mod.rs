//! Postgres-backed implementations of the repository ports.

pub mod address_pool;
pub mod billing;
pub mod instances;
pub mod projects;
pub mod sessions;
pub mod tenants;

pub use address_pool::PostgresAddressPoolRepository;
pub use billing::PostgresBillingRepository;
pub use instances::PostgresInstanceRepository;
pub use projects::PostgresProjectRepository;
pub use sessions::PostgresSessionRepository;
pub use tenants::PostgresTenantRepository;
