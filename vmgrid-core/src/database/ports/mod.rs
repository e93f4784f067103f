pub mod address_pool;
pub mod billing;
pub mod instances;
pub mod projects;
pub mod sessions;
pub mod tenants;

pub use address_pool::AddressPoolRepository;
pub use billing::{BillingRepository, NewBillingRecord};
pub use instances::{InstanceRepository, NewInstance};
pub use projects::{NewProject, ProjectRepository, ProjectSummary};
pub use sessions::SessionRepository;
pub use tenants::TenantRepository;
