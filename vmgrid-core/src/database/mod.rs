//! Persistence boundary: repository ports consumed by the core components,
//! with PostgreSQL implementations.

pub mod ports;
pub mod postgres;
