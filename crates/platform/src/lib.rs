//! Platform concerns shared across the serving and admin surfaces.

pub mod tenancy;

pub use tenancy::{Tenant, TenantDirectory, TenantStatus};
