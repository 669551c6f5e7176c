//! Multi-tenancy: tenant lifecycle and domain resolution.
//!
//! Every tenant's ads and event logs are keyed by the tenant id; this
//! directory is the authority on which ids exist and which are allowed to
//! serve.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use adserve_core::{AdError, AdResult};

/// Tenant lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
}

/// A single tenant in the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    /// Custom domain the tenant serves from, if any.
    pub domain: Option<String>,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tenant registry backed by DashMap.
pub struct TenantDirectory {
    tenants: DashMap<Uuid, Tenant>,
}

impl Default for TenantDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantDirectory {
    pub fn new() -> Self {
        Self {
            tenants: DashMap::new(),
        }
    }

    /// Register a new tenant. The slug is derived from the name.
    pub fn create_tenant(&self, name: String, domain: Option<String>) -> Tenant {
        let now = Utc::now();
        let slug = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>();

        let tenant = Tenant {
            id: Uuid::new_v4(),
            name,
            slug,
            domain,
            status: TenantStatus::Active,
            created_at: now,
            updated_at: now,
        };

        info!(tenant_id = %tenant.id, tenant_name = %tenant.name, "Tenant created");
        self.tenants.insert(tenant.id, tenant.clone());
        tenant
    }

    pub fn get_tenant(&self, id: Uuid) -> Option<Tenant> {
        self.tenants.get(&id).map(|e| e.value().clone())
    }

    pub fn list_tenants(&self) -> Vec<Tenant> {
        let mut tenants: Vec<Tenant> = self.tenants.iter().map(|e| e.value().clone()).collect();
        tenants.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        tenants
    }

    /// Find the tenant serving from the given custom domain.
    pub fn resolve_domain(&self, domain: &str) -> Option<Tenant> {
        self.tenants
            .iter()
            .find(|e| e.value().domain.as_deref() == Some(domain))
            .map(|e| e.value().clone())
    }

    /// The tenant must exist and not be suspended before any of its ads
    /// are served or mutated.
    pub fn ensure_active(&self, id: Uuid) -> AdResult<Tenant> {
        let tenant = self.get_tenant(id).ok_or(AdError::TenantNotFound(id))?;
        match tenant.status {
            TenantStatus::Active => Ok(tenant),
            TenantStatus::Suspended => Err(AdError::TenantNotFound(id)),
        }
    }

    pub fn suspend_tenant(&self, id: Uuid) -> Option<Tenant> {
        if let Some(mut entry) = self.tenants.get_mut(&id) {
            entry.status = TenantStatus::Suspended;
            entry.updated_at = Utc::now();
            info!(tenant_id = %id, "Tenant suspended");
            Some(entry.clone())
        } else {
            None
        }
    }

    pub fn reactivate_tenant(&self, id: Uuid) -> Option<Tenant> {
        if let Some(mut entry) = self.tenants.get_mut(&id) {
            entry.status = TenantStatus::Active;
            entry.updated_at = Utc::now();
            info!(tenant_id = %id, "Tenant reactivated");
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Seed two demo tenants for local development.
    pub fn seed_demo_tenants(&self) -> Vec<Tenant> {
        let tenants = vec![
            self.create_tenant("Acme Publishing".into(), Some("acme.example.com".into())),
            self.create_tenant("Hobby Blog".into(), None),
        ];
        info!("Demo tenants seeded");
        tenants
    }
}
