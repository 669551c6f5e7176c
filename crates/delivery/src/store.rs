//! Tenant-scoped in-memory ad store backed by DashMap.
//!
//! Production: replace with PostgreSQL (sqlx) or similar ACID store. The
//! method surface is shaped so that swap stays local to this module: reads
//! filter on tenant, and the only mutation path for counters is
//! [`AdStore::with_ad_mut`], which holds the entry lock for the whole
//! increment-plus-recompute so concurrent recorders never lose updates.
//! Impression and click rows are append-only; no update or delete API
//! exists for them.

use dashmap::DashMap;
use uuid::Uuid;

use adserve_core::types::{Ad, AdClick, AdImpression};

pub struct AdStore {
    ads: DashMap<Uuid, Ad>,
    impressions: DashMap<Uuid, AdImpression>,
    clicks: DashMap<Uuid, AdClick>,
}

impl AdStore {
    pub fn new() -> Self {
        Self {
            ads: DashMap::new(),
            impressions: DashMap::new(),
            clicks: DashMap::new(),
        }
    }

    // ─── Ads ───────────────────────────────────────────────────────────────

    pub fn insert_ad(&self, ad: Ad) {
        self.ads.insert(ad.id, ad);
    }

    pub fn get_ad(&self, tenant_id: Uuid, id: Uuid) -> Option<Ad> {
        self.ads
            .get(&id)
            .filter(|a| a.tenant_id == tenant_id)
            .map(|a| a.value().clone())
    }

    /// All of a tenant's ads, newest first.
    pub fn list_ads(&self, tenant_id: Uuid) -> Vec<Ad> {
        let mut ads: Vec<Ad> = self
            .ads
            .iter()
            .filter(|a| a.tenant_id == tenant_id)
            .map(|a| a.value().clone())
            .collect();
        ads.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        ads
    }

    /// Mutate one ad under its entry lock. Returns `None` when the ad does
    /// not exist for this tenant; the closure never runs in that case.
    pub fn with_ad_mut<R>(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        f: impl FnOnce(&mut Ad) -> R,
    ) -> Option<R> {
        let mut entry = self.ads.get_mut(&id)?;
        if entry.tenant_id != tenant_id {
            return None;
        }
        Some(f(entry.value_mut()))
    }

    pub fn remove_ad(&self, tenant_id: Uuid, id: Uuid) -> bool {
        self.ads
            .remove_if(&id, |_, ad| ad.tenant_id == tenant_id)
            .is_some()
    }

    // ─── Event rows (append-only) ──────────────────────────────────────────

    pub fn append_impression(&self, impression: AdImpression) {
        self.impressions.insert(impression.id, impression);
    }

    pub fn append_click(&self, click: AdClick) {
        self.clicks.insert(click.id, click);
    }

    /// A tenant's impressions, oldest first.
    pub fn list_impressions(&self, tenant_id: Uuid) -> Vec<AdImpression> {
        let mut rows: Vec<AdImpression> = self
            .impressions
            .iter()
            .filter(|i| i.tenant_id == tenant_id)
            .map(|i| i.value().clone())
            .collect();
        rows.sort_by(|a, b| a.viewed_at.cmp(&b.viewed_at).then(a.id.cmp(&b.id)));
        rows
    }

    /// A tenant's clicks, oldest first.
    pub fn list_clicks(&self, tenant_id: Uuid) -> Vec<AdClick> {
        let mut rows: Vec<AdClick> = self
            .clicks
            .iter()
            .filter(|c| c.tenant_id == tenant_id)
            .map(|c| c.value().clone())
            .collect();
        rows.sort_by(|a, b| a.clicked_at.cmp(&b.clicked_at).then(a.id.cmp(&b.id)));
        rows
    }
}

impl Default for AdStore {
    fn default() -> Self {
        Self::new()
    }
}
