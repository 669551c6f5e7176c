//! Placement selection — eligible, targeted, priority-ordered ads.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use adserve_core::types::{Ad, AdStatus, RequestContext};
use adserve_targeting::matches;

use crate::store::AdStore;

/// Read-only query engine over the ad store. Never errors: no eligible ads
/// is an empty list, and nothing here has side effects.
pub struct SelectionEngine {
    store: Arc<AdStore>,
}

impl SelectionEngine {
    pub fn new(store: Arc<AdStore>) -> Self {
        Self { store }
    }

    /// Ads eligible for `placement` right now, best first.
    ///
    /// Eligibility: tenant + placement match, the on/off flag set, derived
    /// status active (which subsumes the scheduling window and the
    /// impression/click limits), and the targeting rules matching `ctx`.
    /// Ordering: priority descending, ties broken by recency then id.
    pub fn select_for_placement(
        &self,
        tenant_id: Uuid,
        placement: &str,
        ctx: &RequestContext,
        limit: Option<usize>,
    ) -> Vec<Ad> {
        let now = Utc::now();

        let mut ads: Vec<Ad> = self
            .store
            .list_ads(tenant_id)
            .into_iter()
            .filter(|ad| ad.placement == placement)
            .filter(|ad| ad.is_active && ad.derived_status(now) == AdStatus::Active)
            .filter(|ad| !ad.is_scheduled(now) && !ad.is_expired(now))
            .filter(|ad| !ad.has_reached_impression_limit() && !ad.has_reached_click_limit())
            .collect();

        ads.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });

        // Targeting is a structured document, so it filters in memory after
        // the store query rather than as a store predicate.
        ads.retain(|ad| matches(ad, ctx));

        if let Some(limit) = limit {
            ads.truncate(limit);
        }

        debug!(
            tenant_id = %tenant_id,
            placement = %placement,
            url = %ctx.url,
            selected = ads.len(),
            "placement selection"
        );
        ads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adserve_core::content::AdContent;
    use adserve_core::types::{AdType, Targeting};
    use chrono::{DateTime, Duration};

    fn make_ad(tenant: Uuid, placement: &str, priority: i32) -> Ad {
        let now = Utc::now();
        let mut ad = Ad {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            title: format!("ad p{priority}"),
            description: None,
            ad_type: AdType::Sidebar,
            placement: placement.into(),
            content: AdContent::Sidebar {
                html: "<b>x</b>".into(),
                css: None,
                js: None,
            },
            targeting: None,
            is_active: true,
            priority,
            start_date: None,
            end_date: None,
            max_impressions: None,
            max_clicks: None,
            current_impressions: 0,
            current_clicks: 0,
            click_rate: 0.0,
            status: AdStatus::Active,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        ad.recompute_derived(now);
        ad
    }

    fn engine_with(ads: Vec<Ad>) -> SelectionEngine {
        let store = Arc::new(AdStore::new());
        for ad in ads {
            store.insert_ad(ad);
        }
        SelectionEngine::new(store)
    }

    fn ctx() -> RequestContext {
        RequestContext {
            url: "/jobs/123".into(),
            post_type: None,
            categories: None,
        }
    }

    #[test]
    fn test_priority_ordering_and_limit() {
        let tenant = Uuid::new_v4();
        let engine = engine_with(vec![
            make_ad(tenant, "sidebar", 1),
            make_ad(tenant, "sidebar", 10),
            make_ad(tenant, "sidebar", 5),
        ]);

        let selected = engine.select_for_placement(tenant, "sidebar", &ctx(), None);
        let priorities: Vec<i32> = selected.iter().map(|a| a.priority).collect();
        assert_eq!(priorities, vec![10, 5, 1]);

        let limited = engine.select_for_placement(tenant, "sidebar", &ctx(), Some(2));
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].priority, 10);
    }

    #[test]
    fn test_placement_and_tenant_scoping() {
        let tenant = Uuid::new_v4();
        let other_tenant = Uuid::new_v4();
        let engine = engine_with(vec![
            make_ad(tenant, "sidebar", 1),
            make_ad(tenant, "header", 1),
            make_ad(other_tenant, "sidebar", 1),
        ]);

        let selected = engine.select_for_placement(tenant, "sidebar", &ctx(), None);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].placement, "sidebar");
        assert_eq!(selected[0].tenant_id, tenant);
    }

    #[test]
    fn test_inactive_and_paused_excluded() {
        let tenant = Uuid::new_v4();
        let mut paused = make_ad(tenant, "sidebar", 1);
        paused.is_active = false;
        paused.recompute_derived(Utc::now());
        assert_eq!(paused.status, AdStatus::Paused);

        let engine = engine_with(vec![paused]);
        assert!(engine
            .select_for_placement(tenant, "sidebar", &ctx(), None)
            .is_empty());
    }

    #[test]
    fn test_scheduling_window_excluded() {
        let tenant = Uuid::new_v4();
        let now = Utc::now();

        let mut future = make_ad(tenant, "sidebar", 1);
        future.start_date = Some(now + Duration::days(1));
        future.recompute_derived(now);
        assert_eq!(future.status, AdStatus::Scheduled);

        let mut past = make_ad(tenant, "sidebar", 2);
        past.end_date = Some(now - Duration::days(1));
        past.recompute_derived(now);
        assert_eq!(past.status, AdStatus::Expired);

        let engine = engine_with(vec![future, past]);
        assert!(engine
            .select_for_placement(tenant, "sidebar", &ctx(), None)
            .is_empty());
    }

    #[test]
    fn test_impression_limit_reached_excluded_even_when_flag_on() {
        let tenant = Uuid::new_v4();
        let now = Utc::now();
        let mut capped = make_ad(tenant, "sidebar", 1);
        capped.max_impressions = Some(2);
        capped.current_impressions = 2;
        capped.is_active = true;
        capped.recompute_derived(now);
        assert_eq!(capped.status, AdStatus::Completed);

        let engine = engine_with(vec![capped]);
        assert!(engine
            .select_for_placement(tenant, "sidebar", &ctx(), None)
            .is_empty());
    }

    #[test]
    fn test_targeting_filter_applies_last() {
        let tenant = Uuid::new_v4();
        let mut jobs_only = make_ad(tenant, "sidebar", 10);
        jobs_only.targeting = Some(Targeting {
            url_patterns: Some(vec!["/jobs/*".into()]),
            ..Default::default()
        });
        let untargeted = make_ad(tenant, "sidebar", 1);
        let engine = engine_with(vec![jobs_only, untargeted]);

        let on_jobs = engine.select_for_placement(tenant, "sidebar", &ctx(), None);
        assert_eq!(on_jobs.len(), 2);

        let elsewhere = RequestContext {
            url: "/about".into(),
            post_type: None,
            categories: None,
        };
        let selected = engine.select_for_placement(tenant, "sidebar", &elsewhere, None);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].priority, 1);
    }

    #[test]
    fn test_tie_break_is_stable() {
        let tenant = Uuid::new_v4();
        let base: DateTime<Utc> = Utc::now();
        let mut a = make_ad(tenant, "sidebar", 5);
        let mut b = make_ad(tenant, "sidebar", 5);
        a.created_at = base;
        b.created_at = base;
        let expected_first = a.id.min(b.id);
        let engine = engine_with(vec![a, b]);

        let selected = engine.select_for_placement(tenant, "sidebar", &ctx(), None);
        assert_eq!(selected[0].id, expected_first);
    }
}
