//! Admin mutation surface — create, update, toggle, delete, list.
//!
//! Content documents are validated against the per-type schema before
//! anything is persisted, and every mutation recomputes the derived
//! click_rate/status so stored values never drift.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use adserve_core::content::{validate_content, AdContent};
use adserve_core::event_bus::{make_event, EventSink, EventType};
use adserve_core::types::{Ad, AdStatus, AdType, Targeting};
use adserve_core::{AdError, AdResult};

use crate::store::AdStore;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAdRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub ad_type: AdType,
    pub placement: String,
    /// Raw content document; validated against the `ad_type` schema.
    pub content: serde_json::Value,
    #[serde(default)]
    pub targeting: Option<Targeting>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_impressions: Option<u64>,
    #[serde(default)]
    pub max_clicks: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAdRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ad_type: Option<AdType>,
    #[serde(default)]
    pub placement: Option<String>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    /// `Some(None)` clears targeting; absent leaves it untouched.
    #[serde(default, with = "double_option")]
    pub targeting: Option<Option<Targeting>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default, with = "double_option")]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, with = "double_option")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, with = "double_option")]
    pub max_impressions: Option<Option<u64>>,
    #[serde(default, with = "double_option")]
    pub max_clicks: Option<Option<u64>>,
}

/// Serde helper distinguishing "field absent" from "field set to null".
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Listing filters, all conjunctive.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdFilters {
    #[serde(default)]
    pub status: Option<AdStatus>,
    #[serde(default)]
    pub placement: Option<String>,
    #[serde(default)]
    pub ad_type: Option<AdType>,
}

pub struct AdService {
    store: Arc<AdStore>,
    events: Arc<dyn EventSink>,
}

impl AdService {
    pub fn new(store: Arc<AdStore>, events: Arc<dyn EventSink>) -> Self {
        Self { store, events }
    }

    pub fn create_ad(
        &self,
        tenant_id: Uuid,
        req: CreateAdRequest,
        actor: Option<Uuid>,
    ) -> AdResult<Ad> {
        if req.title.trim().is_empty() {
            return Err(AdError::Validation("title must not be empty".into()));
        }
        if req.placement.trim().is_empty() {
            return Err(AdError::Validation("placement must not be empty".into()));
        }
        validate_window(req.start_date, req.end_date)?;

        // Content validation rejects the whole create; nothing persists on error.
        let content = validate_content(req.ad_type, &req.content)?;

        let now = Utc::now();
        let mut ad = Ad {
            id: Uuid::new_v4(),
            tenant_id,
            title: req.title,
            description: req.description,
            ad_type: req.ad_type,
            placement: req.placement,
            content,
            targeting: req.targeting,
            is_active: req.is_active.unwrap_or(true),
            priority: req.priority.unwrap_or(0),
            start_date: req.start_date,
            end_date: req.end_date,
            max_impressions: req.max_impressions,
            max_clicks: req.max_clicks,
            current_impressions: 0,
            current_clicks: 0,
            click_rate: 0.0,
            status: AdStatus::Active,
            created_by: actor,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        ad.recompute_derived(now);

        self.store.insert_ad(ad.clone());
        self.events
            .emit(make_event(EventType::AdCreated, tenant_id, Some(ad.id)));
        info!(tenant_id = %tenant_id, ad_id = %ad.id, placement = %ad.placement, "ad created");
        Ok(ad)
    }

    pub fn update_ad(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        req: UpdateAdRequest,
        actor: Option<Uuid>,
    ) -> AdResult<Ad> {
        let existing = self
            .store
            .get_ad(tenant_id, id)
            .ok_or(AdError::AdNotFound(id))?;

        let target_type = req.ad_type.unwrap_or(existing.ad_type);
        // Changing the type without a new content document would leave a
        // payload that no longer fits its schema.
        let new_content: Option<AdContent> = match (&req.content, req.ad_type) {
            (Some(raw), _) => Some(validate_content(target_type, raw)?),
            (None, Some(t)) if t != existing.ad_type => {
                return Err(AdError::Validation(
                    "content must be provided when changing ad type".into(),
                ));
            }
            (None, _) => None,
        };

        let start = req.start_date.unwrap_or(existing.start_date);
        let end = req.end_date.unwrap_or(existing.end_date);
        validate_window(start, end)?;
        if let Some(title) = &req.title {
            if title.trim().is_empty() {
                return Err(AdError::Validation("title must not be empty".into()));
            }
        }

        let updated = self
            .store
            .with_ad_mut(tenant_id, id, |ad| {
                if let Some(title) = req.title {
                    ad.title = title;
                }
                if let Some(description) = req.description {
                    ad.description = Some(description);
                }
                if let Some(placement) = req.placement {
                    ad.placement = placement;
                }
                if let Some(content) = new_content {
                    ad.ad_type = content.ad_type();
                    ad.content = content;
                }
                if let Some(targeting) = req.targeting {
                    ad.targeting = targeting;
                }
                if let Some(is_active) = req.is_active {
                    ad.is_active = is_active;
                }
                if let Some(priority) = req.priority {
                    ad.priority = priority;
                }
                if let Some(start_date) = req.start_date {
                    ad.start_date = start_date;
                }
                if let Some(end_date) = req.end_date {
                    ad.end_date = end_date;
                }
                if let Some(max_impressions) = req.max_impressions {
                    ad.max_impressions = max_impressions;
                }
                if let Some(max_clicks) = req.max_clicks {
                    ad.max_clicks = max_clicks;
                }
                ad.updated_by = actor;
                let now = Utc::now();
                ad.updated_at = now;
                ad.recompute_derived(now);
                ad.clone()
            })
            .ok_or(AdError::AdNotFound(id))?;

        self.events
            .emit(make_event(EventType::AdUpdated, tenant_id, Some(id)));
        info!(tenant_id = %tenant_id, ad_id = %id, "ad updated");
        Ok(updated)
    }

    /// Flip the user-controlled on/off switch. Derived status follows, but
    /// a completed or expired ad stays that way.
    pub fn toggle_ad(&self, tenant_id: Uuid, id: Uuid, actor: Option<Uuid>) -> AdResult<Ad> {
        let updated = self
            .store
            .with_ad_mut(tenant_id, id, |ad| {
                ad.is_active = !ad.is_active;
                ad.updated_by = actor;
                let now = Utc::now();
                ad.updated_at = now;
                ad.recompute_derived(now);
                ad.clone()
            })
            .ok_or(AdError::AdNotFound(id))?;

        self.events
            .emit(make_event(EventType::AdUpdated, tenant_id, Some(id)));
        Ok(updated)
    }

    pub fn delete_ad(&self, tenant_id: Uuid, id: Uuid) -> AdResult<()> {
        if !self.store.remove_ad(tenant_id, id) {
            return Err(AdError::AdNotFound(id));
        }
        self.events
            .emit(make_event(EventType::AdDeleted, tenant_id, Some(id)));
        info!(tenant_id = %tenant_id, ad_id = %id, "ad deleted");
        Ok(())
    }

    pub fn get_ad(&self, tenant_id: Uuid, id: Uuid) -> AdResult<Ad> {
        self.store
            .get_ad(tenant_id, id)
            .ok_or(AdError::AdNotFound(id))
    }

    pub fn list_ads(&self, tenant_id: Uuid, filters: &AdFilters) -> Vec<Ad> {
        self.store
            .list_ads(tenant_id)
            .into_iter()
            .filter(|ad| filters.status.map_or(true, |s| ad.status == s))
            .filter(|ad| {
                filters
                    .placement
                    .as_ref()
                    .map_or(true, |p| &ad.placement == p)
            })
            .filter(|ad| filters.ad_type.map_or(true, |t| ad.ad_type == t))
            .collect()
    }
}

fn validate_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> AdResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            return Err(AdError::Validation(
                "end_date must be after start_date".into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use adserve_core::event_bus::capture_sink;
    use chrono::Duration;
    use serde_json::json;

    fn service_with_sink() -> (AdService, Arc<adserve_core::event_bus::CaptureSink>) {
        let sink = capture_sink();
        let service = AdService::new(
            Arc::new(AdStore::new()),
            sink.clone() as Arc<dyn EventSink>,
        );
        (service, sink)
    }

    fn banner_request() -> CreateAdRequest {
        CreateAdRequest {
            title: "Spring hiring banner".into(),
            description: None,
            ad_type: AdType::Banner,
            placement: "header".into(),
            content: json!({
                "image_url": "https://cdn.example.com/spring.png",
                "link_url": "https://example.com/jobs",
            }),
            targeting: None,
            is_active: None,
            priority: None,
            start_date: None,
            end_date: None,
            max_impressions: None,
            max_clicks: None,
        }
    }

    #[test]
    fn test_create_defaults_and_event() {
        let (service, sink) = service_with_sink();
        let tenant = Uuid::new_v4();
        let ad = service.create_ad(tenant, banner_request(), None).unwrap();

        assert!(ad.is_active);
        assert_eq!(ad.priority, 0);
        assert_eq!(ad.current_impressions, 0);
        assert_eq!(ad.click_rate, 0.0);
        assert_eq!(ad.status, AdStatus::Active);
        assert_eq!(sink.count_type(EventType::AdCreated), 1);
        assert_eq!(service.get_ad(tenant, ad.id).unwrap().id, ad.id);
    }

    #[test]
    fn test_create_missing_content_field_persists_nothing() {
        let (service, sink) = service_with_sink();
        let tenant = Uuid::new_v4();
        let mut req = banner_request();
        req.content = json!({"image_url": "https://cdn.example.com/spring.png"});

        let err = service.create_ad(tenant, req, None).unwrap_err();
        assert!(matches!(
            err,
            AdError::MissingContentField { field, .. } if field == "link_url"
        ));
        assert!(service.list_ads(tenant, &AdFilters::default()).is_empty());
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_create_scheduled_status() {
        let (service, _) = service_with_sink();
        let tenant = Uuid::new_v4();
        let mut req = banner_request();
        req.start_date = Some(Utc::now() + Duration::days(1));

        let ad = service.create_ad(tenant, req, None).unwrap();
        assert_eq!(ad.status, AdStatus::Scheduled);
    }

    #[test]
    fn test_create_rejects_inverted_window() {
        let (service, _) = service_with_sink();
        let now = Utc::now();
        let mut req = banner_request();
        req.start_date = Some(now);
        req.end_date = Some(now - Duration::hours(1));

        assert!(matches!(
            service.create_ad(Uuid::new_v4(), req, None),
            Err(AdError::Validation(_))
        ));
    }

    #[test]
    fn test_update_recomputes_status() {
        let (service, _) = service_with_sink();
        let tenant = Uuid::new_v4();
        let ad = service.create_ad(tenant, banner_request(), None).unwrap();

        let updated = service
            .update_ad(
                tenant,
                ad.id,
                UpdateAdRequest {
                    is_active: Some(false),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        assert_eq!(updated.status, AdStatus::Paused);

        let toggled = service.toggle_ad(tenant, ad.id, None).unwrap();
        assert!(toggled.is_active);
        assert_eq!(toggled.status, AdStatus::Active);
    }

    #[test]
    fn test_update_type_change_requires_content() {
        let (service, _) = service_with_sink();
        let tenant = Uuid::new_v4();
        let ad = service.create_ad(tenant, banner_request(), None).unwrap();

        let err = service
            .update_ad(
                tenant,
                ad.id,
                UpdateAdRequest {
                    ad_type: Some(AdType::Video),
                    ..Default::default()
                },
                None,
            )
            .unwrap_err();
        assert!(matches!(err, AdError::Validation(_)));

        let updated = service
            .update_ad(
                tenant,
                ad.id,
                UpdateAdRequest {
                    ad_type: Some(AdType::Video),
                    content: Some(json!({"video_url": "https://cdn.example.com/v.mp4"})),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        assert_eq!(updated.ad_type, AdType::Video);
    }

    #[test]
    fn test_list_filters() {
        let (service, _) = service_with_sink();
        let tenant = Uuid::new_v4();
        service.create_ad(tenant, banner_request(), None).unwrap();
        let mut sidebar = banner_request();
        sidebar.ad_type = AdType::Sidebar;
        sidebar.placement = "sidebar".into();
        sidebar.content = json!({"html": "<b>side</b>"});
        service.create_ad(tenant, sidebar, None).unwrap();

        assert_eq!(service.list_ads(tenant, &AdFilters::default()).len(), 2);
        let filtered = service.list_ads(
            tenant,
            &AdFilters {
                placement: Some("sidebar".into()),
                ..Default::default()
            },
        );
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].placement, "sidebar");
        let by_type = service.list_ads(
            tenant,
            &AdFilters {
                ad_type: Some(AdType::Banner),
                ..Default::default()
            },
        );
        assert_eq!(by_type.len(), 1);
    }

    #[test]
    fn test_delete_missing_ad() {
        let (service, _) = service_with_sink();
        assert!(matches!(
            service.delete_ad(Uuid::new_v4(), Uuid::new_v4()),
            Err(AdError::AdNotFound(_))
        ));
    }
}
