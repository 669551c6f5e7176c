//! Impression and click recording.
//!
//! Each call appends one immutable event row and bumps the ad's counter.
//! The increment, the derived click_rate/status recomputation, and the row
//! append all happen under the ad's entry lock, so concurrent requests
//! never observe a stale status or lose an update, and a concurrent delete
//! cannot land between the counter update and the row write. A vanished ad
//! is an error before anything is written — no orphan event rows.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use adserve_core::event_bus::{EventSink, EventType};
use adserve_core::types::{AdClick, AdImpression, RequestMeta};
use adserve_core::{AdError, AdResult};

use crate::device::{device_info, location_info};
use crate::store::AdStore;

pub struct EventRecorder {
    store: Arc<AdStore>,
    events: Arc<dyn EventSink>,
}

impl EventRecorder {
    pub fn new(store: Arc<AdStore>, events: Arc<dyn EventSink>) -> Self {
        Self { store, events }
    }

    /// Record one render of an ad. Call once per ad actually displayed,
    /// after selection has produced the final list.
    ///
    /// Render-path callers should log and continue on `Err` — ads are
    /// best-effort telemetry, never worth failing a page for.
    pub fn record_impression(
        &self,
        tenant_id: Uuid,
        ad_id: Uuid,
        meta: &RequestMeta,
    ) -> AdResult<AdImpression> {
        let now = Utc::now();
        let impression = AdImpression {
            id: Uuid::new_v4(),
            tenant_id,
            ad_id,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            page_url: meta.page_url.clone(),
            referrer: meta.referrer.clone(),
            device: device_info(&meta.user_agent),
            location: location_info(&meta.ip_address),
            viewed_at: now,
        };

        self.store
            .with_ad_mut(tenant_id, ad_id, |ad| {
                ad.current_impressions += 1;
                ad.updated_at = now;
                ad.recompute_derived(now);
                self.store.append_impression(impression.clone());
            })
            .ok_or(AdError::AdNotFound(ad_id))?;

        self.emit(EventType::Impression, tenant_id, ad_id, Some(impression.id), &meta.page_url);
        debug!(tenant_id = %tenant_id, ad_id = %ad_id, impression_id = %impression.id, "impression recorded");
        Ok(impression)
    }

    /// Record a click-through, optionally linked to the impression that
    /// produced it.
    pub fn record_click(
        &self,
        tenant_id: Uuid,
        ad_id: Uuid,
        meta: &RequestMeta,
        click_url: Option<String>,
        impression_id: Option<Uuid>,
    ) -> AdResult<AdClick> {
        let now = Utc::now();
        let click = AdClick {
            id: Uuid::new_v4(),
            tenant_id,
            ad_id,
            impression_id,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            page_url: meta.page_url.clone(),
            click_url,
            device: device_info(&meta.user_agent),
            location: location_info(&meta.ip_address),
            clicked_at: now,
        };

        self.store
            .with_ad_mut(tenant_id, ad_id, |ad| {
                ad.current_clicks += 1;
                ad.updated_at = now;
                ad.recompute_derived(now);
                self.store.append_click(click.clone());
            })
            .ok_or(AdError::AdNotFound(ad_id))?;

        self.emit(EventType::Click, tenant_id, ad_id, click.impression_id, &meta.page_url);
        debug!(tenant_id = %tenant_id, ad_id = %ad_id, click_id = %click.id, "click recorded");
        Ok(click)
    }

    fn emit(
        &self,
        event_type: EventType,
        tenant_id: Uuid,
        ad_id: Uuid,
        impression_id: Option<Uuid>,
        page_url: &str,
    ) {
        let mut event = adserve_core::event_bus::make_event(event_type, tenant_id, Some(ad_id));
        event.impression_id = impression_id;
        event.page_url = Some(page_url.to_string());
        self.events.emit(event);
    }
}
