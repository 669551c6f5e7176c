use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::AdContent;

// ─── Ad ────────────────────────────────────────────────────────────────────

/// Rendering slot variant for an ad. Determines which content schema applies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AdType {
    Banner,
    Popup,
    Sidebar,
    Inline,
    Video,
}

impl AdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdType::Banner => "banner",
            AdType::Popup => "popup",
            AdType::Sidebar => "sidebar",
            AdType::Inline => "inline",
            AdType::Video => "video",
        }
    }
}

/// Derived lifecycle state. Never set directly: always recomputed from the
/// ad's flags, counters, and scheduling window via [`Ad::derived_status`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AdStatus {
    Active,
    Paused,
    Scheduled,
    Expired,
    Completed,
}

/// Optional targeting rules. An absent block matches every request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Targeting {
    /// Shell-glob URL patterns (`*`, `?`). When present this rule is
    /// evaluated exclusively: the other fields are skipped entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

/// One advertisement: configuration, targeting, scheduling, limits, and
/// running counters. Tenant-scoped; ads never cross tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ad {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub ad_type: AdType,
    /// Free-form slot key ("header", "sidebar", "footer", "inline", ...).
    pub placement: String,
    pub content: AdContent,
    #[serde(default)]
    pub targeting: Option<Targeting>,
    pub is_active: bool,
    /// Higher values are preferred in selection ordering.
    pub priority: i32,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_impressions: Option<u64>,
    #[serde(default)]
    pub max_clicks: Option<u64>,
    pub current_impressions: u64,
    pub current_clicks: u64,
    /// Clicks per impression as a percentage, rounded to 2 decimals.
    pub click_rate: f64,
    pub status: AdStatus,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ad {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_date.is_some_and(|end| end < now)
    }

    pub fn is_scheduled(&self, now: DateTime<Utc>) -> bool {
        self.start_date.is_some_and(|start| start > now)
    }

    pub fn has_reached_impression_limit(&self) -> bool {
        self.max_impressions
            .is_some_and(|max| self.current_impressions >= max)
    }

    pub fn has_reached_click_limit(&self) -> bool {
        self.max_clicks.is_some_and(|max| self.current_clicks >= max)
    }

    /// Whether selection may return this ad right now.
    pub fn can_be_displayed(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.status == AdStatus::Active
            && !self.is_expired(now)
            && !self.has_reached_impression_limit()
            && !self.has_reached_click_limit()
            && !self.is_scheduled(now)
    }

    /// Pure status computation. Precedence: expired, then completed (either
    /// limit reached), then scheduled, then active/paused per `is_active`.
    pub fn derived_status(&self, now: DateTime<Utc>) -> AdStatus {
        if self.is_expired(now) {
            AdStatus::Expired
        } else if self.has_reached_impression_limit() || self.has_reached_click_limit() {
            AdStatus::Completed
        } else if self.is_scheduled(now) {
            AdStatus::Scheduled
        } else if self.is_active {
            AdStatus::Active
        } else {
            AdStatus::Paused
        }
    }

    /// Recompute `click_rate` and `status` from the underlying fields.
    ///
    /// Every write path that touches counters, `is_active`, or dates must
    /// call this before persisting, so the stored values never drift from
    /// the pure computation.
    pub fn recompute_derived(&mut self, now: DateTime<Utc>) {
        self.click_rate = click_rate(self.current_clicks, self.current_impressions);
        self.status = self.derived_status(now);
    }
}

/// `clicks / impressions * 100`, rounded to 2 decimals; 0 when there are no
/// impressions.
pub fn click_rate(clicks: u64, impressions: u64) -> f64 {
    if impressions == 0 {
        return 0.0;
    }
    let rate = clicks as f64 / impressions as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

// ─── Event rows ────────────────────────────────────────────────────────────

/// Browser/device classification derived from the user agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub is_mobile: bool,
    pub is_tablet: bool,
    pub is_desktop: bool,
    pub browser: String,
    pub os: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationInfo {
    pub ip: String,
    pub country: Option<String>,
    pub city: Option<String>,
    pub timezone: String,
}

/// One recorded render of an ad. Append-only: never mutated once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdImpression {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub ad_id: Uuid,
    pub ip_address: String,
    pub user_agent: String,
    pub page_url: String,
    pub referrer: Option<String>,
    pub device: DeviceInfo,
    pub location: LocationInfo,
    pub viewed_at: DateTime<Utc>,
}

/// One recorded click-through. Optionally linked to the originating
/// impression. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdClick {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub ad_id: Uuid,
    pub impression_id: Option<Uuid>,
    pub ip_address: String,
    pub user_agent: String,
    pub page_url: String,
    pub click_url: Option<String>,
    pub device: DeviceInfo,
    pub location: LocationInfo,
    pub clicked_at: DateTime<Utc>,
}

// ─── Request context ───────────────────────────────────────────────────────

/// Page context a selection request carries into targeting evaluation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Current URL path, e.g. "/jobs/123".
    pub url: String,
    pub post_type: Option<String>,
    pub categories: Option<Vec<String>>,
}

/// Request metadata captured when recording impressions and clicks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMeta {
    pub ip_address: String,
    pub user_agent: String,
    pub page_url: String,
    #[serde(default)]
    pub referrer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::AdContent;
    use chrono::Duration;

    fn base_ad(now: DateTime<Utc>) -> Ad {
        Ad {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            title: "Test".into(),
            description: None,
            ad_type: AdType::Sidebar,
            placement: "sidebar".into(),
            content: AdContent::Sidebar {
                html: "<b>hi</b>".into(),
                css: None,
                js: None,
            },
            targeting: None,
            is_active: true,
            priority: 0,
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
        }
    }

    #[test]
    fn test_click_rate_rounding() {
        assert_eq!(click_rate(0, 0), 0.0);
        assert_eq!(click_rate(1, 3), 33.33);
        assert_eq!(click_rate(2, 3), 66.67);
        assert_eq!(click_rate(1, 1), 100.0);
    }

    #[test]
    fn test_derived_status_precedence() {
        let now = Utc::now();
        let mut ad = base_ad(now);
        assert_eq!(ad.derived_status(now), AdStatus::Active);

        ad.is_active = false;
        assert_eq!(ad.derived_status(now), AdStatus::Paused);

        // Scheduled beats paused.
        ad.start_date = Some(now + Duration::days(1));
        assert_eq!(ad.derived_status(now), AdStatus::Scheduled);

        // Completed beats scheduled.
        ad.max_impressions = Some(10);
        ad.current_impressions = 10;
        assert_eq!(ad.derived_status(now), AdStatus::Completed);

        // Expired beats everything.
        ad.end_date = Some(now - Duration::hours(1));
        assert_eq!(ad.derived_status(now), AdStatus::Expired);
    }

    #[test]
    fn test_completed_survives_reactivation() {
        let now = Utc::now();
        let mut ad = base_ad(now);
        ad.max_impressions = Some(2);
        ad.current_impressions = 2;
        ad.recompute_derived(now);
        assert_eq!(ad.status, AdStatus::Completed);

        // Toggling the flag back on never resurrects a completed ad.
        ad.is_active = true;
        ad.recompute_derived(now);
        assert_eq!(ad.status, AdStatus::Completed);
        assert!(!ad.can_be_displayed(now));
    }

    #[test]
    fn test_recompute_keeps_rate_consistent() {
        let now = Utc::now();
        let mut ad = base_ad(now);
        ad.current_impressions = 3;
        ad.current_clicks = 1;
        ad.recompute_derived(now);
        assert_eq!(ad.click_rate, 33.33);
        assert_eq!(ad.status, ad.derived_status(now));
    }
}
