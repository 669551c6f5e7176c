//! Trend and summary statistics over ads, impressions, and clicks.
//!
//! Strictly read-only: nothing here ever mutates an ad or an event row.
//!
//! Date filters apply twice, to two different things: trend series filter on
//! the event timestamps (`viewed_at` / `clicked_at`), while ad-scoped
//! figures (overview, top ads, placement stats) filter on the ad's own
//! `created_at`. The two must not be conflated.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use adserve_core::types::{Ad, AdStatus};
use adserve_delivery::AdStore;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsFilters {
    #[serde(default)]
    pub ad_id: Option<Uuid>,
    #[serde(default)]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_to: Option<DateTime<Utc>>,
}

impl AnalyticsFilters {
    fn in_range(&self, ts: DateTime<Utc>) -> bool {
        self.date_from.map_or(true, |from| ts >= from)
            && self.date_to.map_or(true, |to| ts <= to)
    }

    fn includes_ad(&self, ad: &Ad) -> bool {
        self.ad_id.map_or(true, |id| ad.id == id) && self.in_range(ad.created_at)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsOverview {
    pub total_ads: u64,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub avg_click_rate: f64,
    pub active_ads: u64,
    pub paused_ads: u64,
    pub scheduled_ads: u64,
    pub expired_ads: u64,
    pub completed_ads: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DailyTrendPoint {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopAdEntry {
    pub ad_id: Uuid,
    pub title: String,
    pub placement: String,
    pub impressions: u64,
    pub clicks: u64,
    pub click_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacementStats {
    pub placement: String,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub avg_click_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourlyPoint {
    pub hour: u32,
    pub impressions: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageCount {
    pub page_url: String,
    pub impressions: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClickUrlCount {
    pub click_url: String,
    pub clicks: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub overview: AnalyticsOverview,
    pub impression_trends: Vec<DailyTrendPoint>,
    pub click_trends: Vec<DailyTrendPoint>,
    pub top_ads: Vec<TopAdEntry>,
    pub placement_stats: Vec<PlacementStats>,
    pub generated_at: DateTime<Utc>,
}

pub struct AnalyticsAggregator {
    store: Arc<AdStore>,
    top_ads_limit: usize,
}

impl AnalyticsAggregator {
    pub fn new(store: Arc<AdStore>, top_ads_limit: usize) -> Self {
        Self {
            store,
            top_ads_limit,
        }
    }

    pub fn report(&self, tenant_id: Uuid, filters: &AnalyticsFilters) -> AnalyticsReport {
        let ads: Vec<Ad> = self
            .store
            .list_ads(tenant_id)
            .into_iter()
            .filter(|ad| filters.includes_ad(ad))
            .collect();

        let report = AnalyticsReport {
            overview: overview(&ads),
            impression_trends: self.impression_trends(tenant_id, filters),
            click_trends: self.click_trends(tenant_id, filters),
            top_ads: top_ads(&ads, self.top_ads_limit),
            placement_stats: placement_stats(&ads),
            generated_at: Utc::now(),
        };
        debug!(
            tenant_id = %tenant_id,
            ads_in_scope = report.overview.total_ads,
            "analytics report generated"
        );
        report
    }

    /// Daily impression counts, bucketed by calendar date of `viewed_at`.
    fn impression_trends(&self, tenant_id: Uuid, filters: &AnalyticsFilters) -> Vec<DailyTrendPoint> {
        daily_buckets(
            self.store
                .list_impressions(tenant_id)
                .into_iter()
                .filter(|i| filters.ad_id.map_or(true, |id| i.ad_id == id))
                .filter(|i| filters.in_range(i.viewed_at))
                .map(|i| i.viewed_at),
        )
    }

    /// Daily click counts, bucketed by calendar date of `clicked_at`.
    fn click_trends(&self, tenant_id: Uuid, filters: &AnalyticsFilters) -> Vec<DailyTrendPoint> {
        daily_buckets(
            self.store
                .list_clicks(tenant_id)
                .into_iter()
                .filter(|c| filters.ad_id.map_or(true, |id| c.ad_id == id))
                .filter(|c| filters.in_range(c.clicked_at))
                .map(|c| c.clicked_at),
        )
    }

    /// Impression count per hour-of-day for one calendar date.
    pub fn hourly_impressions(
        &self,
        tenant_id: Uuid,
        ad_id: Option<Uuid>,
        date: NaiveDate,
    ) -> Vec<HourlyPoint> {
        use chrono::Timelike;
        let mut buckets: BTreeMap<u32, u64> = BTreeMap::new();
        for impression in self.store.list_impressions(tenant_id) {
            if ad_id.map_or(true, |id| impression.ad_id == id)
                && impression.viewed_at.date_naive() == date
            {
                *buckets.entry(impression.viewed_at.hour()).or_insert(0) += 1;
            }
        }
        buckets
            .into_iter()
            .map(|(hour, impressions)| HourlyPoint { hour, impressions })
            .collect()
    }

    /// Pages that rendered the most impressions.
    pub fn top_pages(&self, tenant_id: Uuid, ad_id: Option<Uuid>, limit: usize) -> Vec<PageCount> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for impression in self.store.list_impressions(tenant_id) {
            if ad_id.map_or(true, |id| impression.ad_id == id) {
                *counts.entry(impression.page_url).or_insert(0) += 1;
            }
        }
        let mut pages: Vec<PageCount> = counts
            .into_iter()
            .map(|(page_url, impressions)| PageCount {
                page_url,
                impressions,
            })
            .collect();
        pages.sort_by(|a, b| b.impressions.cmp(&a.impressions).then(a.page_url.cmp(&b.page_url)));
        pages.truncate(limit);
        pages
    }

    /// Destination URLs that drew the most clicks. Clicks without a
    /// destination are skipped.
    pub fn top_click_urls(
        &self,
        tenant_id: Uuid,
        ad_id: Option<Uuid>,
        limit: usize,
    ) -> Vec<ClickUrlCount> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for click in self.store.list_clicks(tenant_id) {
            if ad_id.map_or(true, |id| click.ad_id == id) {
                if let Some(url) = click.click_url {
                    *counts.entry(url).or_insert(0) += 1;
                }
            }
        }
        let mut urls: Vec<ClickUrlCount> = counts
            .into_iter()
            .map(|(click_url, clicks)| ClickUrlCount { click_url, clicks })
            .collect();
        urls.sort_by(|a, b| b.clicks.cmp(&a.clicks).then(a.click_url.cmp(&b.click_url)));
        urls.truncate(limit);
        urls
    }
}

fn overview(ads: &[Ad]) -> AnalyticsOverview {
    let count_status =
        |status: AdStatus| ads.iter().filter(|a| a.status == status).count() as u64;
    let avg_click_rate = if ads.is_empty() {
        0.0
    } else {
        ads.iter().map(|a| a.click_rate).sum::<f64>() / ads.len() as f64
    };

    AnalyticsOverview {
        total_ads: ads.len() as u64,
        total_impressions: ads.iter().map(|a| a.current_impressions).sum(),
        total_clicks: ads.iter().map(|a| a.current_clicks).sum(),
        avg_click_rate,
        active_ads: count_status(AdStatus::Active),
        paused_ads: count_status(AdStatus::Paused),
        scheduled_ads: count_status(AdStatus::Scheduled),
        expired_ads: count_status(AdStatus::Expired),
        completed_ads: count_status(AdStatus::Completed),
    }
}

fn top_ads(ads: &[Ad], limit: usize) -> Vec<TopAdEntry> {
    let mut entries: Vec<TopAdEntry> = ads
        .iter()
        .map(|ad| TopAdEntry {
            ad_id: ad.id,
            title: ad.title.clone(),
            placement: ad.placement.clone(),
            impressions: ad.current_impressions,
            clicks: ad.current_clicks,
            click_rate: ad.click_rate,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.click_rate
            .partial_cmp(&a.click_rate)
            .unwrap_or(Ordering::Equal)
            .then(b.clicks.cmp(&a.clicks))
            .then(a.ad_id.cmp(&b.ad_id))
    });
    entries.truncate(limit);
    entries
}

fn placement_stats(ads: &[Ad]) -> Vec<PlacementStats> {
    let mut groups: BTreeMap<&str, Vec<&Ad>> = BTreeMap::new();
    for ad in ads {
        groups.entry(ad.placement.as_str()).or_default().push(ad);
    }
    groups
        .into_iter()
        .map(|(placement, group)| PlacementStats {
            placement: placement.to_string(),
            total_impressions: group.iter().map(|a| a.current_impressions).sum(),
            total_clicks: group.iter().map(|a| a.current_clicks).sum(),
            avg_click_rate: group.iter().map(|a| a.click_rate).sum::<f64>() / group.len() as f64,
        })
        .collect()
}

fn daily_buckets(timestamps: impl Iterator<Item = DateTime<Utc>>) -> Vec<DailyTrendPoint> {
    let mut buckets: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for ts in timestamps {
        *buckets.entry(ts.date_naive()).or_insert(0) += 1;
    }
    buckets
        .into_iter()
        .map(|(date, count)| DailyTrendPoint { date, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use adserve_core::event_bus::noop_sink;
    use adserve_core::types::{AdType, RequestMeta};
    use adserve_delivery::{AdService, CreateAdRequest, EventRecorder};
    use serde_json::json;

    fn setup() -> (Arc<AdStore>, AdService, EventRecorder, AnalyticsAggregator) {
        let store = Arc::new(AdStore::new());
        let service = AdService::new(store.clone(), noop_sink());
        let recorder = EventRecorder::new(store.clone(), noop_sink());
        let aggregator = AnalyticsAggregator::new(store.clone(), 10);
        (store, service, recorder, aggregator)
    }

    fn create_ad(service: &AdService, tenant: Uuid, placement: &str) -> Uuid {
        service
            .create_ad(
                tenant,
                CreateAdRequest {
                    title: format!("{placement} ad"),
                    description: None,
                    ad_type: AdType::Sidebar,
                    placement: placement.into(),
                    content: json!({"html": "<b>x</b>"}),
                    targeting: None,
                    is_active: None,
                    priority: None,
                    start_date: None,
                    end_date: None,
                    max_impressions: None,
                    max_clicks: None,
                },
                None,
            )
            .unwrap()
            .id
    }

    fn meta(page: &str) -> RequestMeta {
        RequestMeta {
            ip_address: "198.51.100.7".into(),
            user_agent: "Mozilla/5.0 Chrome/120.0".into(),
            page_url: page.into(),
            referrer: None,
        }
    }

    #[test]
    fn test_overview_sums_and_status_breakdown() {
        let (_, service, recorder, aggregator) = setup();
        let tenant = Uuid::new_v4();
        let a = create_ad(&service, tenant, "header");
        let b = create_ad(&service, tenant, "sidebar");
        service
            .update_ad(
                tenant,
                b,
                adserve_delivery::UpdateAdRequest {
                    is_active: Some(false),
                    ..Default::default()
                },
                None,
            )
            .unwrap();

        recorder.record_impression(tenant, a, &meta("/p1")).unwrap();
        recorder.record_impression(tenant, a, &meta("/p1")).unwrap();
        recorder
            .record_click(tenant, a, &meta("/p1"), None, None)
            .unwrap();

        let report = aggregator.report(tenant, &AnalyticsFilters::default());
        assert_eq!(report.overview.total_ads, 2);
        assert_eq!(report.overview.total_impressions, 2);
        assert_eq!(report.overview.total_clicks, 1);
        assert_eq!(report.overview.active_ads, 1);
        assert_eq!(report.overview.paused_ads, 1);
        // One ad at 50.00, one at 0.
        assert_eq!(report.overview.avg_click_rate, 25.0);
    }

    #[test]
    fn test_trends_bucket_by_event_date() {
        let (_, service, recorder, aggregator) = setup();
        let tenant = Uuid::new_v4();
        let ad = create_ad(&service, tenant, "header");
        recorder.record_impression(tenant, ad, &meta("/p1")).unwrap();
        recorder.record_impression(tenant, ad, &meta("/p2")).unwrap();
        recorder
            .record_click(tenant, ad, &meta("/p1"), None, None)
            .unwrap();

        let report = aggregator.report(tenant, &AnalyticsFilters::default());
        let today = Utc::now().date_naive();
        assert_eq!(
            report.impression_trends,
            vec![DailyTrendPoint {
                date: today,
                count: 2
            }]
        );
        assert_eq!(report.click_trends[0].count, 1);
    }

    #[test]
    fn test_event_and_ad_date_filters_are_distinct() {
        let (_, service, recorder, aggregator) = setup();
        let tenant = Uuid::new_v4();
        let ad = create_ad(&service, tenant, "header");
        recorder.record_impression(tenant, ad, &meta("/p1")).unwrap();

        // A window that ends before now excludes both today's events and
        // the ad itself (created now) — via two separate filters.
        let filters = AnalyticsFilters {
            ad_id: None,
            date_from: None,
            date_to: Some(Utc::now() - chrono::Duration::days(1)),
        };
        let report = aggregator.report(tenant, &filters);
        assert_eq!(report.overview.total_ads, 0);
        assert!(report.impression_trends.is_empty());

        // A window covering now includes both.
        let filters = AnalyticsFilters {
            ad_id: None,
            date_from: Some(Utc::now() - chrono::Duration::days(1)),
            date_to: None,
        };
        let report = aggregator.report(tenant, &filters);
        assert_eq!(report.overview.total_ads, 1);
        assert_eq!(report.impression_trends.len(), 1);
    }

    #[test]
    fn test_top_ads_ordering() {
        let (_, service, recorder, aggregator) = setup();
        let tenant = Uuid::new_v4();
        let low = create_ad(&service, tenant, "header");
        let high = create_ad(&service, tenant, "sidebar");

        // low: 2 impressions, 0 clicks → 0.00. high: 2 impressions, 1 click → 50.00.
        for ad in [low, high] {
            recorder.record_impression(tenant, ad, &meta("/p")).unwrap();
            recorder.record_impression(tenant, ad, &meta("/p")).unwrap();
        }
        recorder
            .record_click(tenant, high, &meta("/p"), None, None)
            .unwrap();

        let report = aggregator.report(tenant, &AnalyticsFilters::default());
        assert_eq!(report.top_ads[0].ad_id, high);
        assert_eq!(report.top_ads[0].click_rate, 50.0);
        assert_eq!(report.top_ads[1].ad_id, low);
    }

    #[test]
    fn test_placement_stats_grouping() {
        let (_, service, recorder, aggregator) = setup();
        let tenant = Uuid::new_v4();
        let h1 = create_ad(&service, tenant, "header");
        let h2 = create_ad(&service, tenant, "header");
        let s1 = create_ad(&service, tenant, "sidebar");

        recorder.record_impression(tenant, h1, &meta("/p")).unwrap();
        recorder.record_impression(tenant, h2, &meta("/p")).unwrap();
        recorder.record_impression(tenant, s1, &meta("/p")).unwrap();

        let report = aggregator.report(tenant, &AnalyticsFilters::default());
        assert_eq!(report.placement_stats.len(), 2);
        let header = report
            .placement_stats
            .iter()
            .find(|p| p.placement == "header")
            .unwrap();
        assert_eq!(header.total_impressions, 2);
    }

    #[test]
    fn test_top_pages_and_click_urls() {
        let (_, service, recorder, aggregator) = setup();
        let tenant = Uuid::new_v4();
        let ad = create_ad(&service, tenant, "header");

        recorder.record_impression(tenant, ad, &meta("/jobs")).unwrap();
        recorder.record_impression(tenant, ad, &meta("/jobs")).unwrap();
        recorder.record_impression(tenant, ad, &meta("/about")).unwrap();
        recorder
            .record_click(tenant, ad, &meta("/jobs"), Some("https://x.example/go".into()), None)
            .unwrap();
        recorder
            .record_click(tenant, ad, &meta("/jobs"), None, None)
            .unwrap();

        let pages = aggregator.top_pages(tenant, None, 10);
        assert_eq!(pages[0].page_url, "/jobs");
        assert_eq!(pages[0].impressions, 2);

        let urls = aggregator.top_click_urls(tenant, None, 10);
        // Clicks without a destination url are not counted.
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].clicks, 1);

        let hourly = aggregator.hourly_impressions(tenant, Some(ad), Utc::now().date_naive());
        let total: u64 = hourly.iter().map(|h| h.impressions).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_report_never_mutates() {
        let (store, service, recorder, aggregator) = setup();
        let tenant = Uuid::new_v4();
        let ad = create_ad(&service, tenant, "header");
        recorder.record_impression(tenant, ad, &meta("/p")).unwrap();

        let before = store.get_ad(tenant, ad).unwrap();
        let _ = aggregator.report(tenant, &AnalyticsFilters::default());
        let after = store.get_ad(tenant, ad).unwrap();
        assert_eq!(before.current_impressions, after.current_impressions);
        assert_eq!(before.updated_at, after.updated_at);
        assert_eq!(store.list_impressions(tenant).len(), 1);
    }
}
