//! API server — HTTP router plus the side-channel metrics exporter.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use adserve_core::event_bus::EventSink;
use adserve_core::AppConfig;
use adserve_delivery::{AdService, AdStore, EventRecorder, SelectionEngine};
use adserve_platform::TenantDirectory;
use adserve_reporting::AnalyticsAggregator;

use crate::rest::{self, AppState};

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(
        config: AppConfig,
        directory: Arc<TenantDirectory>,
        store: Arc<AdStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let state = AppState {
            directory,
            service: Arc::new(AdService::new(store.clone(), events.clone())),
            selection: Arc::new(SelectionEngine::new(store.clone())),
            recorder: Arc::new(EventRecorder::new(store.clone(), events)),
            analytics: Arc::new(AnalyticsAggregator::new(store, config.engine.top_ads_limit)),
            default_selection_limit: config.engine.default_selection_limit,
            start_time: Instant::now(),
        };
        Self { config, state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            // Serving and tracking
            .route(
                "/api/v1/tenants/{tenant_id}/placements/{placement}/ads",
                get(rest::serve_ads),
            )
            .route(
                "/api/v1/tenants/{tenant_id}/ads/{id}/impressions",
                post(rest::track_impression),
            )
            .route(
                "/api/v1/tenants/{tenant_id}/ads/{id}/clicks",
                post(rest::track_click),
            )
            // Admin
            .route(
                "/api/v1/tenants/{tenant_id}/ads",
                get(rest::list_ads).post(rest::create_ad),
            )
            .route(
                "/api/v1/tenants/{tenant_id}/ads/{id}",
                get(rest::get_ad).put(rest::update_ad).delete(rest::delete_ad),
            )
            .route(
                "/api/v1/tenants/{tenant_id}/ads/{id}/toggle",
                post(rest::toggle_ad),
            )
            // Analytics
            .route(
                "/api/v1/tenants/{tenant_id}/analytics",
                get(rest::analytics_report),
            )
            // Tenants
            .route(
                "/api/v1/tenants",
                get(rest::list_tenants).post(rest::create_tenant),
            )
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the HTTP server. Runs until the listener fails.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router();
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the Prometheus exporter on its own port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}
