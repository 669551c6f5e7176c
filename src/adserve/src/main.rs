//! AdServe — embedded ad-serving engine for multi-tenant content platforms.
//!
//! Main entry point that wires the stores and services and starts the server.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use adserve_api::ApiServer;
use adserve_core::config::AppConfig;
use adserve_core::event_bus::noop_sink;
use adserve_core::types::AdType;
use adserve_delivery::{AdService, AdStore, CreateAdRequest};
use adserve_platform::TenantDirectory;

#[derive(Parser, Debug)]
#[command(name = "adserve")]
#[command(about = "Embedded ad-serving engine for multi-tenant content platforms")]
#[command(version)]
struct Cli {
    /// Bind host (overrides config)
    #[arg(long, env = "ADSERVE__API__HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "ADSERVE__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Metrics port (overrides config)
    #[arg(long, env = "ADSERVE__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Seed demo tenants and ads for local development
    #[arg(long, default_value_t = false)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adserve=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("AdServe starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }

    info!(
        host = %config.api.host,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        "Configuration loaded"
    );

    let directory = Arc::new(TenantDirectory::new());
    let store = Arc::new(AdStore::new());
    let events = noop_sink();

    if cli.seed_demo {
        seed_demo(&directory, &store, &events)?;
    }

    let api_server = ApiServer::new(config, directory, store, events);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("AdServe is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}

fn seed_demo(
    directory: &TenantDirectory,
    store: &Arc<AdStore>,
    events: &Arc<dyn adserve_core::event_bus::EventSink>,
) -> anyhow::Result<()> {
    let tenants = directory.seed_demo_tenants();
    let service = AdService::new(store.clone(), events.clone());
    let tenant = &tenants[0];

    service.create_ad(
        tenant.id,
        CreateAdRequest {
            title: "Demo banner".into(),
            description: Some("Seeded for local development".into()),
            ad_type: AdType::Banner,
            placement: "header".into(),
            content: serde_json::json!({
                "image_url": "https://cdn.example.com/demo-banner.png",
                "link_url": "https://example.com/jobs",
                "alt_text": "Now hiring",
            }),
            targeting: None,
            is_active: None,
            priority: Some(5),
            start_date: None,
            end_date: None,
            max_impressions: None,
            max_clicks: None,
        },
        None,
    )?;
    service.create_ad(
        tenant.id,
        CreateAdRequest {
            title: "Demo sidebar".into(),
            description: None,
            ad_type: AdType::Sidebar,
            placement: "sidebar".into(),
            content: serde_json::json!({
                "html": "<div class=\"promo\">Subscribe today</div>",
            }),
            targeting: None,
            is_active: None,
            priority: None,
            start_date: None,
            end_date: None,
            max_impressions: None,
            max_clicks: None,
        },
        None,
    )?;

    info!(tenant_id = %tenant.id, "Demo data seeded");
    Ok(())
}
