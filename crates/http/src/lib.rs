//! HTTP server facade for BookBay services with Axum, error handling, and OpenAPI support.

use anyhow::Context;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use bookbay_kernel::settings::{ServiceSettings, Settings};
use bookbay_kernel::ModuleRegistry;

pub mod error;
pub mod router;

use router::RouterBuilder;

/// Liveness payload returned by `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: String,
    pub timestamp: String,
}

impl HealthStatus {
    pub fn healthy(service: &str) -> Self {
        Self {
            status: "healthy",
            service: service.to_string(),
            timestamp: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
        }
    }
}

/// Start one service's HTTP server and serve until ctrl-c
pub async fn start_server(
    registry: &ModuleRegistry,
    service: &ServiceSettings,
    settings: &Settings,
) -> anyhow::Result<()> {
    let addr = service.bind_addr();
    tracing::info!(service = registry.service(), %addr, "starting HTTP server");

    let app = build_router(registry, settings);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!(
        service = registry.service(),
        "HTTP server listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry.service()))
        .await
        .context("HTTP server failed")?;

    tracing::info!(service = registry.service(), "HTTP server stopped");
    Ok(())
}

/// Build a service router with every registered module mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> Router {
    let service_name = registry.service();
    let mut router_builder = RouterBuilder::new().route(
        "/health",
        get(move || async move { Json(HealthStatus::healthy(service_name)) }),
    );

    for module in registry.modules() {
        let module_name = module.name();
        tracing::info!(
            module = module_name,
            "mounting module routes under /api/{}",
            module_name
        );
        router_builder = router_builder.mount_module(module_name, module.routes());
    }

    router_builder
        .with_openapi(registry)
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms)
        .build()
}

async fn shutdown_signal(service: &'static str) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!(service, "shutdown signal received");
}
