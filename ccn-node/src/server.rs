//! `api` subcommand: a minimal health-only HTTP surface (spec.md §13
//! Non-goals excludes the REST API's business routes, but the ambient
//! health/metrics surface is carried per spec.md §12). Grounded on the
//! teacher's `launcher::launch`'s `http_serve` internals
//! (`HttpServer::new().bind().run()`), without its generic gRPC dispatch:
//! this core has no generated health proto to hand it, so the HTTP half is
//! driven directly instead of through `blockscout_service_launcher::launcher`.

use actix_web::{web, App, HttpResponse, HttpServer};
use prometheus::{Encoder, TextEncoder};

use crate::settings::Settings;

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "SERVING"}))
}

async fn metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %err, "failed to encode prometheus metrics");
        return HttpResponse::InternalServerError().finish();
    }
    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

pub async fn run(settings: Settings) -> Result<(), anyhow::Error> {
    let mut servers = Vec::new();

    if settings.server.http.enabled {
        let addr = settings.server.http.addr;
        tracing::info!(%addr, "starting http server");
        let http = HttpServer::new(|| App::new().route("/health", web::get().to(health)))
            .bind(addr)?
            .run();
        servers.push(tokio::spawn(async move { http.await.map_err(anyhow::Error::from) }));
    }

    if settings.metrics.enabled {
        let addr = settings.metrics.addr;
        let route = settings.metrics.route.clone();
        tracing::info!(%addr, route, "starting metrics server");
        let metrics_server = HttpServer::new(move || App::new().route(&route, web::get().to(metrics)))
            .bind(addr)?
            .run();
        servers.push(tokio::spawn(
            async move { metrics_server.await.map_err(anyhow::Error::from) },
        ));
    }

    if servers.is_empty() {
        tracing::warn!("api subcommand started with both http and metrics servers disabled");
        return Ok(());
    }

    let (result, _, others) = futures::future::select_all(servers).await;
    for other in others {
        other.abort();
    }
    result?
}
