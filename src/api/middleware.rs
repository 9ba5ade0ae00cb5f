// src/api/middleware.rs
use std::time::Instant;

use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web::Data,
    Error,
};
use tracing::{info, warn};

use crate::utils::metrics::Metrics;

const HEALTH_PATH: &str = "/health";

/// Logs every request with its status and latency and feeds the request
/// counters. Health probes are neither logged nor counted.
pub async fn request_logger(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let metrics = req.app_data::<Data<Metrics>>().cloned();
    let method = req.method().clone();
    let path = req.path().to_string();
    let started = Instant::now();

    let response = next.call(req).await?;

    if path != HEALTH_PATH {
        let elapsed = started.elapsed();
        let status = response.status();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;

        if status.is_server_error() {
            warn!(%method, %path, status = status.as_u16(), elapsed_ms, "Request failed");
        } else {
            info!(%method, %path, status = status.as_u16(), elapsed_ms, "Request handled");
        }

        if let Some(metrics) = metrics {
            metrics.record_request(elapsed, !(status.is_client_error() || status.is_server_error()));
        }
    }

    Ok(response)
}
