// src/api/handlers/health.rs
use actix_web::{
    web::{self, Data},
    HttpResponse, Resource,
};

use crate::{core::services::health::HealthService, utils::error::IdGateError};

pub fn resource() -> Resource {
    web::resource("/health").route(web::get().to(health))
}

async fn health(service: Data<HealthService>) -> Result<HttpResponse, IdGateError> {
    Ok(HttpResponse::Ok().json(service.get_metrics().await?))
}
