// src/core/services/health.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    storage::{blacklist::BlacklistStore, registry::RegistrationStore},
    utils::{error::Result, metrics::Metrics},
};

pub struct HealthService {
    started_at: DateTime<Utc>,
    metrics: Arc<Metrics>,
    registry: Arc<dyn RegistrationStore>,
    blacklist: Arc<BlacklistStore>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub status: &'static str,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub processed_requests: u64,
    pub failed_requests: u64,
    pub avg_processing_micros: u64,
    pub registered_users: usize,
    pub blacklist_entries: usize,
}

impl HealthService {
    pub fn new(
        metrics: Arc<Metrics>,
        registry: Arc<dyn RegistrationStore>,
        blacklist: Arc<BlacklistStore>,
    ) -> Self {
        Self {
            started_at: Utc::now(),
            metrics,
            registry,
            blacklist,
        }
    }

    pub async fn get_metrics(&self) -> Result<HealthMetrics> {
        let snapshot = self.metrics.snapshot();
        Ok(HealthMetrics {
            status: "ok",
            started_at: self.started_at,
            uptime_secs: snapshot.uptime.as_secs(),
            processed_requests: snapshot.requests_total,
            failed_requests: snapshot.requests_failed,
            avg_processing_micros: snapshot.avg_processing_micros,
            registered_users: self.registry.count().await?,
            blacklist_entries: self.blacklist.len(),
        })
    }
}
