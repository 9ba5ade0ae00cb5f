pub mod api;
pub mod core;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use actix_web::{middleware::from_fn, web, App, HttpServer};
use tracing::{info, warn};

use crate::{
    api::multipart::UploadLimits,
    core::{
        engines::{FaceComparator, FieldExtractor, OcrEngine},
        services::{
            document::DocumentService, health::HealthService, review::ReviewService,
            verification::VerificationService,
        },
    },
    storage::{
        artifacts::ArtifactManager,
        blacklist::BlacklistStore,
        registry::{MemoryRegistry, RegistrationStore},
    },
    utils::{
        config::Config,
        error::{IdGateError, Result},
        metrics::Metrics,
    },
};

/// External engines the pipelines delegate to.
pub struct Engines {
    pub face: Arc<dyn FaceComparator>,
    pub ocr: Arc<dyn OcrEngine>,
    pub extractor: Arc<dyn FieldExtractor>,
}

pub struct Application {
    config: Arc<Config>,
    metrics: Arc<Metrics>,
    artifacts: ArtifactManager,
    registry: Arc<dyn RegistrationStore>,
    blacklist: Arc<BlacklistStore>,
    verification_service: Arc<VerificationService>,
    document_service: Arc<DocumentService>,
    review_service: Arc<ReviewService>,
    health_service: Arc<HealthService>,
}

impl Application {
    /// Builds the application with an in-memory registry and the blacklist
    /// found in `config.blacklist.dir`.
    pub fn new(config: Config, engines: Engines) -> Result<Self> {
        info!("Loading blacklist...");
        let blacklist = Arc::new(BlacklistStore::load_dir(&config.blacklist.dir)?);
        Self::with_stores(config, engines, Arc::new(MemoryRegistry::new()), blacklist)
    }

    pub fn with_stores(
        config: Config,
        engines: Engines,
        registry: Arc<dyn RegistrationStore>,
        blacklist: Arc<BlacklistStore>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        info!("Preparing artifact directory {}", config.artifacts.dir.display());
        let artifacts = ArtifactManager::new(config.artifacts.dir.clone())?;
        let metrics = Arc::new(Metrics::new());

        info!("Initializing services...");
        let verification_service = Arc::new(VerificationService::new(
            &config,
            registry.clone(),
            blacklist.clone(),
            engines.face,
            artifacts.clone(),
        ));
        let document_service = Arc::new(DocumentService::new(
            &config,
            engines.ocr,
            engines.extractor,
            artifacts.clone(),
        ));
        let review_service = Arc::new(ReviewService::new(
            &config,
            document_service.clone(),
            verification_service.clone(),
        ));
        let health_service = Arc::new(HealthService::new(
            metrics.clone(),
            registry.clone(),
            blacklist.clone(),
        ));

        Ok(Self {
            config,
            metrics,
            artifacts,
            registry,
            blacklist,
            verification_service,
            document_service,
            review_service,
            health_service,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn artifacts(&self) -> &ArtifactManager {
        &self.artifacts
    }

    pub fn registry(&self) -> Arc<dyn RegistrationStore> {
        self.registry.clone()
    }

    pub fn blacklist(&self) -> Arc<BlacklistStore> {
        self.blacklist.clone()
    }

    pub fn verification_service(&self) -> Arc<VerificationService> {
        self.verification_service.clone()
    }

    pub fn document_service(&self) -> Arc<DocumentService> {
        self.document_service.clone()
    }

    /// Registers app data and routes; shared by the server and tests.
    pub fn routes(&self) -> impl Fn(&mut web::ServiceConfig) + Clone + Send + 'static {
        use crate::api::handlers;

        let verification_service = self.verification_service.clone();
        let document_service = self.document_service.clone();
        let review_service = self.review_service.clone();
        let health_service = self.health_service.clone();
        let metrics = self.metrics.clone();
        let limits = UploadLimits {
            max_upload_bytes: self.config.server.max_upload_bytes,
        };

        move |cfg: &mut web::ServiceConfig| {
            cfg.app_data(web::Data::from(verification_service.clone()))
                .app_data(web::Data::from(document_service.clone()))
                .app_data(web::Data::from(review_service.clone()))
                .app_data(web::Data::from(health_service.clone()))
                .app_data(web::Data::from(metrics.clone()))
                .app_data(web::Data::new(limits))
                .service(handlers::verification::resource())
                .service(handlers::document::resource())
                .service(handlers::review::resource())
                .service(handlers::health::resource());
        }
    }

    pub async fn start(&self) -> Result<()> {
        let routes = self.routes();
        let (host, port) = (self.config.server.host.clone(), self.config.server.port);

        info!("Starting API server on {}:{}", host, port);
        HttpServer::new(move || {
            App::new()
                .wrap(from_fn(api::middleware::request_logger))
                .configure(routes.clone())
        })
        .workers(self.config.server.workers)
        .bind((host.as_str(), port))
        .map_err(|e| IdGateError::Config(format!("Failed to bind API server: {}", e)))?
        .run()
        .await?;

        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application...");

        let live = self.artifacts.live();
        if live > 0 {
            warn!("{} artifacts still live at shutdown", live);
        }

        info!(
            registered_users = self.registry.count().await?,
            requests = self.metrics.snapshot().requests_total,
            "Application shutdown complete"
        );
        Ok(())
    }
}
