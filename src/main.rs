use std::sync::Arc;

use anyhow::Context;
use idgate::{
    core::engines::{
        remote::{RemoteFaceComparator, RemoteOcrEngine},
        BlankFieldExtractor,
    },
    utils::{config::Config, logging},
    Application, Engines,
};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::new().context("Failed to load configuration")?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = logging::init(&config.logging).context("Failed to initialize logging")?;

    info!("Starting IdGate v{}", env!("CARGO_PKG_VERSION"));

    let engines = Engines {
        face: Arc::new(
            RemoteFaceComparator::new(config.engines.face_url.clone(), config.engine_timeout())
                .context("Failed to build face comparison client")?,
        ),
        ocr: Arc::new(
            RemoteOcrEngine::new(config.engines.ocr_url.clone(), config.ocr_timeout())
                .context("Failed to build OCR client")?,
        ),
        extractor: Arc::new(BlankFieldExtractor),
    };

    let app = Application::new(config, engines).map_err(|e| {
        error!("Failed to initialize application: {}", e);
        e
    })?;

    // Runs until the server receives a shutdown signal
    if let Err(e) = app.start().await {
        error!("Server error: {}", e);
    }

    if let Err(e) = app.shutdown().await {
        error!("Error during shutdown: {}", e);
    }

    Ok(())
}
