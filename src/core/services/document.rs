// src/core/services/document.rs
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    core::{
        engines::{self, FieldExtractor, OcrEngine, OcrToken},
        identity::{
            quality::{DocumentImage, QualityGate},
            types::{ImageUpload, OcrOutcome},
        },
    },
    storage::artifacts::{ArtifactManager, TransientArtifact},
    utils::{
        config::Config,
        error::{IdGateError, Result},
    },
};

pub struct DocumentService {
    ocr: Arc<dyn OcrEngine>,
    extractor: Arc<dyn FieldExtractor>,
    artifacts: ArtifactManager,
    gate: QualityGate,
    ocr_timeout: Duration,
}

impl DocumentService {
    pub fn new(
        config: &Config,
        ocr: Arc<dyn OcrEngine>,
        extractor: Arc<dyn FieldExtractor>,
        artifacts: ArtifactManager,
    ) -> Self {
        Self {
            ocr,
            extractor,
            artifacts,
            gate: QualityGate::new(config.document.min_sharpness),
            ocr_timeout: config.ocr_timeout(),
        }
    }

    /// Quality-gates the front image, runs OCR on it and scores the result.
    /// The back image is stored for the duration of the request but not read.
    pub async fn extract_document_data(
        &self,
        front: ImageUpload,
        back: ImageUpload,
    ) -> Result<OcrOutcome> {
        let request_id = Uuid::new_v4();
        let span = info_span!("ocr", %request_id);

        async move {
            let started = Instant::now();

            let front = self.artifacts.acquire("id_front", &front)?;
            let back = self.artifacts.acquire("id_back", &back)?;

            let outcome = self.run(&front).await;

            front.release();
            back.release();

            match &outcome {
                Ok(result) => info!(
                    confidence = result.confidence,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "OCR completed"
                ),
                Err(e) => warn!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "OCR rejected: {}", e
                ),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(&self, front: &TransientArtifact) -> Result<OcrOutcome> {
        let path = front.path().to_path_buf();

        let image = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || DocumentImage::load(&path))
                .await
                .map_err(|e| IdGateError::OcrFailed(e.to_string()))??
        };
        debug!(sharpness = image.sharpness, "Measured document sharpness");
        self.gate.check(&image)?;

        let ocr = self.ocr.clone();
        let tokens = engines::guarded(self.ocr_timeout, async move { ocr.recognize(&path).await })
            .await
            .map_err(|e| IdGateError::OcrFailed(e.to_string()))?;

        let confidence = aggregate_confidence(&tokens).ok_or(IdGateError::NoTextDetected)?;
        let fields = self.extractor.extract(&tokens);

        Ok(OcrOutcome { fields, confidence })
    }
}

/// Mean confidence of the detected tokens scaled to `[0, 1]`, or `None`
/// when every token carries the no-detection sentinel.
pub fn aggregate_confidence(tokens: &[OcrToken]) -> Option<f64> {
    let valid: Vec<f64> = tokens
        .iter()
        .filter(|token| token.is_detected())
        .map(|token| token.confidence)
        .collect();

    if valid.is_empty() {
        return None;
    }

    let mean = valid.iter().sum::<f64>() / valid.len() as f64;
    Some((mean / 100.0).clamp(0.0, 1.0))
}
