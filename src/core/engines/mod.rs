// src/core/engines/mod.rs
//! Ports for the external face comparison and OCR engines.

pub mod remote;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub use remote::{RemoteFaceComparator, RemoteOcrEngine};

/// Confidence value the OCR engine reports for boxes without recognized text.
pub const NO_DETECTION: f64 = -1.0;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Face could not be detected in {0}")]
    NoFace(String),

    #[error("{0}")]
    Rejected(String),

    #[error("engine call timed out after {0:?}")]
    Timeout(Duration),

    #[error("engine call crashed: {0}")]
    Crashed(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid engine response: {0}")]
    InvalidResponse(String),
}

/// Result of comparing two face images.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceComparison {
    /// Native comparator distance, lower is more similar.
    pub distance: f64,
    /// The comparator's own same-person verdict.
    pub verified: bool,
}

/// Screening view of a single comparison attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonOutcome {
    Match,
    NoMatch,
    /// The comparator could not decide, e.g. no face in the reference image.
    Indeterminate(String),
}

impl ComparisonOutcome {
    pub fn classify(result: &Result<FaceComparison, EngineError>) -> Self {
        match result {
            Ok(comparison) if comparison.verified => ComparisonOutcome::Match,
            Ok(_) => ComparisonOutcome::NoMatch,
            Err(e) => ComparisonOutcome::Indeterminate(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrToken {
    pub text: String,
    /// Percentage in `[0, 100]`, or [`NO_DETECTION`].
    pub confidence: f64,
}

impl OcrToken {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.confidence.is_finite() && self.confidence >= 0.0
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FaceComparator: Send + Sync {
    async fn compare(&self, first: &Path, second: &Path) -> Result<FaceComparison, EngineError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &Path) -> Result<Vec<OcrToken>, EngineError>;
}

/// Document-format specific field extraction from recognized tokens.
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, tokens: &[OcrToken]) -> BTreeMap<String, String>;
}

/// Produces the field names every document carries, all left blank.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlankFieldExtractor;

impl FieldExtractor for BlankFieldExtractor {
    fn extract(&self, _tokens: &[OcrToken]) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("name".to_string(), String::new()),
            ("idNumber".to_string(), String::new()),
        ])
    }
}

/// Runs an engine call on its own task with a deadline. A panic inside the
/// engine surfaces as [`EngineError::Crashed`]; on timeout the task is aborted.
pub async fn guarded<T, F>(timeout: Duration, call: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(call);
    let abort = handle.abort_handle();

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            warn!("Engine task failed: {}", join_error);
            Err(EngineError::Crashed(join_error.to_string()))
        }
        Err(_) => {
            abort.abort();
            Err(EngineError::Timeout(timeout))
        }
    }
}
