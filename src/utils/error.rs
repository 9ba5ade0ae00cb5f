// src/utils/error.rs
use thiserror::Error;

/// Coarse classification used by the HTTP layer and for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed caller input.
    Validation,
    /// Business rule rejection (already registered, blacklisted).
    PolicyRejection,
    /// The face or OCR engine could not process the input.
    EngineFailure,
    /// The document image is not good enough to read.
    QualityRejection,
    /// Configuration, storage or filesystem trouble on our side.
    Internal,
}

#[derive(Debug, Error)]
pub enum IdGateError {
    #[error("{0}")]
    Validation(String),

    #[error("User already registered")]
    AlreadyRegistered,

    #[error("User is blacklisted")]
    Blacklisted,

    #[error("Face match error: {0}")]
    ComparisonFailed(String),

    #[error("Low quality image: blurry")]
    LowQualityImage,

    #[error("No text detected")]
    NoTextDetected,

    #[error("Failed to load image")]
    FailedToLoadImage,

    #[error("OCR processing error: {0}")]
    OcrFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IdGateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdGateError::Validation(_) => ErrorKind::Validation,
            IdGateError::AlreadyRegistered | IdGateError::Blacklisted => {
                ErrorKind::PolicyRejection
            }
            IdGateError::ComparisonFailed(_)
            | IdGateError::NoTextDetected
            | IdGateError::FailedToLoadImage
            | IdGateError::OcrFailed(_) => ErrorKind::EngineFailure,
            IdGateError::LowQualityImage => ErrorKind::QualityRejection,
            IdGateError::Config(_)
            | IdGateError::Storage(_)
            | IdGateError::Artifact(_)
            | IdGateError::Io(_) => ErrorKind::Internal,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

pub type Result<T> = std::result::Result<T, IdGateError>;
