// src/core/identity/types.rs
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::utils::error::{IdGateError, Result};

/// Raw bytes of an uploaded image as received from the caller.
#[derive(Debug, Clone, Default)]
pub struct ImageUpload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            filename: None,
            content_type: None,
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub selfie: ImageUpload,
    pub id_image: ImageUpload,
    pub user_id: String,
}

impl VerificationRequest {
    pub fn new(selfie: ImageUpload, id_image: ImageUpload, user_id: impl Into<String>) -> Result<Self> {
        let user_id = user_id.into().trim().to_string();
        if user_id.is_empty() {
            return Err(IdGateError::Validation("user_id must not be empty".into()));
        }

        Ok(Self {
            selfie,
            id_image,
            user_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub raw_distance: f64,
    pub normalized_score: f64,
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrOutcome {
    pub fields: BTreeMap<String, String>,
    pub confidence: f64,
}

/// A disallowed reference face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub id: Uuid,
    pub label: String,
    pub image: PathBuf,
    pub added_at: DateTime<Utc>,
}

impl BlacklistEntry {
    pub fn new(label: impl Into<String>, image: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            image: image.into(),
            added_at: Utc::now(),
        }
    }
}
