// src/core/services/review.rs
//! End-to-end KYC decision: document legibility first, then face match
//! against the front of the document. Low scores route the submission to a
//! human reviewer instead of failing it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::{
    core::{
        identity::types::{ImageUpload, MatchResult, VerificationRequest},
        services::{document::DocumentService, verification::VerificationService},
    },
    utils::{config::Config, error::Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Approved,
    NeedsReview,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KycDecision {
    pub status: KycStatus,
    pub ocr_confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct ReviewPolicy {
    pub ocr_min: f64,
    pub match_min: f64,
}

impl From<&Config> for ReviewPolicy {
    fn from(config: &Config) -> Self {
        Self {
            ocr_min: config.review.ocr_min,
            match_min: config.review.match_min,
        }
    }
}

impl ReviewPolicy {
    /// A submission is approved only when the face match itself was approved
    /// (and the user registered) and its score clears the review floor.
    pub fn status(&self, matched: &MatchResult) -> KycStatus {
        if matched.approved && matched.normalized_score >= self.match_min {
            KycStatus::Approved
        } else {
            KycStatus::NeedsReview
        }
    }
}

pub struct KycSubmission {
    pub id_front: ImageUpload,
    pub id_back: ImageUpload,
    pub selfie: ImageUpload,
    pub user_id: String,
}

pub struct ReviewService {
    documents: Arc<DocumentService>,
    verification: Arc<VerificationService>,
    policy: ReviewPolicy,
}

impl ReviewService {
    pub fn new(
        config: &Config,
        documents: Arc<DocumentService>,
        verification: Arc<VerificationService>,
    ) -> Self {
        Self {
            documents,
            verification,
            policy: ReviewPolicy::from(config),
        }
    }

    pub async fn review(&self, submission: KycSubmission) -> Result<KycDecision> {
        let KycSubmission {
            id_front,
            id_back,
            selfie,
            user_id,
        } = submission;

        // Validate before spending engine time on the document.
        let request = VerificationRequest::new(selfie, id_front.clone(), user_id)?;

        let ocr = self
            .documents
            .extract_document_data(id_front, id_back)
            .await?;

        if ocr.confidence < self.policy.ocr_min {
            info!(
                user_id = %request.user_id,
                confidence = ocr.confidence,
                "Document confidence below review threshold"
            );
            return Ok(KycDecision {
                status: KycStatus::NeedsReview,
                ocr_confidence: ocr.confidence,
                match_score: None,
                decided_at: Utc::now(),
            });
        }

        let user_id = request.user_id.clone();
        let matched = self.verification.verify(request).await?;

        let status = self.policy.status(&matched);
        info!(%user_id, ?status, score = matched.normalized_score, "KYC decision");

        Ok(KycDecision {
            status,
            ocr_confidence: ocr.confidence,
            match_score: Some(matched.normalized_score),
            decided_at: Utc::now(),
        })
    }
}
