// src/core/services/verification.rs
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    core::{
        engines::{self, ComparisonOutcome, EngineError, FaceComparator, FaceComparison},
        identity::{
            scoring::ScorePolicy,
            types::{MatchResult, VerificationRequest},
        },
    },
    storage::{
        artifacts::{ArtifactManager, TransientArtifact},
        blacklist::BlacklistStore,
        registry::RegistrationStore,
    },
    utils::{
        config::Config,
        error::{IdGateError, Result},
    },
};

pub struct VerificationService {
    registry: Arc<dyn RegistrationStore>,
    blacklist: Arc<BlacklistStore>,
    comparator: Arc<dyn FaceComparator>,
    artifacts: ArtifactManager,
    policy: ScorePolicy,
    engine_timeout: Duration,
    screen_timeout: Duration,
}

impl VerificationService {
    pub fn new(
        config: &Config,
        registry: Arc<dyn RegistrationStore>,
        blacklist: Arc<BlacklistStore>,
        comparator: Arc<dyn FaceComparator>,
        artifacts: ArtifactManager,
    ) -> Self {
        Self {
            registry,
            blacklist,
            comparator,
            artifacts,
            policy: ScorePolicy::new(
                config.verification.distance_threshold,
                config.verification.approval_cutoff,
            ),
            engine_timeout: config.engine_timeout(),
            screen_timeout: config.screen_timeout(),
        }
    }

    pub fn policy(&self) -> ScorePolicy {
        self.policy
    }

    /// Runs the full pipeline for one selfie/ID pair: registration check,
    /// blacklist screen, face comparison, scoring and, when approved,
    /// registration of the user. Artifacts are released on every path.
    pub async fn verify(&self, request: VerificationRequest) -> Result<MatchResult> {
        let request_id = Uuid::new_v4();
        let span = info_span!("verify", %request_id, user_id = %request.user_id);

        async move {
            let started = Instant::now();

            let selfie = self.artifacts.acquire("selfie", &request.selfie)?;
            let id_image = self.artifacts.acquire("id", &request.id_image)?;

            let outcome = self.run(&request.user_id, &selfie, &id_image).await;

            selfie.release();
            id_image.release();

            match &outcome {
                Ok(result) => info!(
                    raw_distance = result.raw_distance,
                    score = result.normalized_score,
                    approved = result.approved,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Face match completed"
                ),
                Err(e) => warn!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Face match rejected: {}", e
                ),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        user_id: &str,
        selfie: &TransientArtifact,
        id_image: &TransientArtifact,
    ) -> Result<MatchResult> {
        if self.registry.is_registered(user_id).await? {
            return Err(IdGateError::AlreadyRegistered);
        }

        if self.is_blacklisted(selfie.path()).await? {
            return Err(IdGateError::Blacklisted);
        }

        let comparison = self
            .compare(selfie.path(), id_image.path())
            .await
            .map_err(|e| IdGateError::ComparisonFailed(e.to_string()))?;

        let result = self.policy.evaluate(comparison.distance);

        // Insert-if-absent is the commit point; losing the race means a
        // concurrent run for the same user registered first.
        if result.approved && !self.registry.register(user_id).await? {
            return Err(IdGateError::AlreadyRegistered);
        }

        Ok(result)
    }

    /// Compares the selfie with every blacklist entry. Only a verified match
    /// stops the scan; entries the comparator cannot decide on count as no
    /// match. The whole scan shares one `screen_timeout` deadline, and
    /// running out of it fails the request rather than skipping entries.
    pub async fn is_blacklisted(&self, selfie: &Path) -> Result<bool> {
        let entries = self.blacklist.snapshot();
        let deadline = Instant::now() + self.screen_timeout;

        for entry in entries.iter() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let budget = self.engine_timeout.min(remaining);
            if budget.is_zero() {
                return Err(self.screen_expired(entries.len()));
            }

            let result = self.compare_within(budget, selfie, &entry.image).await;
            if budget < self.engine_timeout && matches!(result, Err(EngineError::Timeout(_))) {
                return Err(self.screen_expired(entries.len()));
            }

            match ComparisonOutcome::classify(&result) {
                ComparisonOutcome::Match => {
                    warn!(entry = %entry.label, "Selfie matches blacklist entry");
                    return Ok(true);
                }
                ComparisonOutcome::NoMatch => {}
                ComparisonOutcome::Indeterminate(reason) => {
                    debug!(entry = %entry.label, "Blacklist comparison inconclusive: {}", reason);
                }
            }
        }

        Ok(false)
    }

    fn screen_expired(&self, entries: usize) -> IdGateError {
        warn!(entries, "Blacklist screening ran out of time");
        IdGateError::ComparisonFailed(format!(
            "blacklist screening exceeded {:?}",
            self.screen_timeout
        ))
    }

    async fn compare(&self, first: &Path, second: &Path) -> std::result::Result<FaceComparison, EngineError> {
        self.compare_within(self.engine_timeout, first, second).await
    }

    async fn compare_within(
        &self,
        timeout: Duration,
        first: &Path,
        second: &Path,
    ) -> std::result::Result<FaceComparison, EngineError> {
        let comparator = self.comparator.clone();
        let (first, second) = (first.to_path_buf(), second.to_path_buf());

        engines::guarded(timeout, async move {
            comparator.compare(&first, &second).await
        })
        .await
    }
}
